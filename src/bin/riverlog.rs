use anyhow::{Context, Error};
use riverlog::{
    ApiError, Config, FileStore, FlowUnit, Id, RiverLog, SchemaVersion,
    SessionState, TripDraft, TripOrder, TripQuery,
};
use std::{path::PathBuf, time::Duration};
use structopt::StructOpt;
use url::Url;

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::from_args();

    log::debug!("Starting application with {:#?}", args);

    if let Err(e) = run(args).await {
        match e.downcast_ref::<ApiError>() {
            Some(api) => eprintln!("{}", api.user_message()),
            None => eprintln!("Error: {:?}", e),
        }
        log::debug!("{:?}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Error> {
    let store_path = match args.store {
        Some(path) => path,
        None => FileStore::default_location().context(
            "Unable to find a config directory, please pass --store",
        )?,
    };

    // one-shot searches have nothing to debounce
    let config = Config::new(args.url)
        .with_schema(args.schema)
        .with_search_debounce(Duration::from_millis(0));
    let client = RiverLog::new(config, FileStore::new(store_path))?;

    match args.command {
        Command::Login { email, password } => {
            let session = client.session().login(&email, &password).await?;
            println!("Logged in as {}", session.user.display_name());
        },
        Command::Register {
            email,
            password,
            first_name,
            last_name,
        } => {
            let session = client
                .session()
                .register(
                    &email,
                    &password,
                    first_name.as_deref(),
                    last_name.as_deref(),
                )
                .await?;
            println!("Welcome, {}", session.user.display_name());
        },
        Command::Logout => {
            client.logout().await;
            println!("Logged out");
        },
        Command::Whoami => {
            let validation = client.session().restore().await?;

            match validation.finished().await {
                SessionState::Authenticated(session) => println!(
                    "{} <{}>",
                    session.user.display_name(),
                    session.user.email
                ),
                _ => println!("Not logged in"),
            }
        },
        Command::Profile {
            first_name,
            last_name,
        } => {
            client.session().restore().await?;
            let user = client
                .session()
                .update_profile(&first_name, &last_name)
                .await?;
            println!("Updated profile for {}", user.display_name());
        },
        Command::Trips { limit, oldest_first } => {
            client.session().restore().await?;
            let query = TripQuery {
                limit,
                ..TripQuery::default()
            };
            let mut trips = client.trips().list(&query).await?;

            let order = if oldest_first {
                TripOrder::OldestFirst
            } else {
                TripOrder::NewestFirst
            };
            order.sort(&mut trips);

            for trip in &trips {
                println!(
                    "#{:<5} {}  {} - {}  {}",
                    trip.id,
                    trip.trip_date,
                    trip.river_label(),
                    trip.addressing.section_name().unwrap_or(""),
                    trip.difficulty.as_deref().unwrap_or(""),
                );
            }
        },
        Command::Stats => {
            client.session().restore().await?;
            client.trips().list_all().await?;
            let stats = client.trips().stats().await;

            println!("Trips:   {}", stats.trip_count);
            println!("Rivers:  {}", stats.distinct_rivers);
            println!("Mileage: {:.1}", stats.total_mileage);
        },
        Command::Show { id } => {
            client.session().restore().await?;
            let draft = client.forms().load(id).await?;
            print_draft(&draft);
        },
        Command::Log(fields) => {
            client.session().restore().await?;
            let mut draft =
                TripDraft::new(chrono::Local::now().date_naive());
            fields.apply(&mut draft);

            if let Some(section) =
                client.forms().resolve_section(&mut draft).await?
            {
                client.forms().apply_section(&section, &mut draft);
            }

            let trip = client.forms().submit(&draft, None).await?;
            println!("Logged trip #{}", trip.id);
        },
        Command::Edit { id, fields } => {
            client.session().restore().await?;
            let mut draft = client.forms().load(id).await?;
            fields.apply(&mut draft);

            if fields.section_id.is_some() {
                draft.section = None;
                if let Some(section) =
                    client.forms().resolve_section(&mut draft).await?
                {
                    client.forms().apply_section(&section, &mut draft);
                }
            }

            let trip = client.forms().submit(&draft, Some(id)).await?;
            println!("Updated trip #{}", trip.id);
        },
        Command::Delete { id } => {
            client.session().restore().await?;
            client.trips().delete(id).await?;
            println!("Deleted trip #{}", id);
        },
        Command::Sections { query } => {
            client.session().restore().await?;
            let sections =
                client.catalog().search(&query).await?.unwrap_or_default();

            for section in &sections {
                println!(
                    "#{:<5} {}  {}",
                    section.id,
                    section.display_name(),
                    section.difficulty().unwrap_or_default(),
                );
            }
        },
        Command::Rivers { search } => {
            client.session().restore().await?;
            let search = search.unwrap_or_default();

            for river in client.catalog().rivers(&search).await? {
                println!("#{:<5} {} ({})", river.id, river.name, river.state);
            }
        },
    }

    Ok(())
}

fn print_draft(draft: &TripDraft) {
    let fields = [
        ("River", draft.river_name.as_str()),
        ("Section", draft.section_name.as_str()),
        ("Date", draft.trip_date.as_str()),
        ("Difficulty", draft.difficulty.as_str()),
        ("Flow", draft.flow.as_str()),
        ("Craft", draft.craft_type.as_str()),
        ("Duration", draft.duration_minutes.as_str()),
        ("Mileage", draft.mileage.as_str()),
        ("Notes", draft.notes.as_str()),
    ];

    if let Some(section) = &draft.section {
        println!("{:<12}{}", "Catalog", section.display_name());
    }

    for (name, value) in fields.iter() {
        if value.trim().is_empty() {
            continue;
        }

        match *name {
            "Flow" => println!("{:<12}{} {}", name, value, draft.flow_unit),
            _ => println!("{:<12}{}", name, value),
        }
    }
}

#[derive(Debug, StructOpt)]
struct Args {
    #[structopt(
        long = "url",
        default_value = "http://localhost:8080/api/v1",
        help = "The backend's base URL"
    )]
    url: Url,
    #[structopt(
        long = "schema",
        default_value = "free-text",
        help = "How trips refer to rivers (\"free-text\" or \"catalog\")"
    )]
    schema: SchemaVersion,
    #[structopt(
        long = "store",
        parse(from_os_str),
        help = "Where to keep your login between runs"
    )]
    store: Option<PathBuf>,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    #[structopt(about = "Log in to your account")]
    Login {
        email: String,
        #[structopt(short = "p", long = "password", help = "Your password")]
        password: String,
    },
    #[structopt(about = "Create an account and log in")]
    Register {
        email: String,
        #[structopt(short = "p", long = "password", help = "Your password")]
        password: String,
        #[structopt(long = "first-name")]
        first_name: Option<String>,
        #[structopt(long = "last-name")]
        last_name: Option<String>,
    },
    #[structopt(about = "Forget the stored login")]
    Logout,
    #[structopt(about = "Show who is logged in")]
    Whoami,
    #[structopt(about = "Change your name")]
    Profile {
        #[structopt(long = "first-name")]
        first_name: String,
        #[structopt(long = "last-name")]
        last_name: String,
    },
    #[structopt(about = "List your trips, newest first")]
    Trips {
        #[structopt(short = "n", long = "limit")]
        limit: Option<u32>,
        #[structopt(long = "oldest-first")]
        oldest_first: bool,
    },
    #[structopt(about = "Totals over all of your trips")]
    Stats,
    #[structopt(about = "Show a single trip")]
    Show { id: Id },
    #[structopt(about = "Log a new trip")]
    Log(TripFields),
    #[structopt(about = "Change an existing trip")]
    Edit {
        id: Id,
        #[structopt(flatten)]
        fields: TripFields,
    },
    #[structopt(about = "Delete a trip")]
    Delete { id: Id },
    #[structopt(about = "Search the river section catalog")]
    Sections { query: String },
    #[structopt(about = "List the rivers in the catalog")]
    Rivers { search: Option<String> },
}

#[derive(Debug, StructOpt)]
struct TripFields {
    #[structopt(long = "river")]
    river_name: Option<String>,
    #[structopt(long = "section")]
    section_name: Option<String>,
    #[structopt(
        long = "section-id",
        help = "A section from the catalog (see the `sections` command)"
    )]
    section_id: Option<Id>,
    #[structopt(long = "date", help = "When the trip happened (YYYY-MM-DD)")]
    trip_date: Option<String>,
    #[structopt(long = "difficulty")]
    difficulty: Option<String>,
    #[structopt(long = "flow")]
    flow: Option<String>,
    #[structopt(long = "flow-unit", help = "\"cfs\" or \"feet\"")]
    flow_unit: Option<FlowUnit>,
    #[structopt(long = "craft")]
    craft_type: Option<String>,
    #[structopt(long = "duration", help = "How long you were out, in minutes")]
    duration_minutes: Option<String>,
    #[structopt(long = "mileage")]
    mileage: Option<String>,
    #[structopt(long = "notes")]
    notes: Option<String>,
}

impl TripFields {
    /// Overwrite whichever fields were passed on the command line.
    fn apply(&self, draft: &mut TripDraft) {
        fn set(field: &mut String, value: &Option<String>) {
            if let Some(value) = value {
                *field = value.clone();
            }
        }

        set(&mut draft.river_name, &self.river_name);
        set(&mut draft.section_name, &self.section_name);
        set(&mut draft.trip_date, &self.trip_date);
        set(&mut draft.difficulty, &self.difficulty);
        set(&mut draft.flow, &self.flow);
        set(&mut draft.craft_type, &self.craft_type);
        set(&mut draft.duration_minutes, &self.duration_minutes);
        set(&mut draft.mileage, &self.mileage);
        set(&mut draft.notes, &self.notes);

        if let Some(section_id) = self.section_id {
            draft.section_id = Some(section_id);
        }
        if let Some(flow_unit) = self.flow_unit {
            draft.flow_unit = flow_unit;
        }
    }
}
