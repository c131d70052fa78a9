use std::time::Duration;
use url::Url;

/// The backend's base URL when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/v1";

/// How long the catalog waits for typing to settle before searching.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Which trip schema the backend we're talking to expects.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SchemaVersion {
    /// Trips name their river and section as free text.
    FreeText,
    /// Trips reference a section from the catalog by id.
    CatalogRef,
}

impl Default for SchemaVersion {
    fn default() -> Self { SchemaVersion::FreeText }
}

impl std::str::FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free-text" | "freetext" => Ok(SchemaVersion::FreeText),
            "catalog" | "catalog-ref" => Ok(SchemaVersion::CatalogRef),
            other => Err(format!(
                "Unknown schema \"{}\", expected \"free-text\" or \"catalog\"",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: Url,
    pub user_agent: String,
    pub schema: SchemaVersion,
    pub search_debounce: Duration,
}

impl Config {
    pub fn new(base_url: Url) -> Self {
        Config {
            base_url,
            ..Config::default()
        }
    }

    pub fn with_schema(self, schema: SchemaVersion) -> Self {
        Config { schema, ..self }
    }

    pub fn with_user_agent<S: Into<String>>(self, user_agent: S) -> Self {
        Config {
            user_agent: user_agent.into(),
            ..self
        }
    }

    pub fn with_search_debounce(self, search_debounce: Duration) -> Self {
        Config {
            search_debounce,
            ..self
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: Url::parse(DEFAULT_BASE_URL)
                .expect("The default base URL is always valid"),
            user_agent: String::from(crate::DEFAULT_USER_AGENT),
            schema: SchemaVersion::default(),
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
        }
    }
}
