use crate::Id;
use serde_derive::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A named run on a river, as listed in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: Id,
    pub river_id: Id,
    pub river_name: String,
    pub state: String,
    /// The section's own name (e.g. "Shoshone").
    pub name: String,
    /// A compact rating such as `IIItoIV` or `IVstandoutVplus`.
    pub class_rating: Option<String>,
    pub gradient: Option<f64>,
    pub gradient_unit: Option<String>,
    pub mileage: Option<f64>,
    pub put_in_name: Option<String>,
    pub take_out_name: Option<String>,
    pub gauge_name: Option<String>,
    pub gauge_id: Option<String>,
    pub flow_min: Option<f64>,
    pub flow_max: Option<f64>,
    pub flow_low: Option<f64>,
    pub flow_high: Option<f64>,
    pub flow_unit: Option<String>,
    pub aw_url: Option<String>,
    pub aw_id: Option<String>,
}

impl Section {
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.river_name, self.name)
    }

    /// The class rating, formatted for people.
    pub fn difficulty(&self) -> Option<String> {
        self.class_rating.as_deref().map(format_class_rating)
    }

    /// Case-insensitive substring match against the river or section name.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();

        self.river_name.to_lowercase().contains(&needle)
            || self.name.to_lowercase().contains(&needle)
    }
}

impl PartialEq for Section {
    fn eq(&self, other: &Section) -> bool { self.id == other.id }
}

impl Eq for Section {}

impl Hash for Section {
    fn hash<H: Hasher>(&self, state: &mut H) { self.id.hash(state); }
}

/// A river in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct River {
    pub id: Id,
    pub name: String,
    pub state: String,
}

/// Turn a catalog rating like `IIItoIV` into `III - IV`.
///
/// `to` becomes a range, `plus`/`minus` become `+`/`-`, and anything after
/// `standout` is a harder stand-out rapid which gets wrapped in parentheses.
pub fn format_class_rating(rating: &str) -> String {
    let formatted = rating
        .replace("to", " - ")
        .replace("plus", "+")
        .replace("minus", "-");

    match formatted.find("standout") {
        Some(ix) => {
            let (before, after) = formatted.split_at(ix);
            format!("{}({})", before, &after["standout".len()..])
        },
        None => formatted,
    }
}
