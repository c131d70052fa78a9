use crate::Id;
use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};

/// Someone with a RiverLog account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// "First Last" when both names are known, otherwise their email.
    pub fn display_name(&self) -> String {
        match (non_blank(&self.first_name), non_blank(&self.last_name)) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            _ => self.email.clone(),
        }
    }
}

fn non_blank(name: &Option<String>) -> Option<&str> {
    name.as_deref().filter(|n| !n.is_empty())
}
