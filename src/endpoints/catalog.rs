use crate::{
    gateway::{Gateway, Method},
    ApiError, Id, River, Section,
};
use serde_derive::Deserialize;

/// Filters for `GET /sections` and `GET /rivers`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionQuery {
    /// Free text, matched by the backend.
    pub search: Option<String>,
    pub state: Option<String>,
    /// Only used when listing sections.
    pub river_id: Option<Id>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl SectionQuery {
    pub fn search<S: Into<String>>(text: S) -> Self {
        SectionQuery {
            search: Some(text.into()),
            ..SectionQuery::default()
        }
    }

    fn to_pairs(&self, include_river: bool) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(state) = &self.state {
            pairs.push(("state", state.clone()));
        }
        if let (true, Some(river_id)) = (include_river, self.river_id) {
            pairs.push(("river_id", river_id.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }

        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SectionPage {
    #[serde(default)]
    pub sections: Option<Vec<Section>>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RiverPage {
    #[serde(default)]
    pub rivers: Option<Vec<River>>,
    pub total: Option<u64>,
}

pub async fn list_sections(
    gateway: &Gateway,
    token: &str,
    query: &SectionQuery,
) -> Result<SectionPage, ApiError> {
    let reply = gateway
        .execute(
            Method::Get,
            "/sections",
            &query.to_pairs(true),
            None,
            Some(token),
        )
        .await?;

    super::expect_data(reply)
}

pub async fn list_rivers(
    gateway: &Gateway,
    token: &str,
    query: &SectionQuery,
) -> Result<RiverPage, ApiError> {
    let reply = gateway
        .execute(
            Method::Get,
            "/rivers",
            &query.to_pairs(false),
            None,
            Some(token),
        )
        .await?;

    super::expect_data(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rivers_ignore_the_river_filter() {
        let query = SectionQuery {
            search: Some(String::from("elk")),
            river_id: Some(Id::new(3)),
            ..SectionQuery::default()
        };

        assert_eq!(
            query.to_pairs(true),
            vec![
                ("search", String::from("elk")),
                ("river_id", String::from("3")),
            ]
        );
        assert_eq!(
            query.to_pairs(false),
            vec![("search", String::from("elk"))]
        );
    }
}
