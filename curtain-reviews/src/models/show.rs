//! Show registry (read-only reference metadata)

use chrono::NaiveDate;
use curtain_common::dates::parse_optional_date;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cast or creative-team entry
///
/// Registries carry either bare names or `{name, role}` objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CreditRepr")]
pub struct Credit {
    pub name: String,
    pub role: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CreditRepr {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        role: Option<String>,
    },
}

impl From<CreditRepr> for Credit {
    fn from(repr: CreditRepr) -> Self {
        match repr {
            CreditRepr::Name(name) => Credit { name, role: None },
            CreditRepr::Full { name, role } => Credit { name, role },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    pub id: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub title: String,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub opening_date: Option<String>,
    #[serde(default)]
    pub previews_start_date: Option<String>,
    #[serde(default)]
    pub closing_date: Option<String>,
    #[serde(default)]
    pub cast: Vec<Credit>,
    #[serde(default)]
    pub creative_team: Vec<Credit>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Show {
    pub fn opening(&self) -> Option<NaiveDate> {
        parse_optional_date(self.opening_date.as_deref())
    }

    pub fn previews_start(&self) -> Option<NaiveDate> {
        parse_optional_date(self.previews_start_date.as_deref())
    }

    /// Id with any trailing `-YYYY` removed ("cabaret-2024" → "cabaret")
    pub fn base_title(&self) -> &str {
        strip_year_suffix(&self.id).0
    }

    /// Year carried by the id suffix, if any
    pub fn year_suffix(&self) -> Option<i32> {
        strip_year_suffix(&self.id).1
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Split a show id into base title and trailing four-digit year
pub fn strip_year_suffix(id: &str) -> (&str, Option<i32>) {
    if let Some((base, suffix)) = id.rsplit_once('-') {
        if suffix.len() == 4 && suffix.chars().all(|c| c.is_ascii_digit()) && !base.is_empty() {
            return (base, suffix.parse().ok());
        }
    }
    (id, None)
}

/// Shows keyed by id
#[derive(Debug, Clone, Default)]
pub struct ShowRegistry {
    shows: BTreeMap<String, Show>,
}

impl ShowRegistry {
    pub fn new(shows: Vec<Show>) -> Self {
        Self {
            shows: shows.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Show> {
        self.shows.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.shows.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.shows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Show> {
        self.shows.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_year_suffix() {
        assert_eq!(strip_year_suffix("cabaret-2024"), ("cabaret", Some(2024)));
        assert_eq!(strip_year_suffix("our-town-2024"), ("our-town", Some(2024)));
        assert_eq!(strip_year_suffix("hadestown"), ("hadestown", None));
        assert_eq!(strip_year_suffix("room-101"), ("room-101", None));
        assert_eq!(strip_year_suffix("-2024"), ("-2024", None));
    }

    #[test]
    fn test_registry_parses_mixed_credit_shapes() {
        let json = r#"[{
            "id": "our-town-2024",
            "title": "Our Town",
            "openingDate": "2024-10-17",
            "cast": ["Jim Gaffigan", {"name": "Zoey Deutch", "role": "Emily Webb"}],
            "tags": ["Revival"]
        }]"#;
        let shows: Vec<Show> = serde_json::from_str(json).unwrap();
        let registry = ShowRegistry::new(shows);
        let show = registry.get("our-town-2024").unwrap();

        assert_eq!(show.cast.len(), 2);
        assert_eq!(show.cast[0].role, None);
        assert_eq!(show.cast[1].role.as_deref(), Some("Emily Webb"));
        assert!(show.has_tag("revival"));
        assert_eq!(show.base_title(), "our-town");
        assert_eq!(show.year_suffix(), Some(2024));
        assert_eq!(show.opening(), NaiveDate::from_ymd_opt(2024, 10, 17));
    }
}
