//! Curated reference tables
//!
//! Outlet aliases, per-production wrong-production indicators, known
//! wrong→correct show mappings and the list of frequently revived titles.
//! Loaded once at start and passed explicitly into the normalizer,
//! verifier and resolver, so tests can build their own fixtures.

use curtain_common::config::read_toml_file;
use curtain_common::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::{info, warn};

use crate::normalize::outlet::alias_key;

const BUILTIN_TABLES: &str = include_str!("../data/reference_tables.toml");

/// Outlet entry as written in the tables file
#[derive(Debug, Clone, Deserialize)]
pub struct OutletEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
}

/// Venue/cast/year markers for one production
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductionIndicators {
    /// Markers of this production
    #[serde(default)]
    pub expected: Vec<String>,
    /// Markers of an earlier production of the same title
    #[serde(default)]
    pub wrong: Vec<String>,
    /// Override for the number of wrong markers needed to flag
    #[serde(default)]
    pub min_wrong_matches: Option<usize>,
}

/// Manually curated show-id correction
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KnownMapping {
    pub wrong: String,
    pub correct: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TablesFile {
    #[serde(default)]
    revived_titles: Vec<String>,
    #[serde(default)]
    outlets: Vec<OutletEntry>,
    #[serde(default)]
    productions: BTreeMap<String, ProductionIndicators>,
    #[serde(default)]
    known_mappings: Vec<KnownMapping>,
}

/// Alias lookup for outlet names and domains
#[derive(Debug, Clone, Default)]
pub struct OutletAliases {
    by_alias: HashMap<String, String>,
    by_domain: HashMap<String, String>,
    display_names: HashMap<String, String>,
}

impl OutletAliases {
    pub fn new(entries: &[OutletEntry]) -> Self {
        let mut aliases = Self::default();
        for entry in entries {
            aliases
                .display_names
                .insert(entry.id.clone(), entry.name.clone());

            let names = std::iter::once(&entry.id)
                .chain(std::iter::once(&entry.name))
                .chain(entry.aliases.iter());
            for name in names {
                let key = alias_key(name);
                if key.is_empty() {
                    continue;
                }
                if let Some(previous) = aliases.by_alias.insert(key.clone(), entry.id.clone()) {
                    if previous != entry.id {
                        warn!(
                            "Outlet alias '{}' maps to both '{}' and '{}'; keeping '{}'",
                            name, previous, entry.id, entry.id
                        );
                    }
                }
            }
            for domain in &entry.domains {
                aliases
                    .by_domain
                    .insert(domain.trim().to_lowercase(), entry.id.clone());
            }
        }
        aliases
    }

    /// Look up an alias key (see [`alias_key`])
    pub fn by_alias(&self, key: &str) -> Option<&str> {
        self.by_alias.get(key).map(String::as_str)
    }

    /// Look up a bare host (no `www.`)
    pub fn by_domain(&self, host: &str) -> Option<&str> {
        if let Some(id) = self.by_domain.get(host) {
            return Some(id);
        }
        // Subdomains ("theater.nytimes.com") fall back to the longest listed suffix
        self.by_domain
            .iter()
            .filter(|(domain, _)| {
                host.strip_suffix(domain.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
            })
            .max_by_key(|(domain, _)| domain.len())
            .map(|(_, id)| id.as_str())
    }

    pub fn display_name(&self, id: &str) -> Option<&str> {
        self.display_names.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.display_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.display_names.is_empty()
    }
}

/// All curated tables
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub outlets: OutletAliases,
    pub productions: BTreeMap<String, ProductionIndicators>,
    pub known_mappings: Vec<KnownMapping>,
    pub revived_titles: BTreeSet<String>,
}

impl ReferenceTables {
    /// Tables compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_TABLES)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TablesFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid reference tables: {}", e)))?;
        Ok(Self::from_file(file))
    }

    /// Load from `path` if it exists, else the builtin tables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if let Some(file) = read_toml_file::<TablesFile>(path)? {
                let tables = Self::from_file(file);
                info!(
                    "Reference tables loaded from {}: {} outlets, {} productions, {} mappings",
                    path.display(),
                    tables.outlets.len(),
                    tables.productions.len(),
                    tables.known_mappings.len()
                );
                return Ok(tables);
            }
        }
        Self::builtin()
    }

    fn from_file(file: TablesFile) -> Self {
        Self {
            outlets: OutletAliases::new(&file.outlets),
            productions: file.productions,
            known_mappings: file.known_mappings,
            revived_titles: file.revived_titles.into_iter().collect(),
        }
    }

    pub fn indicators_for(&self, show_id: &str) -> Option<&ProductionIndicators> {
        self.productions.get(show_id)
    }

    /// Curated correct id for a wrong id, if any
    pub fn known_correction(&self, wrong_id: &str) -> Option<&KnownMapping> {
        self.known_mappings.iter().find(|m| m.wrong == wrong_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_parse() {
        let tables = ReferenceTables::builtin().unwrap();
        assert!(tables.outlets.len() > 10);
        assert_eq!(tables.outlets.by_alias("nyt"), Some("nytimes"));
        assert_eq!(tables.outlets.by_domain("nytimes.com"), Some("nytimes"));
        assert!(tables.revived_titles.contains("our-town"));
        assert!(tables.indicators_for("our-town-2024").is_some());
        assert_eq!(
            tables.known_correction("sunset-blvd-2024").unwrap().correct,
            "sunset-boulevard-2024"
        );
    }

    #[test]
    fn test_subdomain_falls_back_to_domain() {
        let tables = ReferenceTables::builtin().unwrap();
        assert_eq!(tables.outlets.by_domain("theater.nytimes.com"), Some("nytimes"));
        assert_eq!(tables.outlets.by_domain("notnytimes.com"), None);
    }

    #[test]
    fn test_nested_subdomain_takes_longest_suffix() {
        let tables = ReferenceTables::from_toml_str(
            r#"
            [[outlets]]
            id = "guardian"
            name = "The Guardian"
            domains = ["theguardian.co.uk"]

            [[outlets]]
            id = "guardian-stage"
            name = "Guardian Stage"
            domains = ["stage.theguardian.co.uk"]
            "#,
        )
        .unwrap();

        for _ in 0..8 {
            assert_eq!(
                tables.outlets.by_domain("reviews.stage.theguardian.co.uk"),
                Some("guardian-stage")
            );
        }
        assert_eq!(tables.outlets.by_domain("news.theguardian.co.uk"), Some("guardian"));
        assert_eq!(tables.outlets.by_domain("co.uk"), None);
    }

    #[test]
    fn test_fixture_tables_from_str() {
        let tables = ReferenceTables::from_toml_str(
            r#"
            revived_titles = ["hair"]

            [[outlets]]
            id = "zine"
            name = "The Zine"
            aliases = ["Z"]

            [productions."hair-2009"]
            expected = ["Al Hirschfeld Theatre"]
            wrong = ["Biltmore"]
            min_wrong_matches = 1
            "#,
        )
        .unwrap();

        assert_eq!(tables.outlets.by_alias("zine"), Some("zine"));
        assert_eq!(tables.outlets.display_name("zine"), Some("The Zine"));
        assert_eq!(
            tables.indicators_for("hair-2009").unwrap().min_wrong_matches,
            Some(1)
        );
        assert!(tables.known_mappings.is_empty());
    }

    #[test]
    fn test_invalid_tables_are_config_error() {
        assert!(matches!(
            ReferenceTables::from_toml_str("outlets = 3"),
            Err(Error::Config(_))
        ));
    }
}
