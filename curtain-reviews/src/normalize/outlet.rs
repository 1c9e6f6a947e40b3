//! Outlet name → canonical outlet id

use crate::tables::OutletAliases;

use super::url::url_host;

/// Id used when nothing usable was supplied
pub const UNKNOWN_OUTLET: &str = "unknown";

/// Result of resolving a raw outlet label
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutletResolution {
    /// Found in the alias table
    Known(String),
    /// Not in the table; slug of the raw input (candidate for table curation)
    Fallback(String),
}

impl OutletResolution {
    pub fn id(&self) -> &str {
        match self {
            Self::Known(id) | Self::Fallback(id) => id,
        }
    }

    pub fn into_id(self) -> String {
        match self {
            Self::Known(id) | Self::Fallback(id) => id,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

/// Resolves free-text outlet names and domains through the alias table
#[derive(Debug, Clone, Copy)]
pub struct OutletNormalizer<'a> {
    aliases: &'a OutletAliases,
}

impl<'a> OutletNormalizer<'a> {
    pub fn new(aliases: &'a OutletAliases) -> Self {
        Self { aliases }
    }

    /// Canonical outlet id for a raw name, id or domain
    pub fn normalize_outlet(&self, raw: &str) -> String {
        self.resolve(raw).into_id()
    }

    pub fn resolve(&self, raw: &str) -> OutletResolution {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return OutletResolution::Fallback(UNKNOWN_OUTLET.to_string());
        }

        if let Some(id) = self.aliases.by_alias(&alias_key(trimmed)) {
            return OutletResolution::Known(id.to_string());
        }

        if looks_like_domain(trimmed) {
            if let Some(id) = url_host(trimmed).and_then(|host| self.aliases.by_domain(&host)) {
                return OutletResolution::Known(id.to_string());
            }
        }

        let slug = slugify(trimmed);
        if slug.is_empty() {
            OutletResolution::Fallback(UNKNOWN_OUTLET.to_string())
        } else {
            OutletResolution::Fallback(slug)
        }
    }

    /// Display name for a canonical id, if the table knows it
    pub fn display_name(&self, id: &str) -> Option<&'a str> {
        self.aliases.display_name(id)
    }
}

fn looks_like_domain(raw: &str) -> bool {
    raw.starts_with("http://")
        || raw.starts_with("https://")
        || (raw.contains('.') && !raw.contains(char::is_whitespace))
}

/// Alias table key: lower-case, leading "the " dropped, alphanumerics only
pub fn alias_key(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let stripped = lower.strip_prefix("the ").unwrap_or(&lower);
    stripped.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Lower-case, alphanumeric runs joined by single hyphens
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for c in raw.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::ReferenceTables;

    #[test]
    fn test_aliases_map_to_one_id() {
        let tables = ReferenceTables::builtin().unwrap();
        let normalizer = OutletNormalizer::new(&tables.outlets);

        for raw in ["NYT", "New York Times", "The New York Times", "nytimes.com", "nytimes"] {
            assert_eq!(normalizer.normalize_outlet(raw), "nytimes", "raw: {}", raw);
        }
        assert_eq!(
            normalizer.normalize_outlet("https://www.nytimes.com/2024/04/01/theater/x.html"),
            "nytimes"
        );
    }

    #[test]
    fn test_unknown_outlet_falls_back_to_slug() {
        let tables = ReferenceTables::builtin().unwrap();
        let normalizer = OutletNormalizer::new(&tables.outlets);

        let resolution = normalizer.resolve("Stage & Screen Quarterly");
        assert!(!resolution.is_known());
        assert_eq!(resolution.id(), "stage-screen-quarterly");
    }

    #[test]
    fn test_empty_outlet_is_unknown() {
        let tables = ReferenceTables::default();
        let normalizer = OutletNormalizer::new(&tables.outlets);
        assert_eq!(normalizer.normalize_outlet(""), UNKNOWN_OUTLET);
        assert_eq!(normalizer.normalize_outlet("!!!"), UNKNOWN_OUTLET);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Time Out: New York! "), "time-out-new-york");
        assert_eq!(slugify("ÉLAN Magazine"), "élan-magazine");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_alias_key_drops_article_and_punctuation() {
        assert_eq!(alias_key("The N.Y. Times"), "nytimes");
        assert_eq!(alias_key("the wrap"), "wrap");
    }
}
