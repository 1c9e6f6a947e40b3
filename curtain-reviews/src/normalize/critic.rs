//! Critic name normalization

/// Bylines that carry no identity
const UNKNOWN_CRITICS: &[&str] = &[
    "",
    "unknown",
    "unknown critic",
    "staff",
    "staff writer",
    "staff critic",
    "critic",
    "various",
    "anonymous",
    "na",
];

/// Id used for missing or placeholder bylines
pub const UNKNOWN_CRITIC_ID: &str = "unknown";

/// Lower-case, letters only, whitespace collapsed ("Jesse  Green!" → "jesse green")
///
/// Hyphens and periods separate tokens; apostrophes join them ("O'Hara" → "ohara").
pub fn normalize_critic(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut pending_space = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphabetic() {
            if pending_space && !normalized.is_empty() {
                normalized.push(' ');
            }
            pending_space = false;
            normalized.push(c);
        } else if c.is_whitespace() || c == '-' || c == '.' || c == ',' {
            pending_space = true;
        }
    }
    normalized
}

/// True for missing, blank or placeholder bylines
pub fn is_unknown_critic(name: Option<&str>) -> bool {
    match name {
        None => true,
        Some(name) => UNKNOWN_CRITICS.contains(&normalize_critic(name).as_str()),
    }
}

/// Key component for (show, outlet, critic): hyphenated normalized name
pub fn critic_id(name: Option<&str>) -> String {
    if is_unknown_critic(name) {
        return UNKNOWN_CRITIC_ID.to_string();
    }
    normalize_critic(name.unwrap_or_default()).replace(' ', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_critic() {
        assert_eq!(normalize_critic("  Jesse   Green "), "jesse green");
        assert_eq!(normalize_critic("Sara Holdren (Vulture)"), "sara holdren vulture");
        assert_eq!(normalize_critic("Johnny Oleksinski, NY Post"), "johnny oleksinski ny post");
        assert_eq!(normalize_critic("Dan O'Hara"), "dan ohara");
        assert_eq!(normalize_critic("Jean-Paul Gaultier"), "jean paul gaultier");
        assert_eq!(normalize_critic("J. Green"), "j green");
        assert_eq!(normalize_critic("12345"), "");
    }

    #[test]
    fn test_unknown_critics() {
        assert!(is_unknown_critic(None));
        assert!(is_unknown_critic(Some("")));
        assert!(is_unknown_critic(Some("Staff")));
        assert!(is_unknown_critic(Some("Unknown Critic")));
        assert!(is_unknown_critic(Some("N/A")));
        assert!(!is_unknown_critic(Some("Jesse Green")));
    }

    #[test]
    fn test_critic_id() {
        assert_eq!(critic_id(Some("Jesse Green")), "jesse-green");
        assert_eq!(critic_id(Some("JESSE GREEN.")), "jesse-green");
        assert_eq!(critic_id(None), UNKNOWN_CRITIC_ID);
        assert_eq!(critic_id(Some("staff")), UNKNOWN_CRITIC_ID);
    }
}
