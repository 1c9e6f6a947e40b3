//! Identifier normalization
//!
//! Canonicalizes outlet names, critic names and URLs into comparable keys.
//! Every function here is total: unparseable input yields `None` or a
//! fallback key, never a panic or an error.

pub mod critic;
pub mod outlet;
pub mod url;

pub use self::critic::{critic_id, is_unknown_critic, normalize_critic};
pub use self::outlet::{alias_key, slugify, OutletNormalizer, OutletResolution};
pub use self::url::{normalize_url, url_host};
