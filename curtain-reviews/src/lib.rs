//! curtain-reviews library interface
//!
//! Attribution, deduplication and scoring of critic reviews collected from
//! several aggregator feeds. The binary in `main.rs` drives the passes in
//! [`pipeline`]; everything else is exposed for integration tests.

pub mod collision;
pub mod config;
pub mod garbage;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod scoring;
pub mod similarity;
pub mod store;
pub mod tables;
pub mod verify;

pub use crate::config::{CollisionPolicy, CurtainConfig, ResolverThresholds};
pub use crate::pipeline::{Command, Pipeline};
pub use crate::report::{AuditReport, RunMode};
pub use crate::store::{ReviewStore, StoreError};
pub use crate::tables::ReferenceTables;
