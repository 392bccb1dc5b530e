//! Canonical record model, validation, and configuration for the konbini
//! crawl pipeline.
//!
//! Everything downstream (persistence, reconciliation, orchestration) works
//! in terms of the types defined here. The crate is deliberately free of I/O
//! except for config loading.

mod app_config;
pub mod codes;
mod config;
mod jobs;
mod record;
mod validate;

pub use app_config::{AppConfig, Stage};
pub use config::{load_app_config, load_app_config_from_env, ConfigError};
pub use jobs::{load_jobs, JobConfig, JobsFile, ALL_JOBS};
pub use record::{
    BrandEvent, Collection, CrawlOrigin, Dimensions, EventRef, ImageSet, Price, Product, Record,
};
pub use validate::ValidationError;
