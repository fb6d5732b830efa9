pub mod analyzer;
pub mod cli;
pub mod config;
pub mod database;
pub mod generator;
pub mod presenter;
pub mod scraper;
pub mod store;
pub mod web;

pub use analyzer::{AnalyzerConfig, EngagementAnalyzer, EngagementReport, TimeGranularity};
pub use store::{Post, PostStore, RawPost, ValidationError};
pub use web::start_web_server;
