// src/web/handlers/mod.rs
pub mod generator_handlers;
pub mod insight_handlers;
pub mod profile_handlers;

pub use generator_handlers::*;
pub use insight_handlers::*;
pub use profile_handlers::*;
