//! Songplay Warehouse ETL Library
//!
//! Statement definitions and sequencing for the song-play analytics
//! warehouse: staging loads from raw JSON, then transforms into the
//! songplays star schema.

pub mod config;
pub mod loader;
pub mod runner;
pub mod statements;

// Re-export commonly used types for convenience
pub use config::Config;
pub use loader::{LoadError, StagingLoader};
pub use runner::{render_script, Pipeline};
pub use statements::{Dialect, Statement};
