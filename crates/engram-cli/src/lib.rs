pub mod commands;
pub mod error;
pub mod host;
pub mod output;

pub use commands::{
    ConsolidateCommand, EntityCommand, MemoryCommand, StatsCommand, TimelineCommand,
};
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, content_preview, format_timestamp, truncate_string};
