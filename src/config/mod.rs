#[cfg(feature = "cli")]
pub mod cli;
pub mod mapping;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use mapping::{FieldMapping, MappingEntry, TargetField};
