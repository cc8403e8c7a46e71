//! Infrastructure: configuration, logging and result persistence.

pub mod archive;
pub mod config;
pub mod logging;

pub use archive::ResultArchive;
pub use config::Settings;
