pub mod config;
pub mod error;
pub mod record;
pub mod time;

pub use config::AnalyzerConfig;
pub use error::ApilogError;
pub use record::{LogRecord, RawRecord};
