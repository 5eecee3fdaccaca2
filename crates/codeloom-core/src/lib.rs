pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{CodeloomError, Result, ServiceErrorKind};
pub use types::*;
