//! framedev Common Library
//!
//! Interaction records, frame metadata extraction and the types shared by the
//! resolver and the navigator.

pub mod dispatch;
pub mod error;
pub mod metadata;
pub mod types;
pub mod uid;

// Re-export commonly used types
pub use dispatch::Dispatch;
pub use error::{Error, Result};
pub use metadata::{html_to_metadata, Metadata};
pub use types::*;
pub use uid::uid;

/// framedev version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default mount point of the devtools
pub const DEFAULT_BASE_PATH: &str = "/dev";
