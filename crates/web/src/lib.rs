//! framedev Web
//!
//! Frame resolver HTTP surface: resolves frame routes, actions and redirects
//! against the inspected application and serves the devtools shell.

pub mod api;
pub mod config;
pub mod metrics;
pub mod resolver;
pub mod server;

pub use api::{api_routes, ApiState};
pub use config::DevtoolsConfig;
pub use metrics::{MetricsCollector, PayloadSizes};
pub use resolver::{AppCredentials, FrameResolver};
pub use server::{devtools, DevtoolsOptions};
