//! framedev CLI
//!
//! Client for the devtools resolver API and the navigation history engine
//! that drives it.

pub mod client;
pub mod commands;
pub mod history;
pub mod output;

pub use client::FrameClient;
pub use history::{GetFrameOptions, HistoryState, Navigator, Transition};
