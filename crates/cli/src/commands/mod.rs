//! CLI Commands

pub mod inspect;
pub mod navigate;
pub mod routes;
