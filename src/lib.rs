pub mod api;
pub mod config;
pub mod database;
pub mod enforcement;
pub mod error;
pub mod host;
pub mod policy;
pub mod webhooks;

pub use error::PolicyError;
