pub mod api;
pub mod cli;
pub mod collection;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod session;
pub mod types;

pub use error::ApiError;

#[cfg(test)]
pub mod testing;
