pub mod capability;
pub mod config;
pub mod error;
pub mod models;
pub mod trace;

pub use error::{Error, Result};
