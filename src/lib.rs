//! Stockcast - technical indicator engine and batch forecast orchestrator

pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use config::{Config, TaskConfig};
pub use error::{AppError, Result};
