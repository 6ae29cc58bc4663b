//! rclone-artifacts - Core Library
//!
//! Core types, configuration, and the repository trait shared by
//! artifact store backends.

pub mod config;
pub mod error;
pub mod repository;
pub mod types;
pub mod utils;

pub use config::*;
pub use error::*;
pub use repository::*;
pub use types::*;
