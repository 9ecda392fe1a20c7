//! # Elena DJ Common Library
//!
//! Shared code for the Elena DJ services including:
//! - Error and result types
//! - TOML configuration model and file resolution
//! - Credential cleaning and resolution helpers
//! - HTTP API request/response types

pub mod api;
pub mod config;
pub mod error;

pub use error::{Error, Result};
