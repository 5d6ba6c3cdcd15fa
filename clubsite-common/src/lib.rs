//! # Club Site Common Library
//!
//! Shared code for the club site service:
//! - Domain models (news, board members, pilots, sponsors, site content)
//! - Configuration loading and resolution
//! - Text sanitization for slugs, filenames and legacy CSV fields
//! - Pure credential helpers (bearer parsing, token classification)

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod sanitize;

pub use error::{Error, Result};
