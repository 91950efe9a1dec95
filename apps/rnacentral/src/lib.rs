//! # RNAcentral Library
//!
//! This library exposes the RNAcentral app modules for testing and
//! integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod config;
pub mod jobs;

// Re-export rnacentral_core for convenience
pub use rnacentral_core;
