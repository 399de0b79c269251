//! plugpack: package plugin build output for a host application
//!
//! The library half of the `plugpack` binary, exposed for testing.

pub mod commands;
pub mod common;
pub mod errors;
pub mod packaging;

pub use common::GlobalOpts;
