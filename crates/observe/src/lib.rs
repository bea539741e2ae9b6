//! Log output shared by the binaries and their tests.

pub mod config;
pub mod tracing;

pub use config::{Config, Format};
