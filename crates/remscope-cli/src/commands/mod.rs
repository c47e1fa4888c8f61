//! CLI command implementations.

pub mod discover;
pub mod modules;
pub mod scan;
pub mod schema;
pub mod watch;
