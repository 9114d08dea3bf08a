//! Configuration layer

pub mod cli;
pub mod harness;

pub use cli::{CliArgs, DriverKind};
pub use harness::{HarnessConfig, ServerAddress};
