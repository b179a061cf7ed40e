//! Concrete backend connectors.

pub mod exec;

pub use exec::CodexExecConnector;
