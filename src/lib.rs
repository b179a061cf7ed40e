pub mod backend;
pub mod catalog;
pub mod client;
pub mod config;
pub mod core;
pub mod credentials;
pub mod effort;
pub mod plugin;
pub mod provider;
pub mod registry;
pub mod session;
pub mod tools;
pub mod transport;

pub use core::types::*;
pub use client::CodexClient;
pub use plugin::CodexPlugin;
pub use provider::CodexProvider;
pub use session::SessionAdapter;
