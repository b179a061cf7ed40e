pub mod registry;

pub use registry::ProviderRegistry;
