pub mod client;
pub mod config;
pub mod xml;

#[cfg(any(test, feature = "test-helpers"))]
pub mod stub;

pub use client::BggClient;
pub use config::BggClientConfig;
