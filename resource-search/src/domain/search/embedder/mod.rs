//! Embedding generation implementations.

mod http;
#[cfg(test)]
mod mock;

pub use http::{HttpEmbedder, HttpProviderFactory};
#[cfg(test)]
pub use mock::{MockEmbedder, MockProviderFactory};
