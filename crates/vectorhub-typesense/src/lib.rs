//! Typesense integration for vectorhub.
//!
//! [`TypesenseVectorStore`] implements the [`VectorStore`](vectorhub_core::VectorStore)
//! trait against the [Typesense](https://typesense.org/) HTTP API. Typesense
//! is schema-first, so [`create_collection`](vectorhub_core::VectorStore::create_collection)
//! declares the vector field and every payload field up front.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vectorhub_typesense::{TypesenseConfig, TypesenseVectorStore};
//! use vectorhub_transport::HttpTransport;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TypesenseConfig::new("xyz").with_collection("docs").with_dimension(768);
//! let store = TypesenseVectorStore::new(config, Arc::new(HttpTransport::new()))?;
//! store.initialize().await?;
//! # Ok(())
//! # }
//! ```

mod protocol;
mod vector_store;

pub use vector_store::{TypesenseConfig, TypesenseVectorStore};

// Re-export core types for convenience.
pub use vectorhub_core::{Document, Metric, SearchResult, VectorStore};
