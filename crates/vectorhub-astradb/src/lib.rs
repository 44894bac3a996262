//! AstraDB integration for vectorhub.
//!
//! [`AstraDbVectorStore`] implements the [`VectorStore`](vectorhub_core::VectorStore)
//! contract on top of the [AstraDB](https://www.datastax.com/products/datastax-astra)
//! JSON Data API. The `$vector`, `_id` and `$similarity` fields AstraDB uses
//! are translated to the shared [`Document`] model and never reach callers.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vectorhub_astradb::{AstraDbConfig, AstraDbVectorStore};
//! use vectorhub_transport::HttpTransport;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AstraDbConfig::new("https://db-id-region.apps.astra.datastax.com", "AstraCS:...")
//!     .with_collection("docs");
//! let store = AstraDbVectorStore::new(config, Arc::new(HttpTransport::new()))?;
//! store.initialize().await?;
//! # Ok(())
//! # }
//! ```

mod protocol;
mod vector_store;

pub use vector_store::{AstraDbConfig, AstraDbVectorStore};

// Re-export core types for convenience.
pub use vectorhub_core::{Document, Metric, SearchResult, VectorStore};
