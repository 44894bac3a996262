//! Vectorhub: one vector-store contract over several hosted backends.
//!
//! This crate re-exports the vectorhub sub-crates for single-import usage.
//! Enable features to control which adapters are compiled in.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `default` | `astradb`, `milvus`, `typesense` |
//! | `astradb` | AstraDB Data API adapter |
//! | `milvus` | Milvus REST adapter |
//! | `typesense` | Typesense adapter |
//! | `lakera` | Lakera Guard prompt-injection screening |
//! | `full` | All features enabled |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vectorhub::core::{Document, Metric, VectorStore};
//! use vectorhub::milvus::{MilvusConfig, MilvusVectorStore};
//! use vectorhub::transport::HttpTransport;
//!
//! let store = MilvusVectorStore::new(MilvusConfig::from_env()?, Arc::new(HttpTransport::new()))?;
//! store.create_collection(1536, Metric::Cosine).await?;
//! ```

/// Shared model, error taxonomy and the `VectorStore` / `QueryTransformer` traits.
/// Always available.
pub use vectorhub_core as core;

/// Transport port, reqwest transport, fake transport and `CapturingStream`.
/// Always available.
pub use vectorhub_transport as transport;

/// AstraDB (Data API) vector store.
#[cfg(feature = "astradb")]
pub use vectorhub_astradb as astradb;

/// Milvus (REST v1) vector store.
#[cfg(feature = "milvus")]
pub use vectorhub_milvus as milvus;

/// Typesense vector store.
#[cfg(feature = "typesense")]
pub use vectorhub_typesense as typesense;

/// Lakera Guard query screening.
#[cfg(feature = "lakera")]
pub use vectorhub_lakera as lakera;

/// The types most callers need.
pub mod prelude {
    pub use vectorhub_core::{
        Document, Metric, QueryTransformer, SearchResult, VectorHubError, VectorStore,
        DEFAULT_DIMENSION,
    };
    pub use vectorhub_transport::{HttpTransport, Transport};
}
