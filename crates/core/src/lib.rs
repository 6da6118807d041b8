//! # Parley Core
//!
//! Domain types, collaborator traits, and error definitions for the Parley
//! retrieval-and-orchestration core. This crate has **no framework
//! dependencies**: it defines the domain model and the contracts that every
//! other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (session store, vector search, embeddings,
//! document store, generation) is a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod session;
pub mod provider;
pub mod search;
pub mod document;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use session::{Sender, Session, SessionId, SessionStore, StoredMessage, Turn};
pub use provider::{Embedder, GenerationRequest, GenerationResponse, Generator};
pub use search::{ImageMatch, MetadataFilter, SearchHit, TextMatch, VectorSearch};
pub use document::{DocumentHandle, DocumentStore};
