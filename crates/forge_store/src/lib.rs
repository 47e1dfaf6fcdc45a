//! # forge_store
//!
//! Artifact storage for accepted contracts.
//!
//! Stores are append-only from the factory's point of view: `put` returns a
//! content identifier and nothing is ever rewritten or deleted.
//!
//! - [`PinataStore`]: IPFS pinning through the Pinata HTTP API
//! - [`LocalStore`]: SHA-256 addressed JSON documents in a directory
//! - [`MemoryStore`]: the same addressing in process memory

pub mod address;
pub mod error;
pub mod local;
pub mod memory;
pub mod pinata;
pub mod store;

pub use address::{content_id, encode_document, is_content_id};
pub use error::{StoreError, StoreResult};
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use pinata::PinataStore;
pub use store::ArtifactStore;
