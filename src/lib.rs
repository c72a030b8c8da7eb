//! SizeCeph Erasure Code Backend
//!
//! A fixed 4+5 erasure code backend for a distributed object store. Every
//! payload is split into four data shards and five parity shards by an
//! external split/restore transform. The backend adds what the transform
//! lacks: layout arithmetic, a safety gate that refuses decodes from fewer
//! than six survivors, a reference-counted transform lifecycle, and the
//! mapping from a restored payload back to individual shards.
//!
//! # Architecture
//!
//! ```text
//! host ──▶ SizeCephCodec ──▶ Policy Guard ──▶ TransformBinding ──▶ transform
//!               │                                   │
//!               ▼                                   ▼
//!         ec::legacy shims              ReedSolomonLoader / NativeLibraryLoader
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Concrete transform loaders and placement rules
//! - [`domain`] - Shard identifiers and the ports the codec depends on
//! - [`ec`] - Layout, policy, binding, encode/decode adapters, codec facade
//! - [`error`] - Error types

pub mod adapters;
pub mod domain;
pub mod ec;
pub mod error;

// Re-export commonly used types
pub use domain::{ShardId, ShardMap, ShardSet, ShardTransform, TransformLoader};
pub use ec::{Profile, SizeCephCodec, TransformBinding};
pub use error::{Error, Result};
