//! Erasure Coding Module
//!
//! The safety-gated codec adapter around the fixed 4+5 split/restore
//! transform.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            SizeCephCodec                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                          │
//! │   encode ──▶ EncodePlan ──────────────────────────┐                      │
//! │                                                   ▼                      │
//! │   decode ──▶ Policy Guard ──▶ TransformBinding ──▶ split / restore       │
//! │                (gate)          (counted lease)     │                     │
//! │                                                    ▼                     │
//! │                                          Reconstruction Mapper           │
//! │                                      (data shards sliced, parity         │
//! │                                       deferred to host fallback)         │
//! │                                                                          │
//! │   layout: constants + alignment calculator shared by both paths          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - **Layout** (`layout.rs`): fixed K/M/N, the six-survivor floor, and the
//!   chunk-size arithmetic both paths must agree on.
//! - **Policy** (`policy.rs`): the decode gate and minimum read set.
//! - **Binding** (`binding.rs`): load-once, reference-counted transform
//!   lifecycle.
//! - **Encoder** (`encoder.rs`): validates and runs split.
//! - **Reconstruction** (`reconstruction.rs`): probe, restore, shard mapping,
//!   concatenated reads.
//! - **Codec** (`codec.rs`): host-facing facade.
//! - **Legacy** (`legacy.rs`): integer-keyed boundary shims.

pub mod binding;
pub mod codec;
pub mod encoder;
pub mod layout;
pub mod legacy;
pub mod policy;
pub mod profile;
pub mod reconstruction;
pub mod stats;

#[cfg(test)]
mod proptest;

pub use binding::{TransformBinding, TransformLease};
pub use codec::{Optimizations, SizeCephCodec};
pub use profile::Profile;
pub use reconstruction::Reconstruction;
pub use stats::CodecStatsSnapshot;
