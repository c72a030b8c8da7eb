//! Infrastructure Adapters
//!
//! Implementations of the domain ports, following the Port/Adapter
//! (Hexagonal) architecture pattern.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                              │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │                    Ports (Traits)                           │ │
//! │  │    ShardTransform │ TransformLoader │ PlacementRules        │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │ ReedSolomonLoader │ NativeLibraryLoader (feature "native") │ │
//! │  │ InMemoryPlacementRules                                     │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use sizeceph_ec::adapters::ReedSolomonLoader;
//! use sizeceph_ec::ec::TransformBinding;
//!
//! let binding = TransformBinding::new(ReedSolomonLoader);
//! let lease = binding.acquire()?;
//! ```

#[cfg(all(unix, feature = "native"))]
mod native;
mod placement;
mod reed_solomon;

#[cfg(all(unix, feature = "native"))]
pub use native::{NativeLibraryLoader, NativeTransform, LIBRARY_ENV};
pub use placement::{InMemoryPlacementRules, PlacementRule};
pub use reed_solomon::{ReedSolomonLoader, ReedSolomonTransform};
