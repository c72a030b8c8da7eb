//! Domain Ports (DDD Port/Adapter Pattern)
//!
//! This module defines the abstractions the codec core depends on.
//! Infrastructure adapters implement these traits to provide concrete
//! transforms and placement backends.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Codec Core (ec)                         │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                    Ports (Traits)                    │    │
//! │  │ ShardTransform │ TransformLoader │ PlacementRules   │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                  Adapters (Impls)                    │    │
//! │  │ ReedSolomonLoader │ NativeLibraryLoader │ InMemory  │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ec::layout::{CHUNK_COUNT, DATA_CHUNKS};
use crate::error::{Error, Result};

// =============================================================================
// Value Objects
// =============================================================================

/// Index of one of the fixed shards.
///
/// Roles are positional: `[0, K)` are data shards, `[K, N)` parity shards.
/// A `ShardId` is always in range; construction validates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct ShardId(u8);

impl ShardId {
    /// Create a shard id, rejecting indices outside `[0, N)`.
    pub fn new(index: usize) -> Result<Self> {
        if index >= CHUNK_COUNT {
            return Err(Error::InvalidRequest(format!(
                "shard index {} out of range [0, {})",
                index, CHUNK_COUNT
            )));
        }
        Ok(Self(index as u8))
    }

    /// Position of this shard in the transform's slot array.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this shard holds a direct slice of the payload.
    #[inline]
    pub fn is_data(self) -> bool {
        self.index() < DATA_CHUNKS
    }

    #[inline]
    pub fn is_parity(self) -> bool {
        !self.is_data()
    }

    /// Every shard id in ascending order.
    pub fn all() -> impl Iterator<Item = ShardId> {
        (0..CHUNK_COUNT as u8).map(ShardId)
    }

    /// The data shard ids in ascending order.
    pub fn data() -> impl Iterator<Item = ShardId> {
        (0..DATA_CHUNKS as u8).map(ShardId)
    }
}

impl std::fmt::Display for ShardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<usize> for ShardId {
    type Error = Error;

    fn try_from(index: usize) -> Result<Self> {
        Self::new(index)
    }
}

impl TryFrom<i32> for ShardId {
    type Error = Error;

    fn try_from(index: i32) -> Result<Self> {
        let index = usize::try_from(index)
            .map_err(|_| Error::InvalidRequest(format!("negative shard index {}", index)))?;
        Self::new(index)
    }
}

impl From<ShardId> for usize {
    fn from(id: ShardId) -> Self {
        id.index()
    }
}

impl From<ShardId> for i32 {
    fn from(id: ShardId) -> Self {
        id.0 as i32
    }
}

/// Unordered collection of unique shard ids (iterates ascending).
pub type ShardSet = BTreeSet<ShardId>;

/// Shard-indexed collection of buffers or costs.
pub type ShardMap<T> = BTreeMap<ShardId, T>;

// =============================================================================
// Transform Port
// =============================================================================

/// The opaque split/restore primitive behind the codec.
///
/// All slot slices have exactly `N` entries, indexed by shard position.
/// Implementations must be safe to call concurrently from several threads;
/// the codec adds no locking around these calls.
pub trait ShardTransform: Send + Sync {
    /// Split `src` into the `N` output buffers.
    ///
    /// Every output has the same length (the chunk size) and is fully
    /// written. There is no failure path: well-formed input always splits.
    fn split(&self, dst: &mut [&mut [u8]], src: &[u8]);

    /// Restore the original payload of `dst.len()` bytes from the surviving
    /// chunks. `None` marks a hole. `Err` carries the transform's status code.
    fn restore(&self, dst: &mut [u8], src: &[Option<&[u8]>]) -> std::result::Result<(), i32>;

    /// Whether [`restore`](Self::restore) can succeed for this hole pattern.
    fn can_restore(&self, src: &[Option<&[u8]>]) -> bool;
}

/// Resolves a transform provider.
///
/// Loading is all-or-nothing: a provider missing any of its three entry
/// points must fail without leaving anything half-loaded behind.
pub trait TransformLoader: Send + Sync {
    /// Human-readable description of where the transform comes from.
    fn describe(&self) -> String;

    /// Resolve the transform. Failures surface as
    /// [`Error::BackendUnavailable`].
    fn load(&self) -> Result<Arc<dyn ShardTransform>>;
}

// =============================================================================
// Placement Port
// =============================================================================

/// Replica selection mode of a placement rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMode {
    /// Each shard position chosen independently (erasure pools)
    Indep,
    /// Ordered first-n selection (replicated pools)
    FirstN,
}

impl std::fmt::Display for RuleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleMode::Indep => write!(f, "indep"),
            RuleMode::FirstN => write!(f, "firstn"),
        }
    }
}

/// Topology collaborator that owns placement rules.
pub trait PlacementRules {
    /// Id of an existing rule with this name.
    fn rule_id(&self, name: &str) -> Option<i32>;

    /// Create a rule spreading shards across `failure_domain` buckets
    /// under `root`, returning its id.
    fn add_simple_rule(
        &mut self,
        name: &str,
        root: &str,
        failure_domain: &str,
        mode: RuleMode,
    ) -> Result<i32>;
}
