//! External Transform Binding
//!
//! Owns the load-once, many-users lifecycle of the split/restore transform.
//! A [`TransformBinding`] is an ordinary value: whoever builds the codecs
//! creates one and shares it with `Arc`. There is no hidden global.
//!
//! ```text
//!   Unloaded ──acquire──▶ Loaded(1) ──acquire──▶ Loaded(n+1)
//!      ▲                      │
//!      └──────release(n=1)────┘     release(n>1) ─▶ Loaded(n-1)
//! ```
//!
//! The state lock covers only the load-or-increment and
//! decrement-or-unload bookkeeping. Transform calls run on the lease's own
//! `Arc` outside the lock, so long split/restore calls never serialize
//! unrelated traffic.

use std::mem::ManuallyDrop;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::domain::{ShardTransform, TransformLoader};
use crate::error::Result;

enum BindingState {
    Unloaded,
    Loaded {
        transform: Arc<dyn ShardTransform>,
        ref_count: usize,
    },
}

/// Shared, reference-counted handle to a loadable transform.
pub struct TransformBinding {
    loader: Box<dyn TransformLoader>,
    state: Mutex<BindingState>,
}

impl std::fmt::Debug for TransformBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformBinding")
            .field("loader", &self.loader.describe())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

impl TransformBinding {
    /// Create an unloaded binding around a loader.
    pub fn new(loader: impl TransformLoader + 'static) -> Arc<Self> {
        Self::from_boxed(Box::new(loader))
    }

    /// Create an unloaded binding around a loader chosen at runtime.
    pub fn from_boxed(loader: Box<dyn TransformLoader>) -> Arc<Self> {
        Arc::new(Self {
            loader,
            state: Mutex::new(BindingState::Unloaded),
        })
    }

    /// Take a counted reference, loading the transform if nobody holds one.
    ///
    /// A failed load leaves the binding `Unloaded`; nothing is retried here.
    pub fn acquire(self: &Arc<Self>) -> Result<TransformLease> {
        let mut state = self.state.lock();

        if let BindingState::Loaded {
            transform,
            ref_count,
        } = &mut *state
        {
            *ref_count += 1;
            debug!(ref_count = *ref_count, "transform reference acquired");
            return Ok(TransformLease::new(Arc::clone(self), Arc::clone(transform)));
        }

        info!(loader = %self.loader.describe(), "loading transform");
        let transform = self.loader.load().map_err(|e| {
            error!("failed to load transform: {}", e);
            e
        })?;
        *state = BindingState::Loaded {
            transform: Arc::clone(&transform),
            ref_count: 1,
        };
        info!("transform loaded");

        Ok(TransformLease::new(Arc::clone(self), transform))
    }

    /// Return one lease's reference. The last release drops the transform
    /// before the lock is released.
    fn release(&self, transform: Arc<dyn ShardTransform>) {
        let mut state = self.state.lock();

        let remaining = match &mut *state {
            BindingState::Unloaded => 0,
            BindingState::Loaded { ref_count, .. } => {
                *ref_count -= 1;
                *ref_count
            }
        };

        if remaining == 0 {
            let previous = std::mem::replace(&mut *state, BindingState::Unloaded);
            drop(transform);
            drop(previous);
            info!("transform unloaded");
        } else {
            debug!(ref_count = remaining, "transform reference released");
        }
        drop(state);
    }

    /// Number of outstanding leases (0 when unloaded).
    pub fn ref_count(&self) -> usize {
        match &*self.state.lock() {
            BindingState::Unloaded => 0,
            BindingState::Loaded { ref_count, .. } => *ref_count,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(&*self.state.lock(), BindingState::Loaded { .. })
    }
}

/// One counted reference to a loaded transform. Dropping it releases.
pub struct TransformLease {
    binding: Arc<TransformBinding>,
    /// Handed back to the binding in `drop`.
    transform: ManuallyDrop<Arc<dyn ShardTransform>>,
}

impl TransformLease {
    fn new(binding: Arc<TransformBinding>, transform: Arc<dyn ShardTransform>) -> Self {
        Self {
            binding,
            transform: ManuallyDrop::new(transform),
        }
    }

    pub fn transform(&self) -> &dyn ShardTransform {
        &**self.transform
    }
}

impl std::fmt::Debug for TransformLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformLease").finish_non_exhaustive()
    }
}

impl Drop for TransformLease {
    fn drop(&mut self) {
        // SAFETY: `transform` is taken exactly once, here, and the lease is
        // never used again.
        let transform = unsafe { ManuallyDrop::take(&mut self.transform) };
        self.binding.release(transform);
    }
}
