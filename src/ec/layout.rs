//! Fixed Layout and Alignment Calculator
//!
//! The backend is fixed-shape: four data chunks, five parity chunks. The
//! transform is reliable for up to three simultaneous chunk losses and
//! unreliable beyond that, so reads require six survivors.
//!
//! The two sizing functions here are shared by the encode and decode paths
//! and must agree exactly: `aligned_total(x) == DATA_CHUNKS * chunk_size(x)`.
//! Both return `None` for widths with no representable aligned total.

/// Data chunks (K)
pub const DATA_CHUNKS: usize = 4;

/// Parity chunks (M)
pub const CODING_CHUNKS: usize = 5;

/// Total chunks (N = K + M)
pub const CHUNK_COUNT: usize = DATA_CHUNKS + CODING_CHUNKS;

/// Simultaneous losses inside the transform's fully reliable zone
pub const MAX_TOLERATED_FAILURES: usize = 3;

/// Survivors required before any decode is attempted
pub const MIN_AVAILABLE: usize = CHUNK_COUNT - MAX_TOLERATED_FAILURES;

/// Byte granularity the transform processes per step
pub const ALIGNMENT: usize = 4;

/// Largest chunk the backend will allocate (16 MiB)
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Sub-chunks per chunk; the transform has no sub-chunk addressing
pub const SUB_CHUNK_COUNT: usize = 1;

const STRIPE_UNIT: usize = ALIGNMENT * DATA_CHUNKS;

const _: () = assert!(MIN_AVAILABLE == 6);
const _: () = assert!(MIN_AVAILABLE >= DATA_CHUNKS);

/// Round `len` up to the next multiple of `ALIGNMENT * K`.
///
/// Zero stays zero; exact multiples are unchanged. `None` when the rounded
/// value does not fit in `usize`.
#[inline]
pub fn aligned_total(len: usize) -> Option<usize> {
    len.checked_next_multiple_of(STRIPE_UNIT)
}

/// Per-chunk size for a logical stripe width.
///
/// `DATA_CHUNKS * chunk_size(w)` is at least `w` and a multiple of
/// `ALIGNMENT * DATA_CHUNKS`.
#[inline]
pub fn chunk_size(stripe_width: usize) -> Option<usize> {
    aligned_total(stripe_width).map(|total| total / DATA_CHUNKS)
}
