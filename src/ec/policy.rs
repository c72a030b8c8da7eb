//! Shard Policy Guard
//!
//! Exhaustive failure-pattern analysis of the transform gave:
//!
//! - 1-3 lost chunks: every pattern restores
//! - 4 lost chunks: 117 of 126 patterns restore
//! - 5 lost chunks: 81 of 126 patterns restore
//!
//! Rather than whitelisting individual 4- and 5-loss patterns, the guard
//! enforces a global floor of [`MIN_AVAILABLE`] survivors. This trades the
//! theoretical M=5 tolerance for a guaranteed 3, and it applies no matter
//! which specific shards are missing.

use tracing::{debug, warn};

use super::layout::{DATA_CHUNKS, MIN_AVAILABLE};
use crate::domain::ShardSet;
use crate::error::{Error, Result};

/// Whether a decode from `available` is inside the reliable zone.
///
/// Both gates are checked independently; with the current layout the
/// first implies the second.
pub fn is_decode_safe(available: &ShardSet, _want: &ShardSet) -> bool {
    if available.len() < MIN_AVAILABLE {
        return false;
    }

    if available.len() < DATA_CHUNKS {
        return false;
    }

    true
}

/// Gate a decode, producing the error the host sees on rejection.
pub fn check_decode(available: &ShardSet, want: &ShardSet) -> Result<()> {
    if is_decode_safe(available, want) {
        return Ok(());
    }

    warn!(
        available = available.len(),
        required = MIN_AVAILABLE,
        "decode rejected: fewer survivors than the reliable minimum"
    );
    Err(Error::InsufficientShards {
        available: available.len(),
        required: MIN_AVAILABLE,
    })
}

/// Choose the canonical read set: the first `MIN_AVAILABLE` ids ascending.
///
/// Whole chunks are always read; there are no sub-chunk ranges.
pub fn select_minimum(available: &ShardSet) -> Result<ShardSet> {
    if available.len() < MIN_AVAILABLE {
        warn!(
            available = available.len(),
            required = MIN_AVAILABLE,
            "not enough shards to select a safe read set"
        );
        return Err(Error::InsufficientShards {
            available: available.len(),
            required: MIN_AVAILABLE,
        });
    }

    let minimum: ShardSet = available.iter().copied().take(MIN_AVAILABLE).collect();
    debug!(?minimum, "selected minimum read set");
    Ok(minimum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ShardId;

    fn set(ids: &[usize]) -> ShardSet {
        ids.iter().map(|&i| ShardId::new(i).unwrap()).collect()
    }

    #[test]
    fn test_six_available_is_safe() {
        assert!(is_decode_safe(&set(&[0, 1, 2, 3, 4, 5]), &set(&[0])));
        assert!(is_decode_safe(&set(&[3, 4, 5, 6, 7, 8]), &set(&[0, 1, 2, 3])));
    }

    #[test]
    fn test_five_available_is_rejected() {
        assert!(!is_decode_safe(&set(&[0, 1, 2, 3, 4]), &set(&[0])));
        let err = check_decode(&set(&[0, 1, 2, 3, 4]), &set(&[0])).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientShards {
                available: 5,
                required: 6
            }
        ));
    }

    #[test]
    fn test_rejection_ignores_which_shards_survive() {
        // All four data shards present still is not enough
        assert!(!is_decode_safe(&set(&[0, 1, 2, 3]), &set(&[0, 1, 2, 3])));
        assert!(!is_decode_safe(&set(&[]), &set(&[])));
    }

    #[test]
    fn test_select_minimum_ascending() {
        let min = select_minimum(&set(&[8, 1, 7, 0, 5, 3, 2])).unwrap();
        assert_eq!(min, set(&[0, 1, 2, 3, 5, 7]));
    }

    #[test]
    fn test_select_minimum_exactly_six() {
        let all = set(&[0, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(select_minimum(&all).unwrap().len(), MIN_AVAILABLE);
    }

    #[test]
    fn test_select_minimum_insufficient() {
        assert!(matches!(
            select_minimum(&set(&[0, 2, 4])),
            Err(Error::InsufficientShards {
                available: 3,
                required: 6
            })
        ));
    }
}
