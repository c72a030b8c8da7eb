//! Property-Based Tests for the SizeCeph Codec
//!
//! # Test Properties
//!
//! 1. **Alignment**: chunk size × K covers the input and stays 16-aligned
//! 2. **Safety Gate**: fewer than six survivors never reach the transform
//! 3. **Roundtrip Correctness**: any six or more survivors restore the
//!    payload as a prefix of the aligned total
//! 4. **Parity Deferral**: requested parity shards never appear in results

#![cfg(test)]

use std::sync::Arc;

use bytes::Bytes;
use proptest::prelude::*;

use super::binding::TransformBinding;
use super::codec::SizeCephCodec;
use super::layout::{aligned_total, chunk_size, CHUNK_COUNT, DATA_CHUNKS, MIN_AVAILABLE};
use super::policy::{is_decode_safe, select_minimum};
use super::profile::Profile;
use crate::adapters::ReedSolomonLoader;
use crate::domain::{ShardId, ShardMap, ShardSet};
use crate::error::Error;

// =============================================================================
// Property Strategies
// =============================================================================

/// Payloads whose length is a multiple of the alignment.
fn aligned_data_strategy() -> impl Strategy<Value = Vec<u8>> {
    (1usize..=256).prop_flat_map(|words| prop::collection::vec(any::<u8>(), words * 4))
}

/// Survivor sets large enough to pass the gate.
fn safe_survivors_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::sample::subsequence((0..CHUNK_COUNT).collect::<Vec<_>>(), MIN_AVAILABLE..=CHUNK_COUNT)
}

/// Survivor sets the gate must reject.
fn unsafe_survivors_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::sample::subsequence((0..CHUNK_COUNT).collect::<Vec<_>>(), 0..MIN_AVAILABLE)
}

fn want_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::sample::subsequence((0..CHUNK_COUNT).collect::<Vec<_>>(), 1..=CHUNK_COUNT)
}

fn ids(indices: &[usize]) -> ShardSet {
    indices.iter().map(|&i| ShardId::new(i).unwrap()).collect()
}

fn codec() -> SizeCephCodec {
    SizeCephCodec::with_profile(TransformBinding::new(ReedSolomonLoader), Profile::fixed())
        .unwrap()
}

// =============================================================================
// Layout Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: The aligned total covers the input by less than 16 bytes.
    #[test]
    fn prop_aligned_total_bounds(len in 0usize..1_000_000) {
        let total = aligned_total(len).unwrap();
        prop_assert!(total >= len);
        prop_assert!(total - len < 16);
        prop_assert_eq!(total % 16, 0);
    }

    /// Property: Widths without a representable aligned total are refused.
    #[test]
    fn prop_overflowing_widths_refused(gap in 0usize..15) {
        let width = usize::MAX - gap;
        prop_assert_eq!(aligned_total(width), None);
        prop_assert_eq!(chunk_size(width), None);
    }

    /// Property: Chunk size splits the aligned total evenly across K.
    #[test]
    fn prop_chunk_size_alignment(width in 0usize..1_000_000) {
        let size = chunk_size(width).unwrap();
        prop_assert_eq!(Some(size * DATA_CHUNKS), aligned_total(width));
        prop_assert_eq!(size % 4, 0);
    }
}

// =============================================================================
// Policy Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: Fewer than six survivors are always rejected.
    #[test]
    fn prop_gate_rejects_unsafe(survivors in unsafe_survivors_strategy()) {
        let available = ids(&survivors);
        prop_assert!(!is_decode_safe(&available, &ids(&[0])));
        let rejected = matches!(select_minimum(&available), Err(Error::InsufficientShards { .. }));
        prop_assert!(rejected);
    }

    /// Property: The minimum read set is the six lowest survivors.
    #[test]
    fn prop_minimum_is_lowest_six(survivors in safe_survivors_strategy()) {
        let available = ids(&survivors);
        prop_assert!(is_decode_safe(&available, &ids(&[0])));

        let minimum = select_minimum(&available)?;
        prop_assert_eq!(minimum.len(), MIN_AVAILABLE);
        prop_assert!(minimum.is_subset(&available));
        let expected: ShardSet = available.iter().copied().take(MIN_AVAILABLE).collect();
        prop_assert_eq!(minimum, expected);
    }
}

// =============================================================================
// Roundtrip Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: Any gate-passing survivor set restores the payload.
    #[test]
    fn prop_roundtrip_with_survivors(
        data in aligned_data_strategy(),
        survivors in safe_survivors_strategy(),
    ) {
        let codec = codec();
        let encoded = codec.encode(&ids(&(0..CHUNK_COUNT).collect::<Vec<_>>()), &data[..])?;
        let size = chunk_size(data.len()).unwrap();
        prop_assert!(encoded.values().all(|c| c.len() == size));

        let chunks: ShardMap<Bytes> = encoded
            .into_iter()
            .filter(|(id, _)| survivors.contains(&id.index()))
            .collect();

        let decoded = codec.decode(&ids(&[0, 1, 2, 3]), &chunks, None)?;
        let joined: Vec<u8> = decoded.values().flat_map(|c| c.iter().copied()).collect();

        prop_assert_eq!(Some(joined.len()), aligned_total(data.len()));
        prop_assert_eq!(&joined[..data.len()], &data[..]);
        prop_assert!(joined[data.len()..].iter().all(|&b| b == 0));
    }

    /// Property: Results hold exactly the requested data shards.
    #[test]
    fn prop_parity_never_returned(
        data in aligned_data_strategy(),
        want in want_strategy(),
    ) {
        let codec = codec();
        let encoded = codec.encode(&ids(&(0..CHUNK_COUNT).collect::<Vec<_>>()), &data[..])?;
        let want = ids(&want);

        let decoded = codec.decode(&want, &encoded, None)?;
        let expected: ShardSet = want.iter().copied().filter(|id| id.is_data()).collect();
        let got: ShardSet = decoded.keys().copied().collect();
        prop_assert_eq!(got, expected);
    }

    /// Property: Encoding the same payload twice gives identical shards.
    #[test]
    fn prop_encoding_deterministic(data in aligned_data_strategy()) {
        let binding = TransformBinding::new(ReedSolomonLoader);
        let a = SizeCephCodec::with_profile(Arc::clone(&binding), Profile::fixed())?;
        let b = SizeCephCodec::with_profile(binding, Profile::fixed())?;
        let all = ids(&(0..CHUNK_COUNT).collect::<Vec<_>>());
        prop_assert_eq!(a.encode(&all, &data[..])?, b.encode(&all, &data[..])?);
    }
}
