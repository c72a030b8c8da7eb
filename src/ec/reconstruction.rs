//! Decode Adapter / Reconstruction Mapper
//!
//! The transform restores the whole original payload, not individual
//! chunks. Data shards are sliced back out of that payload with the same
//! alignment arithmetic the encoder used. Parity shards cannot be derived
//! without a full re-encode, which is the host's job: they are left out of
//! the result so the host knows to fall back.
//!
//! The policy gate and transform acquisition run in
//! [`SizeCephCodec::decode`](crate::ec::codec::SizeCephCodec::decode) before
//! anything here is called.

use bytes::{Bytes, BytesMut};
use tracing::{debug, error, warn};

use super::layout::{ALIGNMENT, CHUNK_COUNT, DATA_CHUNKS, MAX_CHUNK_SIZE};
use crate::domain::{ShardId, ShardMap, ShardSet, ShardTransform};
use crate::error::{Error, Result};

/// Result of a successful decode.
#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    /// Requested data shards, sliced from the restored payload
    pub shards: ShardMap<Bytes>,
    /// Requested parity shards left for the host's encode fallback
    pub deferred: ShardSet,
}

/// Settle the chunk size for a decode.
///
/// An explicit size wins; otherwise it comes from any supplied chunk. Every
/// supplied chunk must then be exactly that long.
pub fn resolve_chunk_size(chunks: &ShardMap<Bytes>, explicit: Option<usize>) -> Result<usize> {
    let size = explicit
        .filter(|&s| s > 0)
        .or_else(|| chunks.values().next().map(Bytes::len))
        .unwrap_or(0);

    if size == 0 {
        return Err(Error::InvalidRequest(
            "chunk size unknown: none given and no chunks supplied".into(),
        ));
    }

    if !size.is_multiple_of(ALIGNMENT) || size > MAX_CHUNK_SIZE {
        return Err(Error::InvalidRequest(format!(
            "chunk size {} must be a multiple of {} and at most {}",
            size, ALIGNMENT, MAX_CHUNK_SIZE
        )));
    }

    if let Some((id, chunk)) = chunks.iter().find(|(_, c)| c.len() != size) {
        return Err(Error::InvalidRequest(format!(
            "chunk {} has {} bytes, expected {}",
            id,
            chunk.len(),
            size
        )));
    }

    Ok(size)
}

/// Probe, restore, and map the restored payload onto the requested shards.
pub fn reconstruct(
    transform: &dyn ShardTransform,
    want: &ShardSet,
    chunks: &ShardMap<Bytes>,
    chunk_size: usize,
) -> Result<Reconstruction> {
    let mut slots: Vec<Option<&[u8]>> = vec![None; CHUNK_COUNT];
    for (id, chunk) in chunks {
        slots[id.index()] = Some(chunk.as_ref());
    }

    if !transform.can_restore(&slots) {
        let missing: Vec<usize> = (0..CHUNK_COUNT).filter(|&i| slots[i].is_none()).collect();
        warn!(?missing, "transform reports pattern not restorable");
        return Err(Error::UnsupportedPattern { missing });
    }

    let original_len = chunk_size * DATA_CHUNKS;
    let mut restored = BytesMut::zeroed(original_len);
    if let Err(code) = transform.restore(&mut restored, &slots) {
        error!(
            code,
            original_len,
            available = chunks.len(),
            "restore failed; possible chunk corruption or transform defect"
        );
        return Err(Error::ReconstructionFailed { code });
    }

    Ok(map_restored(want, restored.freeze()))
}

/// Slice data shards out of a restored payload; defer parity shards.
///
/// `restored` is `DATA_CHUNKS * chunk_size` bytes long.
pub fn map_restored(want: &ShardSet, restored: Bytes) -> Reconstruction {
    let portion = restored.len() / DATA_CHUNKS;
    let mut out = Reconstruction::default();

    for &id in want {
        if id.is_parity() {
            debug!(shard = %id, "parity shard left for encode fallback");
            out.deferred.insert(id);
            continue;
        }

        let start = id.index() * portion;
        let end = if id.index() == DATA_CHUNKS - 1 {
            restored.len()
        } else {
            start + portion
        };
        let slice = restored.slice(start..end);
        debug!(shard = %id, len = slice.len(), "data shard reconstructed");
        out.shards.insert(id, slice);
    }

    out
}

/// Concatenate decoded shards in the caller's order.
///
/// Shards missing from `decoded` become `chunk_size` zero bytes so stream
/// offsets stay predictable. The zeros are a placeholder, not data.
pub fn concat(order: &[ShardId], decoded: &ShardMap<Bytes>, chunk_size: usize) -> Bytes {
    let mut out = BytesMut::with_capacity(order.len() * chunk_size);

    for id in order {
        match decoded.get(id) {
            Some(chunk) => out.extend_from_slice(chunk),
            None => {
                warn!(
                    shard = %id,
                    chunk_size,
                    "shard not reconstructed; appending zero placeholder"
                );
                out.resize(out.len() + chunk_size, 0);
            }
        }
    }

    out.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(i: usize) -> ShardId {
        ShardId::new(i).unwrap()
    }

    fn set(ids: &[usize]) -> ShardSet {
        ids.iter().map(|&i| id(i)).collect()
    }

    /// Restores a payload of ascending bytes; probe and restore are scripted.
    struct ScriptedTransform {
        probe: bool,
        restore_code: Option<i32>,
    }

    impl ShardTransform for ScriptedTransform {
        fn split(&self, _dst: &mut [&mut [u8]], _src: &[u8]) {}

        fn restore(&self, dst: &mut [u8], src: &[Option<&[u8]>]) -> std::result::Result<(), i32> {
            assert_eq!(src.len(), CHUNK_COUNT);
            if let Some(code) = self.restore_code {
                return Err(code);
            }
            for (i, b) in dst.iter_mut().enumerate() {
                *b = i as u8;
            }
            Ok(())
        }

        fn can_restore(&self, _src: &[Option<&[u8]>]) -> bool {
            self.probe
        }
    }

    fn chunks(ids: &[usize], size: usize) -> ShardMap<Bytes> {
        ids.iter()
            .map(|&i| (id(i), Bytes::from(vec![0u8; size])))
            .collect()
    }

    #[test]
    fn test_resolve_prefers_explicit() {
        assert_eq!(resolve_chunk_size(&chunks(&[0], 8), Some(8)).unwrap(), 8);
        assert_eq!(resolve_chunk_size(&chunks(&[0, 1], 8), None).unwrap(), 8);
        assert_eq!(resolve_chunk_size(&chunks(&[0, 1], 8), Some(0)).unwrap(), 8);
    }

    #[test]
    fn test_resolve_unknown_size() {
        assert!(matches!(
            resolve_chunk_size(&ShardMap::new(), None),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_resolve_rejects_mismatched_lengths() {
        let mut c = chunks(&[0, 1], 8);
        c.insert(id(2), Bytes::from(vec![0u8; 4]));
        assert!(resolve_chunk_size(&c, None).is_err());
        assert!(resolve_chunk_size(&chunks(&[0], 8), Some(16)).is_err());
    }

    #[test]
    fn test_resolve_rejects_unaligned() {
        assert!(resolve_chunk_size(&chunks(&[0], 6), None).is_err());
    }

    #[test]
    fn test_data_shards_sliced_in_order() {
        let restored = Bytes::from((0..32u8).collect::<Vec<_>>());
        let out = map_restored(&set(&[0, 1, 2, 3]), restored);

        assert!(out.deferred.is_empty());
        assert_eq!(out.shards[&id(0)].as_ref(), &(0..8u8).collect::<Vec<_>>()[..]);
        assert_eq!(out.shards[&id(3)].as_ref(), &(24..32u8).collect::<Vec<_>>()[..]);
    }

    #[test]
    fn test_parity_shards_deferred() {
        let restored = Bytes::from(vec![1u8; 16]);
        let out = map_restored(&set(&[1, 4, 8]), restored);

        assert_eq!(out.shards.len(), 1);
        assert!(out.shards.contains_key(&id(1)));
        assert!(!out.shards.contains_key(&id(4)));
        assert_eq!(out.deferred, set(&[4, 8]));
    }

    #[test]
    fn test_probe_refusal_is_unsupported_pattern() {
        let t = ScriptedTransform {
            probe: false,
            restore_code: None,
        };
        let err = reconstruct(&t, &set(&[0]), &chunks(&[0, 1, 2, 3, 4, 5], 4), 4).unwrap_err();
        match err {
            Error::UnsupportedPattern { missing } => assert_eq!(missing, vec![6, 7, 8]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_restore_failure() {
        let t = ScriptedTransform {
            probe: true,
            restore_code: Some(-3),
        };
        let err = reconstruct(&t, &set(&[0]), &chunks(&[0, 1, 2, 3, 4, 5], 4), 4).unwrap_err();
        assert!(matches!(err, Error::ReconstructionFailed { code: -3 }));
    }

    #[test]
    fn test_reconstruct_restores_full_payload() {
        let t = ScriptedTransform {
            probe: true,
            restore_code: None,
        };
        let out = reconstruct(&t, &set(&[2, 3]), &chunks(&[0, 1, 2, 3, 4, 5], 4), 4).unwrap();
        assert_eq!(out.shards[&id(2)].as_ref(), &[8, 9, 10, 11]);
        assert_eq!(out.shards[&id(3)].as_ref(), &[12, 13, 14, 15]);
    }

    #[test]
    fn test_concat_zero_fills_in_caller_order() {
        let mut decoded = ShardMap::new();
        decoded.insert(id(0), Bytes::from_static(&[1, 1, 1, 1]));
        decoded.insert(id(2), Bytes::from_static(&[2, 2, 2, 2]));

        let out = concat(&[id(2), id(5), id(0)], &decoded, 4);
        assert_eq!(out.as_ref(), &[2, 2, 2, 2, 0, 0, 0, 0, 1, 1, 1, 1]);
    }
}
