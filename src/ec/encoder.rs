//! Encode Adapter
//!
//! Turns one logical payload into all `N` chunk buffers. The transform only
//! knows how to produce every output from one input, so partial encode
//! requests are rejected up front.

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, warn};

use super::layout::{chunk_size, ALIGNMENT, CHUNK_COUNT, MAX_CHUNK_SIZE};
use crate::domain::{ShardId, ShardMap, ShardSet, ShardTransform};
use crate::error::{Error, Result};

/// A validated encode request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodePlan {
    /// Payload length in bytes
    pub input_len: usize,
    /// Size of every output chunk
    pub chunk_size: usize,
}

impl EncodePlan {
    /// Validate the requested shard set and payload length.
    pub fn new(want: &ShardSet, input_len: usize) -> Result<Self> {
        if want.len() != CHUNK_COUNT {
            warn!(
                requested = want.len(),
                "encode needs all {} chunks", CHUNK_COUNT
            );
            return Err(Error::InvalidRequest(format!(
                "encode must request all {} chunks, got {}",
                CHUNK_COUNT,
                want.len()
            )));
        }

        if !input_len.is_multiple_of(ALIGNMENT) {
            return Err(Error::InvalidRequest(format!(
                "input size {} not divisible by {}",
                input_len, ALIGNMENT
            )));
        }

        let chunk_size = chunk_size(input_len)
            .filter(|&size| size <= MAX_CHUNK_SIZE)
            .ok_or_else(|| {
                Error::InvalidRequest(format!(
                    "input size {} needs chunks larger than maximum {}",
                    input_len, MAX_CHUNK_SIZE
                ))
            })?;

        Ok(Self {
            input_len,
            chunk_size,
        })
    }

    /// Empty payloads are encoded without touching the transform.
    pub fn is_empty(&self) -> bool {
        self.input_len == 0
    }
}

/// Zero-length output for every requested shard.
pub fn empty_shards(want: &ShardSet) -> ShardMap<Bytes> {
    want.iter().map(|&id| (id, Bytes::new())).collect()
}

/// Run the transform's split over a validated plan.
///
/// `input` may be non-contiguous; it is staged into one contiguous buffer
/// first.
pub fn encode_payload<B: Buf>(
    transform: &dyn ShardTransform,
    plan: &EncodePlan,
    mut input: B,
) -> Result<ShardMap<Bytes>> {
    if input.remaining() != plan.input_len {
        return Err(Error::InvalidRequest(format!(
            "input has {} bytes, plan expects {}",
            input.remaining(),
            plan.input_len
        )));
    }

    let staging = input.copy_to_bytes(plan.input_len);

    let mut outputs: Vec<BytesMut> = (0..CHUNK_COUNT)
        .map(|_| BytesMut::zeroed(plan.chunk_size))
        .collect();
    let addresses: Vec<*const u8> = outputs.iter().map(|b| b.as_ptr()).collect();

    {
        let mut slots: Vec<&mut [u8]> = outputs.iter_mut().map(|b| &mut b[..]).collect();
        transform.split(&mut slots, &staging);
    }

    for (index, (buffer, address)) in outputs.iter().zip(&addresses).enumerate() {
        assert!(
            buffer.as_ptr() == *address && buffer.len() == plan.chunk_size,
            "output buffer for chunk {} moved or resized during split",
            index
        );
    }

    debug!(
        input_len = plan.input_len,
        chunk_size = plan.chunk_size,
        "split payload into {} chunks",
        CHUNK_COUNT
    );

    Ok(ShardId::all()
        .zip(outputs)
        .map(|(id, buffer)| (id, buffer.freeze()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writes the chunk index into every byte of its output.
    struct StampTransform;

    impl ShardTransform for StampTransform {
        fn split(&self, dst: &mut [&mut [u8]], _src: &[u8]) {
            for (i, out) in dst.iter_mut().enumerate() {
                out.fill(i as u8);
            }
        }

        fn restore(&self, _dst: &mut [u8], _src: &[Option<&[u8]>]) -> std::result::Result<(), i32> {
            Err(-1)
        }

        fn can_restore(&self, _src: &[Option<&[u8]>]) -> bool {
            false
        }
    }

    fn all() -> ShardSet {
        ShardId::all().collect()
    }

    #[test]
    fn test_partial_request_rejected() {
        let want: ShardSet = (0..3).map(|i| ShardId::new(i).unwrap()).collect();
        assert!(matches!(
            EncodePlan::new(&want, 64),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_misaligned_input_rejected() {
        assert!(matches!(
            EncodePlan::new(&all(), 13),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_oversized_input_rejected() {
        let too_big = (MAX_CHUNK_SIZE + ALIGNMENT) * 4;
        assert!(matches!(
            EncodePlan::new(&all(), too_big),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_input_near_usize_max_rejected() {
        let len = usize::MAX - 3;
        assert!(len.is_multiple_of(ALIGNMENT));
        assert!(matches!(
            EncodePlan::new(&all(), len),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_plan_chunk_size() {
        let plan = EncodePlan::new(&all(), 20).unwrap();
        assert_eq!(plan.chunk_size, 8);
        assert!(!plan.is_empty());
        assert!(EncodePlan::new(&all(), 0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_shards() {
        let out = empty_shards(&all());
        assert_eq!(out.len(), 9);
        assert!(out.values().all(|b| b.is_empty()));
    }

    #[test]
    fn test_encode_payload_fills_every_chunk() {
        let plan = EncodePlan::new(&all(), 32).unwrap();
        let out = encode_payload(&StampTransform, &plan, &[7u8; 32][..]).unwrap();

        assert_eq!(out.len(), 9);
        for (id, chunk) in &out {
            assert_eq!(chunk.len(), 8);
            assert!(chunk.iter().all(|&b| b == id.index() as u8));
        }
    }

    #[test]
    fn test_encode_payload_stages_chained_input() {
        let plan = EncodePlan::new(&all(), 16).unwrap();
        let input = Buf::chain(&[1u8; 8][..], &[2u8; 8][..]);
        let out = encode_payload(&StampTransform, &plan, input).unwrap();
        assert_eq!(out.len(), 9);
    }

    #[test]
    fn test_encode_payload_length_mismatch() {
        let plan = EncodePlan::new(&all(), 16).unwrap();
        assert!(encode_payload(&StampTransform, &plan, &[0u8; 8][..]).is_err());
    }
}
