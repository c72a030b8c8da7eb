//! Reed-Solomon Transform Adapter
//!
//! Implements the `ShardTransform` port with a systematic 4+5 Reed-Solomon
//! code over GF(2^8). Data shards are direct slices of the payload, so the
//! restored payload is simply the concatenated data shards.
//!
//! This is the bundled transform: it needs no external library and accepts
//! every hole pattern with at least four survivors.

use std::sync::Arc;

use reed_solomon_erasure::galois_8::ReedSolomon;
use tracing::{debug, error};

use crate::domain::{ShardTransform, TransformLoader};
use crate::ec::layout::{CHUNK_COUNT, CODING_CHUNKS, DATA_CHUNKS};
use crate::error::{Error, Result};

/// Status returned by a failed restore (negated EIO).
const RESTORE_FAILED: i32 = -5;

/// Reed-Solomon based split/restore transform.
pub struct ReedSolomonTransform {
    rs: ReedSolomon,
}

impl std::fmt::Debug for ReedSolomonTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReedSolomonTransform")
            .field("data_shards", &DATA_CHUNKS)
            .field("parity_shards", &CODING_CHUNKS)
            .finish()
    }
}

impl ReedSolomonTransform {
    pub fn new() -> Result<Self> {
        let rs = ReedSolomon::new(DATA_CHUNKS, CODING_CHUNKS).map_err(|e| {
            Error::BackendUnavailable(format!("failed to create Reed-Solomon codec: {:?}", e))
        })?;
        Ok(Self { rs })
    }
}

impl ShardTransform for ReedSolomonTransform {
    fn split(&self, dst: &mut [&mut [u8]], src: &[u8]) {
        let chunk = dst.first().map_or(0, |d| d.len());
        if chunk == 0 || dst.len() != CHUNK_COUNT {
            return;
        }

        let (data, parity) = dst.split_at_mut(DATA_CHUNKS);
        for (i, shard) in data.iter_mut().enumerate() {
            let start = (i * chunk).min(src.len());
            let end = ((i + 1) * chunk).min(src.len());
            shard[..end - start].copy_from_slice(&src[start..end]);
            shard[end - start..].fill(0);
        }

        if let Err(e) = self.rs.encode_sep(&*data, parity) {
            error!(error = ?e, chunk, "parity generation failed");
        }
    }

    fn restore(&self, dst: &mut [u8], src: &[Option<&[u8]>]) -> std::result::Result<(), i32> {
        let mut shards: Vec<Option<Vec<u8>>> =
            src.iter().map(|s| s.map(<[u8]>::to_vec)).collect();

        self.rs.reconstruct_data(&mut shards).map_err(|e| {
            debug!(error = ?e, "Reed-Solomon data reconstruction failed");
            RESTORE_FAILED
        })?;

        let mut offset = 0;
        for shard in shards.iter().take(DATA_CHUNKS).flatten() {
            if offset >= dst.len() {
                break;
            }
            let n = shard.len().min(dst.len() - offset);
            dst[offset..offset + n].copy_from_slice(&shard[..n]);
            offset += n;
        }

        if offset < dst.len() {
            return Err(RESTORE_FAILED);
        }
        Ok(())
    }

    fn can_restore(&self, src: &[Option<&[u8]>]) -> bool {
        src.len() == CHUNK_COUNT && src.iter().filter(|s| s.is_some()).count() >= DATA_CHUNKS
    }
}

/// Loader for the bundled Reed-Solomon transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReedSolomonLoader;

impl TransformLoader for ReedSolomonLoader {
    fn describe(&self) -> String {
        format!("reed-solomon {}+{} (bundled)", DATA_CHUNKS, CODING_CHUNKS)
    }

    fn load(&self) -> Result<Arc<dyn ShardTransform>> {
        Ok(Arc::new(ReedSolomonTransform::new()?))
    }
}
