//! SizeCeph Codec
//!
//! The backend instance a host creates per configured pool. It ties the
//! fixed layout, the policy guard, the transform binding, and the
//! encode/decode adapters into the interface the storage host drives.
//!
//! # Example
//!
//! ```rust,ignore
//! use sizeceph_ec::adapters::ReedSolomonLoader;
//! use sizeceph_ec::ec::{Profile, SizeCephCodec, TransformBinding};
//!
//! let binding = TransformBinding::new(ReedSolomonLoader);
//! let codec = SizeCephCodec::with_profile(binding, Profile::fixed())?;
//!
//! let want = ShardId::all().collect();
//! let shards = codec.encode(&want, &payload[..])?;
//! ```

use std::sync::Arc;

use bytes::{Buf, Bytes};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::binding::{TransformBinding, TransformLease};
use super::encoder::{empty_shards, encode_payload, EncodePlan};
use super::layout::{self, ALIGNMENT, CHUNK_COUNT, CODING_CHUNKS, DATA_CHUNKS, SUB_CHUNK_COUNT};
use super::policy;
use super::profile::Profile;
use super::reconstruction::{self, Reconstruction};
use super::stats::{CodecStats, CodecStatsSnapshot};
use crate::domain::{PlacementRules, RuleMode, ShardId, ShardMap, ShardSet, ShardTransform};
use crate::error::{Error, Result};

/// Optional fast paths the host may use with this backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Optimizations {
    /// Basic optimized EC pipeline
    pub optimized: bool,
    /// Zero-length input handled without padding
    pub zero_padding: bool,
    /// Reading a sub-range of chunks directly
    pub partial_read: bool,
    /// Rewriting a sub-range without full re-encode
    pub partial_write: bool,
    /// Parity update from data deltas
    pub parity_delta: bool,
}

/// Outcome of [`SizeCephCodec::init`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum InitState {
    Uninitialized,
    Ready,
    /// Profile rejected; every later call fails with this message.
    Rejected(String),
}

/// Fixed 4+5 erasure code backend.
pub struct SizeCephCodec {
    binding: Arc<TransformBinding>,
    state: InitState,
    /// Acquired on first use; dropping the codec releases it.
    lease: OnceCell<TransformLease>,
    profile: Profile,
    chunk_mapping: Vec<ShardId>,
    stats: CodecStats,
}

impl std::fmt::Debug for SizeCephCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SizeCephCodec")
            .field("state", &self.state)
            .field("profile", &self.profile)
            .field("acquired", &self.lease.get().is_some())
            .finish()
    }
}

impl SizeCephCodec {
    /// Create a codec over a shared binding. Nothing is loaded yet, and
    /// encode/decode fail until [`init`](Self::init) succeeds.
    pub fn new(binding: Arc<TransformBinding>) -> Self {
        Self {
            binding,
            state: InitState::Uninitialized,
            lease: OnceCell::new(),
            profile: Profile::new(),
            chunk_mapping: ShardId::all().collect(),
            stats: CodecStats::new(),
        }
    }

    /// Create and initialize a codec in one step.
    pub fn with_profile(binding: Arc<TransformBinding>, profile: Profile) -> Result<Self> {
        let mut codec = Self::new(binding);
        codec.init(profile)?;
        Ok(codec)
    }

    /// Validate the profile against the fixed layout and load the transform.
    ///
    /// A rejected profile is final: this and every later call return the
    /// same `Configuration` error. A load failure is not; the transform is
    /// acquired again on first use.
    pub fn init(&mut self, profile: Profile) -> Result<()> {
        debug!(%profile, "initializing codec");
        if let InitState::Rejected(reason) = &self.state {
            return Err(Error::Configuration(reason.clone()));
        }

        if let Err(e) = profile.validate() {
            let reason = match &e {
                Error::Configuration(reason) => reason.clone(),
                other => other.to_string(),
            };
            warn!(%profile, %reason, "profile rejected");
            self.state = InitState::Rejected(reason);
            return Err(e);
        }
        self.profile = profile;
        self.state = InitState::Ready;

        info!(
            k = DATA_CHUNKS,
            m = CODING_CHUNKS,
            n = CHUNK_COUNT,
            min_available = layout::MIN_AVAILABLE,
            "codec configured"
        );

        self.transform()?;
        Ok(())
    }

    /// Fail unless a profile has been accepted.
    fn ensure_ready(&self) -> Result<()> {
        match &self.state {
            InitState::Ready => Ok(()),
            InitState::Uninitialized => Err(Error::Configuration(
                "codec used before init".into(),
            )),
            InitState::Rejected(reason) => Err(Error::Configuration(reason.clone())),
        }
    }

    fn transform(&self) -> Result<&dyn ShardTransform> {
        self.lease
            .get_or_try_init(|| self.binding.acquire())
            .map(TransformLease::transform)
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn chunk_count(&self) -> usize {
        CHUNK_COUNT
    }

    pub fn data_chunk_count(&self) -> usize {
        DATA_CHUNKS
    }

    pub fn coding_chunk_count(&self) -> usize {
        CODING_CHUNKS
    }

    pub fn sub_chunk_count(&self) -> usize {
        SUB_CHUNK_COUNT
    }

    pub fn minimum_granularity(&self) -> usize {
        ALIGNMENT
    }

    /// Per-chunk size for a stripe width.
    pub fn chunk_size(&self, stripe_width: usize) -> Result<usize> {
        layout::chunk_size(stripe_width).ok_or_else(|| {
            Error::InvalidRequest(format!(
                "stripe width {} has no aligned chunk size",
                stripe_width
            ))
        })
    }

    /// Shard position to chunk mapping (identity).
    pub fn chunk_mapping(&self) -> &[ShardId] {
        &self.chunk_mapping
    }

    /// Shards to read for a decode of `want`.
    pub fn minimum_to_decode(&self, want: &ShardSet, available: &ShardSet) -> Result<ShardSet> {
        debug!(?want, ?available, "minimum_to_decode");
        policy::select_minimum(available)
    }

    /// Same selection as [`minimum_to_decode`](Self::minimum_to_decode);
    /// read costs do not influence it.
    pub fn minimum_to_decode_with_cost(
        &self,
        want: &ShardSet,
        available: &ShardMap<u32>,
    ) -> Result<ShardSet> {
        let available: ShardSet = available.keys().copied().collect();
        self.minimum_to_decode(want, &available)
    }

    pub fn supported_optimizations(&self) -> Optimizations {
        Optimizations {
            optimized: true,
            zero_padding: true,
            partial_read: false,
            partial_write: false,
            parity_delta: false,
        }
    }

    /// Return the id of rule `name`, creating an independent per-domain rule
    /// if it does not exist yet.
    pub fn create_rule(&self, name: &str, rules: &mut dyn PlacementRules) -> Result<i32> {
        if let Some(id) = rules.rule_id(name) {
            return Ok(id);
        }

        let id = rules
            .add_simple_rule(
                name,
                self.profile.rule_root(),
                self.profile.failure_domain(),
                RuleMode::Indep,
            )
            .map_err(|e| Error::Placement(format!("failed to create rule {}: {}", name, e)))?;

        if id < 0 {
            return Err(Error::Placement(format!(
                "failed to create rule {}: error {}",
                name, id
            )));
        }

        info!(rule = name, id, "created placement rule");
        Ok(id)
    }

    /// Encode a payload into all chunks.
    #[instrument(skip(self, input), fields(input_len = input.remaining()))]
    pub fn encode<B: Buf>(&self, want: &ShardSet, input: B) -> Result<ShardMap<Bytes>> {
        self.ensure_ready()?;
        let plan = EncodePlan::new(want, input.remaining())?;

        if plan.is_empty() {
            return Ok(empty_shards(want));
        }

        let transform = self.transform()?;
        let encoded = encode_payload(transform, &plan, input)?;
        self.stats.record_encode();
        Ok(encoded)
    }

    /// Reconstruct requested shards from survivors.
    ///
    /// Requested parity shards are absent from the result: the host must
    /// recompute them by re-encoding the recovered payload.
    #[instrument(skip(self, chunks), fields(available = chunks.len()))]
    pub fn decode(
        &self,
        want: &ShardSet,
        chunks: &ShardMap<Bytes>,
        chunk_size: Option<usize>,
    ) -> Result<ShardMap<Bytes>> {
        self.decode_inner(want, chunks, chunk_size)
            .map(|(reconstruction, _)| reconstruction.shards)
    }

    /// Decode and concatenate shards in the caller's order.
    ///
    /// Shards that cannot be reconstructed occupy a zero-filled span of one
    /// chunk so offsets stay stable.
    #[instrument(skip(self, chunks), fields(available = chunks.len()))]
    pub fn decode_concat(&self, order: &[ShardId], chunks: &ShardMap<Bytes>) -> Result<Bytes> {
        let want: ShardSet = order.iter().copied().collect();
        let explicit = chunks.values().next().map(Bytes::len);

        let (reconstruction, chunk_size) = self.decode_inner(&want, chunks, explicit)?;
        let out = reconstruction::concat(order, &reconstruction.shards, chunk_size);

        debug!(len = out.len(), shards = order.len(), "decode_concat complete");
        Ok(out)
    }

    fn decode_inner(
        &self,
        want: &ShardSet,
        chunks: &ShardMap<Bytes>,
        chunk_size: Option<usize>,
    ) -> Result<(Reconstruction, usize)> {
        self.ensure_ready()?;
        let available: ShardSet = chunks.keys().copied().collect();
        policy::check_decode(&available, want).inspect_err(|_| {
            self.stats.record_policy_rejection();
        })?;

        let transform = self.transform()?;
        let chunk_size = reconstruction::resolve_chunk_size(chunks, chunk_size)?;

        let reconstruction = reconstruction::reconstruct(transform, want, chunks, chunk_size)
            .inspect_err(|e| match e {
                Error::UnsupportedPattern { .. } => self.stats.record_probe_refusal(),
                Error::ReconstructionFailed { .. } => self.stats.record_restore_failure(),
                _ => {}
            })?;

        self.stats.record_decode();
        self.stats
            .record_deferred_parity(reconstruction.deferred.len());
        Ok((reconstruction, chunk_size))
    }

    /// Chunk-level encode is not offered; use [`encode`](Self::encode).
    pub fn encode_chunks(&self, _input: &ShardMap<Bytes>) -> Result<ShardMap<Bytes>> {
        Err(Error::Unsupported {
            operation: "encode_chunks",
        })
    }

    /// Chunk-level decode is not offered; use [`decode`](Self::decode).
    pub fn decode_chunks(
        &self,
        _want: &ShardSet,
        _input: &ShardMap<Bytes>,
    ) -> Result<ShardMap<Bytes>> {
        Err(Error::Unsupported {
            operation: "decode_chunks",
        })
    }

    /// The transform's output does not admit incremental updates.
    pub fn encode_delta(&self, _old: &[u8], _new: &[u8]) -> Result<Bytes> {
        Err(Error::Unsupported {
            operation: "encode_delta",
        })
    }

    pub fn apply_delta(
        &self,
        _input: &ShardMap<Bytes>,
        _output: &mut ShardMap<Bytes>,
    ) -> Result<()> {
        Err(Error::Unsupported {
            operation: "apply_delta",
        })
    }

    pub fn stats(&self) -> CodecStatsSnapshot {
        self.stats.snapshot()
    }
}
