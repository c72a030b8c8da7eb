//! Integer-Keyed Compatibility Shims
//!
//! Older hosts address shards with plain integers. Each function here only
//! converts at the boundary and forwards to [`SizeCephCodec`]; none carries
//! logic of its own.

use std::collections::{BTreeMap, BTreeSet};

use bytes::{Buf, Bytes};

use super::codec::SizeCephCodec;
use super::layout::SUB_CHUNK_COUNT;
use crate::domain::{ShardId, ShardMap, ShardSet};
use crate::error::Result;

/// Per-shard sub-chunk ranges `(offset, count)`.
pub type SubChunkRanges = BTreeMap<i32, Vec<(usize, usize)>>;

fn to_set(ids: &BTreeSet<i32>) -> Result<ShardSet> {
    ids.iter().map(|&i| ShardId::try_from(i)).collect()
}

fn to_map<T: Clone>(map: &BTreeMap<i32, T>) -> Result<ShardMap<T>> {
    map.iter()
        .map(|(&i, v)| Ok((ShardId::try_from(i)?, v.clone())))
        .collect()
}

fn from_map<T>(map: ShardMap<T>) -> BTreeMap<i32, T> {
    map.into_iter().map(|(id, v)| (i32::from(id), v)).collect()
}

fn from_set(set: ShardSet) -> BTreeSet<i32> {
    set.into_iter().map(i32::from).collect()
}

pub fn encode<B: Buf>(
    codec: &SizeCephCodec,
    want: &BTreeSet<i32>,
    input: B,
) -> Result<BTreeMap<i32, Bytes>> {
    codec.encode(&to_set(want)?, input).map(from_map)
}

/// `chunk_size <= 0` means "derive from the supplied chunks".
pub fn decode(
    codec: &SizeCephCodec,
    want: &BTreeSet<i32>,
    chunks: &BTreeMap<i32, Bytes>,
    chunk_size: i32,
) -> Result<BTreeMap<i32, Bytes>> {
    let chunk_size = usize::try_from(chunk_size).ok().filter(|&s| s > 0);
    codec
        .decode(&to_set(want)?, &to_map(chunks)?, chunk_size)
        .map(from_map)
}

pub fn decode_concat(
    codec: &SizeCephCodec,
    order: &[i32],
    chunks: &BTreeMap<i32, Bytes>,
) -> Result<Bytes> {
    let order = order
        .iter()
        .map(|&i| ShardId::try_from(i))
        .collect::<Result<Vec<_>>>()?;
    codec.decode_concat(&order, &to_map(chunks)?)
}

/// Concatenate every data shard in index order.
pub fn decode_concat_data(codec: &SizeCephCodec, chunks: &BTreeMap<i32, Bytes>) -> Result<Bytes> {
    let order: Vec<ShardId> = ShardId::data().collect();
    codec.decode_concat(&order, &to_map(chunks)?)
}

/// Minimum read set, each shard read whole.
pub fn minimum_to_decode(
    codec: &SizeCephCodec,
    want: &BTreeSet<i32>,
    available: &BTreeSet<i32>,
) -> Result<SubChunkRanges> {
    let minimum = codec.minimum_to_decode(&to_set(want)?, &to_set(available)?)?;
    Ok(minimum
        .into_iter()
        .map(|id| (i32::from(id), vec![(0, SUB_CHUNK_COUNT)]))
        .collect())
}

pub fn minimum_to_decode_with_cost(
    codec: &SizeCephCodec,
    want: &BTreeSet<i32>,
    available: &BTreeMap<i32, u32>,
) -> Result<BTreeSet<i32>> {
    codec
        .minimum_to_decode_with_cost(&to_set(want)?, &to_map(available)?)
        .map(from_set)
}
