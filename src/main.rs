//! SizeCeph Command-Line Tool
//!
//! Encodes files into nine shard files and decodes them back, exercising
//! the same codec a storage host would load.
//!
//! ```text
//! sizeceph encode --input blob.bin --out-dir shards/
//! rm shards/shard.1 shards/shard.6
//! sizeceph decode --shard-dir shards/ --output restored.bin
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sizeceph_ec::domain::{ShardId, ShardMap, ShardSet, TransformLoader};
use sizeceph_ec::ec::layout::{self, ALIGNMENT, CHUNK_COUNT, MIN_AVAILABLE};
use sizeceph_ec::ec::{Optimizations, Profile, SizeCephCodec, TransformBinding};

// =============================================================================
// CLI Arguments
// =============================================================================

/// SizeCeph - fixed 4+5 erasure code backend
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,

    /// Erasure code profile as key=value pairs
    #[arg(long, env = "SIZECEPH_PROFILE", default_value = "k=4,m=5", global = true)]
    profile: String,

    /// Load the transform from this shared library instead of the bundled one
    #[cfg(all(unix, feature = "native"))]
    #[arg(long, env = "SIZECEPH_LIBRARY", global = true)]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print layout constants and capability flags
    Info,

    /// Split a file into shard files
    Encode {
        /// File to encode
        #[arg(long)]
        input: PathBuf,

        /// Directory receiving shard.<i> files and meta.json
        #[arg(long)]
        out_dir: PathBuf,
    },

    /// Rebuild a file from the shard files present in a directory
    Decode {
        /// Directory holding shard.<i> files and meta.json
        #[arg(long)]
        shard_dir: PathBuf,

        /// Where to write the restored file
        #[arg(long)]
        output: PathBuf,
    },
}

/// Sidecar written next to the shard files.
#[derive(Debug, Serialize, Deserialize)]
struct ShardMeta {
    original_len: usize,
    chunk_size: usize,
    profile: Profile,
}

#[derive(Debug, Serialize)]
struct LayoutInfo<'a> {
    transform: String,
    k: usize,
    m: usize,
    n: usize,
    min_available: usize,
    max_tolerated_failures: usize,
    alignment: usize,
    max_chunk_size: usize,
    profile: &'a Profile,
    optimizations: Optimizations,
}

const META_FILE: &str = "meta.json";

// =============================================================================
// Main
// =============================================================================

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let profile = Profile::parse(&args.profile).context("invalid --profile")?;
    let loader = transform_loader(&args);
    let transform = loader.describe();
    let codec = SizeCephCodec::with_profile(TransformBinding::from_boxed(loader), profile)
        .with_context(|| format!("failed to initialize codec with {}", transform))?;

    match args.command {
        Command::Info => print_info(&codec, transform),
        Command::Encode { input, out_dir } => encode_file(&codec, &input, &out_dir),
        Command::Decode { shard_dir, output } => decode_dir(&codec, &shard_dir, &output),
    }
}

#[cfg(all(unix, feature = "native"))]
fn transform_loader(args: &Args) -> Box<dyn TransformLoader> {
    use sizeceph_ec::adapters::NativeLibraryLoader;

    match &args.library {
        Some(path) => Box::new(NativeLibraryLoader::with_path(path)),
        None => Box::new(sizeceph_ec::adapters::ReedSolomonLoader),
    }
}

#[cfg(not(all(unix, feature = "native")))]
fn transform_loader(_args: &Args) -> Box<dyn TransformLoader> {
    Box::new(sizeceph_ec::adapters::ReedSolomonLoader)
}

// =============================================================================
// Commands
// =============================================================================

fn print_info(codec: &SizeCephCodec, transform: String) -> anyhow::Result<()> {
    let info = LayoutInfo {
        transform,
        k: codec.data_chunk_count(),
        m: codec.coding_chunk_count(),
        n: codec.chunk_count(),
        min_available: MIN_AVAILABLE,
        max_tolerated_failures: layout::MAX_TOLERATED_FAILURES,
        alignment: codec.minimum_granularity(),
        max_chunk_size: layout::MAX_CHUNK_SIZE,
        profile: codec.profile(),
        optimizations: codec.supported_optimizations(),
    };
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn shard_path(dir: &Path, id: ShardId) -> PathBuf {
    dir.join(format!("shard.{}", id))
}

fn encode_file(codec: &SizeCephCodec, input: &Path, out_dir: &Path) -> anyhow::Result<()> {
    let mut data =
        fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let original_len = data.len();
    data.resize(original_len.next_multiple_of(ALIGNMENT), 0);

    let all: ShardSet = ShardId::all().collect();
    let shards = codec.encode(&all, &data[..])?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    for (&id, chunk) in &shards {
        let path = shard_path(out_dir, id);
        fs::write(&path, chunk).with_context(|| format!("failed to write {}", path.display()))?;
    }

    let meta = ShardMeta {
        original_len,
        chunk_size: codec.chunk_size(data.len())?,
        profile: codec.profile().clone(),
    };
    fs::write(out_dir.join(META_FILE), serde_json::to_vec_pretty(&meta)?)?;

    info!(
        input = %input.display(),
        out_dir = %out_dir.display(),
        original_len,
        chunk_size = meta.chunk_size,
        "encoded"
    );
    Ok(())
}

fn decode_dir(codec: &SizeCephCodec, shard_dir: &Path, output: &Path) -> anyhow::Result<()> {
    let meta_path = shard_dir.join(META_FILE);
    let meta: ShardMeta = serde_json::from_slice(
        &fs::read(&meta_path).with_context(|| format!("failed to read {}", meta_path.display()))?,
    )
    .with_context(|| format!("malformed {}", meta_path.display()))?;

    if meta.original_len == 0 {
        fs::write(output, b"")?;
        return Ok(());
    }

    let mut chunks = ShardMap::new();
    for id in ShardId::all() {
        let path = shard_path(shard_dir, id);
        match fs::read(&path) {
            Ok(bytes) => {
                chunks.insert(id, Bytes::from(bytes));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(shard = %id, "shard file missing");
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        }
    }

    if chunks.len() < CHUNK_COUNT {
        info!(present = chunks.len(), "decoding with missing shards");
    }

    let want: ShardSet = ShardId::data().collect();
    let decoded = codec.decode(&want, &chunks, Some(meta.chunk_size))?;

    let mut restored: Vec<u8> = decoded.values().flat_map(|c| c.iter().copied()).collect();
    if restored.len() < meta.original_len {
        bail!(
            "restored {} bytes but meta.json records {}",
            restored.len(),
            meta.original_len
        );
    }
    restored.truncate(meta.original_len);

    fs::write(output, &restored)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(output = %output.display(), len = restored.len(), "decoded");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
