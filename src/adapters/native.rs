//! Native Shared-Library Transform
//!
//! Loads the split/restore transform from a shared library at runtime with
//! `dlopen`. The library must export three C entry points:
//!
//! ```text
//! void size_split(unsigned char **dst, unsigned char *src, unsigned int len);
//! int  size_restore(unsigned char *dst, const unsigned char **src, unsigned int len);
//! int  size_can_get_restore_fn(const unsigned char **src);
//! ```
//!
//! `size_restore` returns zero on success. `size_can_get_restore_fn`
//! returns non-zero when the hole pattern (null entries in `src`) is
//! restorable.

use std::ffi::{c_int, c_uint, c_void, CStr, CString};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{ShardTransform, TransformLoader};
use crate::ec::layout::CHUNK_COUNT;
use crate::error::{Error, Result};

/// Environment variable overriding the library search list.
pub const LIBRARY_ENV: &str = "SIZECEPH_LIBRARY";

/// Library names tried in order when no override is given.
const DEFAULT_CANDIDATES: &[&str] = &["libsizeceph.so", "sizecephactual.so"];

const SPLIT_SYMBOL: &CStr = c"size_split";
const RESTORE_SYMBOL: &CStr = c"size_restore";
const CAN_RESTORE_SYMBOL: &CStr = c"size_can_get_restore_fn";

// =============================================================================
// FFI Signatures
// =============================================================================

type SplitFn = unsafe extern "C" fn(dst: *mut *mut u8, src: *mut u8, len: c_uint);
type RestoreFn = unsafe extern "C" fn(dst: *mut u8, src: *const *const u8, len: c_uint) -> c_int;
type CanRestoreFn = unsafe extern "C" fn(src: *const *const u8) -> c_int;

fn dl_error() -> String {
    // SAFETY: dlerror returns null or a thread-local NUL-terminated string.
    let msg = unsafe { libc::dlerror() };
    if msg.is_null() {
        "unknown dynamic loader error".to_string()
    } else {
        // SAFETY: checked non-null above; valid until the next dl* call.
        unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
    }
}

// =============================================================================
// Transform
// =============================================================================

/// Transform backed by a loaded shared library.
///
/// The library handle is closed when the last reference is dropped.
pub struct NativeTransform {
    /// `None` for entry points not backed by a `dlopen` handle.
    handle: Option<NonNull<c_void>>,
    path: PathBuf,
    split: SplitFn,
    restore: RestoreFn,
    can_restore: CanRestoreFn,
}

// SAFETY: the handle is only used for dlclose on drop, and the resolved
// entry points are required to be thread-safe by the transform contract.
unsafe impl Send for NativeTransform {}
// SAFETY: see above; no interior mutability on the Rust side.
unsafe impl Sync for NativeTransform {}

impl std::fmt::Debug for NativeTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeTransform")
            .field("path", &self.path)
            .finish()
    }
}

impl NativeTransform {
    /// Open `path` and resolve all three entry points.
    pub fn open(path: &Path) -> Result<Self> {
        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
            Error::BackendUnavailable(format!("library path {} contains NUL", path.display()))
        })?;

        // SAFETY: c_path is a valid NUL-terminated string.
        let raw = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_LAZY) };
        let handle = NonNull::new(raw).ok_or_else(|| {
            Error::BackendUnavailable(format!("dlopen {}: {}", path.display(), dl_error()))
        })?;

        let resolve = |name: &CStr| -> Option<NonNull<c_void>> {
            // SAFETY: handle is a live dlopen handle; name is NUL-terminated.
            NonNull::new(unsafe { libc::dlsym(handle.as_ptr(), name.as_ptr()) })
        };

        let symbols = [SPLIT_SYMBOL, RESTORE_SYMBOL, CAN_RESTORE_SYMBOL];
        let resolved = symbols.map(resolve);

        match resolved {
            [Some(split), Some(restore), Some(can_restore)] => {
                // SAFETY: the symbols are declared by the library ABI with
                // exactly these signatures.
                let (split, restore, can_restore) = unsafe {
                    (
                        std::mem::transmute::<*mut c_void, SplitFn>(split.as_ptr()),
                        std::mem::transmute::<*mut c_void, RestoreFn>(restore.as_ptr()),
                        std::mem::transmute::<*mut c_void, CanRestoreFn>(can_restore.as_ptr()),
                    )
                };
                Ok(Self {
                    handle: Some(handle),
                    path: path.to_path_buf(),
                    split,
                    restore,
                    can_restore,
                })
            }
            _ => {
                // SAFETY: handle came from dlopen and is not used afterwards.
                unsafe { libc::dlclose(handle.as_ptr()) };
                let missing: Vec<String> = symbols
                    .iter()
                    .zip(&resolved)
                    .filter(|(_, found)| found.is_none())
                    .map(|(name, _)| name.to_string_lossy().into_owned())
                    .collect();
                Err(Error::BackendUnavailable(format!(
                    "{} is missing symbols: {}",
                    path.display(),
                    missing.join(", ")
                )))
            }
        }
    }

    /// Wrap entry points that are already linked into this process.
    #[cfg(test)]
    fn from_entry_points(split: SplitFn, restore: RestoreFn, can_restore: CanRestoreFn) -> Self {
        Self {
            handle: None,
            path: PathBuf::from("<linked>"),
            split,
            restore,
            can_restore,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn source_pointers(src: &[Option<&[u8]>]) -> [*const u8; CHUNK_COUNT] {
    let mut ptrs = [ptr::null(); CHUNK_COUNT];
    for (slot, chunk) in ptrs.iter_mut().zip(src) {
        if let Some(chunk) = chunk {
            *slot = chunk.as_ptr();
        }
    }
    ptrs
}

impl ShardTransform for NativeTransform {
    fn split(&self, dst: &mut [&mut [u8]], src: &[u8]) {
        if dst.len() != CHUNK_COUNT {
            warn!(outputs = dst.len(), "split called with wrong output count");
            return;
        }
        let mut outputs: Vec<*mut u8> = dst.iter_mut().map(|d| d.as_mut_ptr()).collect();
        // SAFETY: every output is chunk_size bytes of writable memory and
        // src is len bytes; the library reads src and writes each output.
        unsafe {
            (self.split)(
                outputs.as_mut_ptr(),
                src.as_ptr() as *mut u8,
                src.len() as c_uint,
            )
        };
    }

    fn restore(&self, dst: &mut [u8], src: &[Option<&[u8]>]) -> std::result::Result<(), i32> {
        let ptrs = source_pointers(src);
        // SAFETY: dst is writable for len bytes; each non-null source is a
        // live chunk of the common chunk size.
        let rc = unsafe { (self.restore)(dst.as_mut_ptr(), ptrs.as_ptr(), dst.len() as c_uint) };
        if rc == 0 {
            Ok(())
        } else {
            Err(rc)
        }
    }

    fn can_restore(&self, src: &[Option<&[u8]>]) -> bool {
        let ptrs = source_pointers(src);
        // SAFETY: the probe only inspects which entries are null.
        unsafe { (self.can_restore)(ptrs.as_ptr()) != 0 }
    }
}

impl Drop for NativeTransform {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            // SAFETY: handle came from dlopen; no function pointers outlive self.
            unsafe { libc::dlclose(handle.as_ptr()) };
            debug!(path = %self.path.display(), "transform library closed");
        }
    }
}

// =============================================================================
// Loader
// =============================================================================

/// Loader searching a list of library paths in order.
#[derive(Debug, Clone)]
pub struct NativeLibraryLoader {
    candidates: Vec<PathBuf>,
}

impl NativeLibraryLoader {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// Try only `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self::new(vec![path.into()])
    }

    /// `SIZECEPH_LIBRARY` if set, otherwise the default library names.
    pub fn from_env() -> Self {
        match std::env::var_os(LIBRARY_ENV) {
            Some(path) if !path.is_empty() => Self::with_path(path),
            _ => Self::new(DEFAULT_CANDIDATES.iter().map(PathBuf::from).collect()),
        }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }
}

impl Default for NativeLibraryLoader {
    fn default() -> Self {
        Self::from_env()
    }
}

impl TransformLoader for NativeLibraryLoader {
    fn describe(&self) -> String {
        let paths: Vec<String> = self
            .candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        format!("native library [{}]", paths.join(", "))
    }

    fn load(&self) -> Result<Arc<dyn ShardTransform>> {
        let mut failures = Vec::with_capacity(self.candidates.len());

        for path in &self.candidates {
            match NativeTransform::open(path) {
                Ok(transform) => {
                    info!(path = %path.display(), "transform library loaded");
                    return Ok(Arc::new(transform));
                }
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "candidate rejected");
                    failures.push(e.to_string());
                }
            }
        }

        Err(Error::BackendUnavailable(format!(
            "no usable transform library: {}",
            failures.join("; ")
        )))
    }
}
