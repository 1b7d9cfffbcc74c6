//! Secure memory handling with automatic zeroization
//!
//! [`GuardedSecret`] is the guarded-memory capability used by fields: the
//! bytes live in their own page-aligned allocation that is `mlock`ed where
//! the platform allows it, can only be read through a borrow-scoped
//! [`SecretView`], and are wiped when the handle is destroyed or dropped.
//!
//! `mlock` works on whole pages and is not reference counted, so no two
//! secrets ever share a page. Unlocking one secret cannot expose another.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::ops::Deref;
use std::ptr::NonNull;

use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{GhostpassError, Result};

/// Length of a symmetric key in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// Symmetric encryption key - automatically zeroed when dropped
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    key: [u8; KEY_LEN],
}

impl MasterKey {
    /// Create a new key from raw bytes
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Random key, for tests that need a key no store derived
    #[cfg(test)]
    pub(crate) fn generate() -> Self {
        use rand::RngCore;

        let mut key = [0u8; KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Get the key bytes (use carefully - avoid copying)
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8; KEY_LEN] {
        &mut self.key
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}


/// Handle over secret bytes held in locked, wipe-on-release memory.
///
/// The handle is single-owner. Reading goes through [`GuardedSecret::open`],
/// whose view borrows the handle, so the cleartext cannot outlive the
/// enclosing scope. Once [`GuardedSecret::destroy`] has run, `open` fails.
pub struct GuardedSecret {
    region: Option<PageRegion>,
}

impl GuardedSecret {
    /// Move `bytes` into guarded memory. The source buffer is zeroed.
    pub fn new(mut bytes: Vec<u8>) -> Self {
        let region = PageRegion::new(&bytes);
        bytes.zeroize();
        Self {
            region: Some(region),
        }
    }

    /// Open a transient view of the cleartext
    pub fn open(&self) -> Result<SecretView<'_>> {
        match &self.region {
            Some(region) => Ok(SecretView {
                bytes: region.as_slice(),
            }),
            None => Err(GhostpassError::GuardedSecret(
                "secret has already been destroyed".to_string(),
            )),
        }
    }

    /// Wipe and release the backing memory now. Later calls to `open` fail.
    pub fn destroy(&mut self) {
        self.region = None;
    }

    /// Whether the backing memory has been wiped
    pub fn is_destroyed(&self) -> bool {
        self.region.is_none()
    }

    /// Whether the platform accepted the memory lock for this secret
    pub fn is_locked(&self) -> bool {
        self.region.as_ref().map_or(false, |r| r.locked)
    }

    /// Length of the guarded bytes (0 once destroyed)
    pub fn len(&self) -> usize {
        self.region.as_ref().map_or(0, |r| r.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for GuardedSecret {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl From<&str> for GuardedSecret {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes().to_vec())
    }
}

impl std::fmt::Debug for GuardedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedSecret")
            .field("value", &"[REDACTED]")
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Whole pages owned by exactly one secret
struct PageRegion {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
    locked: bool,
}

// SAFETY: the region is uniquely owned and only read through shared borrows.
unsafe impl Send for PageRegion {}
unsafe impl Sync for PageRegion {}

impl PageRegion {
    fn new(bytes: &[u8]) -> Self {
        let page = page_size();
        let size = bytes.len().div_ceil(page).max(1) * page;
        let layout = match Layout::from_size_align(size, page) {
            Ok(layout) => layout,
            Err(_) => panic!("guarded secret of {} bytes is too large", bytes.len()),
        };

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(raw) else {
            handle_alloc_error(layout)
        };

        // SAFETY: the fresh region holds at least `bytes.len()` bytes and
        // cannot overlap the caller's buffer.
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len()) };

        let locked = lock_pages(ptr.as_ptr(), size);
        Self {
            ptr,
            len: bytes.len(),
            layout,
            locked,
        }
    }

    fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for `len` initialized bytes while self lives.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for PageRegion {
    fn drop(&mut self) {
        let size = self.layout.size();

        // SAFETY: ptr is valid for `size` zero-initialized bytes and uniquely owned.
        let whole = unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), size) };
        whole.zeroize();

        if self.locked {
            unlock_pages(self.ptr.as_ptr(), size);
        }

        // SAFETY: allocated in `PageRegion::new` with this exact layout.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

/// Borrowed cleartext view of a [`GuardedSecret`]
pub struct SecretView<'a> {
    bytes: &'a [u8],
}

impl<'a> SecretView<'a> {
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Interpret the secret as UTF-8
    pub fn as_str(&self) -> Result<&'a str> {
        std::str::from_utf8(self.bytes)
            .map_err(|e| GhostpassError::GuardedSecret(format!("secret is not valid UTF-8: {}", e)))
    }
}

impl Deref for SecretView<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

impl std::fmt::Debug for SecretView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretView([REDACTED])")
    }
}


#[cfg(unix)]
fn page_size() -> usize {
    // SAFETY: sysconf has no memory-safety preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        4096
    }
}

#[cfg(unix)]
fn lock_pages(ptr: *const u8, size: usize) -> bool {
    // SAFETY: ptr and size describe a live page-aligned allocation owned by the caller.
    let rc = unsafe { libc::mlock(ptr.cast(), size) };
    if rc != 0 {
        debug!(
            "mlock failed for guarded secret, continuing unlocked: {}",
            std::io::Error::last_os_error()
        );
        return false;
    }
    true
}

#[cfg(unix)]
fn unlock_pages(ptr: *const u8, size: usize) {
    // SAFETY: same pages that were passed to mlock in lock_pages, owned by no other secret.
    unsafe {
        libc::munlock(ptr.cast(), size);
    }
}

#[cfg(not(unix))]
fn page_size() -> usize {
    4096
}

#[cfg(not(unix))]
fn lock_pages(_ptr: *const u8, _size: usize) -> bool {
    debug!("memory locking unsupported on this platform");
    false
}

#[cfg(not(unix))]
fn unlock_pages(_ptr: *const u8, _size: usize) {}
