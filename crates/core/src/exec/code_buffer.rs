//! Executable memory buffer.
//!
//! This module provides the mapping that turns extracted kernel bytes into
//! directly callable code. Each buffer is one anonymous `mmap` region,
//! rounded up to the page size, written once, then flipped to read+execute
//! with `mprotect` and never written again. One mapping per kernel; regions
//! are not coalesced or reused across kernels.

use std::fmt;
use std::ptr;

use crate::common::{Result, RuntimeError};

/// A page-aligned read+execute memory region holding one kernel's code.
///
/// The region lives exactly as long as the buffer: code pointers handed out
/// by [`entry_ptr`](ExecBuffer::entry_ptr) are valid only while the owning
/// buffer (in practice, the owning registry) is alive.
pub struct ExecBuffer {
    ptr: *mut u8,
    len: usize,
    capacity: usize,
}

unsafe impl Send for ExecBuffer {}
unsafe impl Sync for ExecBuffer {}

impl ExecBuffer {
    /// Maps a read+execute region containing a copy of `code`.
    ///
    /// The mapping is at least `code.len()` bytes, rounded up to the system
    /// page size. Fails with [`RuntimeError::MemoryMap`] if the code is
    /// empty or the OS refuses the mapping (exhausted address space,
    /// disallowed exec mappings).
    pub fn new(code: &[u8]) -> Result<Self> {
        if code.is_empty() {
            return Err(RuntimeError::MemoryMap {
                size: 0,
                detail: "empty code image".into(),
            });
        }

        let page = page_size();
        let capacity = code.len().div_ceil(page) * page;

        let raw = unsafe {
            libc::mmap(
                ptr::null_mut(),
                capacity,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if raw == libc::MAP_FAILED {
            return Err(RuntimeError::MemoryMap {
                size: code.len(),
                detail: std::io::Error::last_os_error().to_string(),
            });
        }

        let ptr = raw as *mut u8;
        unsafe {
            ptr::copy_nonoverlapping(code.as_ptr(), ptr, code.len());
        }

        if unsafe { libc::mprotect(raw, capacity, libc::PROT_READ | libc::PROT_EXEC) } != 0 {
            let detail = std::io::Error::last_os_error().to_string();
            let _ = unsafe { libc::munmap(raw, capacity) };
            return Err(RuntimeError::MemoryMap {
                size: code.len(),
                detail,
            });
        }

        tracing::debug!(code_len = code.len(), capacity, "mapped executable region");

        Ok(Self {
            ptr,
            len: code.len(),
            capacity,
        })
    }

    /// Returns the entry pointer of the mapped code.
    pub fn entry_ptr(&self) -> *const u8 {
        self.ptr
    }

    /// Length of the code image in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the buffer holds no code. Construction rejects empty
    /// images, so this is always false for a live buffer.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the underlying mapping in bytes (a page-size multiple).
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Drop for ExecBuffer {
    fn drop(&mut self) {
        let _ = unsafe { libc::munmap(self.ptr as *mut _, self.capacity) };
    }
}

impl fmt::Debug for ExecBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// System page size in bytes.
fn page_size() -> usize {
    let n = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if n <= 0 { 4096 } else { n as usize }
}
