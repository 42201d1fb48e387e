//! Shared-library loading and symbol resolution.
//!
//! Orchestration binaries arrive as in-memory shared-library images. They
//! are staged to a temporary file and loaded with `dlopen`; entry points
//! are resolved with `dlsym`. The library stays mapped for the lifetime of
//! the wrapper and is closed on drop, so resolved symbols must not outlive
//! it.

use std::ffi::{CStr, CString, c_void};
use std::fmt;
use std::io::Write;

use tempfile::TempPath;

use crate::common::{Result, RuntimeError};

/// A dlopen'd shared library.
pub struct SharedLibrary {
    handle: *mut c_void,
    // Keeps the staged image on disk while the library is mapped.
    _image: TempPath,
}

unsafe impl Send for SharedLibrary {}
unsafe impl Sync for SharedLibrary {}

impl SharedLibrary {
    /// Stages `bytes` to a temporary file and loads it with `dlopen`.
    ///
    /// Fails with [`RuntimeError::Load`] carrying the `dlerror` text if the
    /// image cannot be loaded.
    pub fn load_from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("npusim-orch-")
            .suffix(".so")
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        let image = file.into_temp_path();

        let path = CString::new(image.to_string_lossy().as_bytes())
            .map_err(|_| RuntimeError::Load("library path contains NUL".into()))?;

        let handle = unsafe { libc::dlopen(path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        if handle.is_null() {
            return Err(RuntimeError::Load(last_dl_error()));
        }

        tracing::debug!(len = bytes.len(), "loaded orchestration library");

        Ok(Self {
            handle,
            _image: image,
        })
    }

    /// Resolves a symbol by name.
    ///
    /// Returns the raw symbol address; the caller is responsible for casting
    /// it to the correct function type. Fails with
    /// [`RuntimeError::SymbolNotFound`] if the symbol is absent.
    pub fn symbol(&self, name: &str) -> Result<*mut c_void> {
        let cname = CString::new(name)
            .map_err(|_| RuntimeError::SymbolNotFound(name.to_string()))?;

        // Clear any stale error state so a null result is unambiguous.
        unsafe {
            let _ = libc::dlerror();
        }
        let sym = unsafe { libc::dlsym(self.handle, cname.as_ptr()) };
        if sym.is_null() {
            return Err(RuntimeError::SymbolNotFound(name.to_string()));
        }
        Ok(sym)
    }
}

impl Drop for SharedLibrary {
    fn drop(&mut self) {
        unsafe {
            let _ = libc::dlclose(self.handle);
        }
    }
}

impl fmt::Debug for SharedLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedLibrary")
            .field("handle", &self.handle)
            .finish()
    }
}

/// Fetches the current `dlerror` text.
fn last_dl_error() -> String {
    let err = unsafe { libc::dlerror() };
    if err.is_null() {
        "unknown dynamic loader failure".to_string()
    } else {
        unsafe { CStr::from_ptr(err) }.to_string_lossy().into_owned()
    }
}
