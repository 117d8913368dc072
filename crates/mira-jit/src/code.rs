//! Executable code memory
//!
//! `CodeBuffer` owns one page-mapped, executable memory region holding the
//! machine code of a single compiled function. The region is immutable
//! after construction and unmapped exactly once when the buffer drops.
//! `map_executable` is the facility that produces such regions from raw
//! code bytes (mmap RW, copy, flip to RX).

/// Error placing machine code into executable memory
#[derive(Debug, thiserror::Error)]
pub enum CodeMapError {
    #[error("mmap failed: {0}")]
    Map(std::io::Error),
    #[error("mprotect failed: {0}")]
    Protect(std::io::Error),
    #[error("executable memory is not supported on this platform")]
    Unsupported,
}

/// An owned region of executable memory
pub struct CodeBuffer {
    base: *const u8,
    size: usize,
}

// Safety: the region is immutable (PROT_READ|PROT_EXEC) after construction.
// Multiple threads can safely read and execute from it.
unsafe impl Send for CodeBuffer {}
unsafe impl Sync for CodeBuffer {}

impl CodeBuffer {
    /// Take ownership of an already executable-mapped region.
    ///
    /// The buffer does not map memory itself; it receives a finished
    /// mapping and unmaps it on drop.
    ///
    /// # Safety
    /// `base` must point to a live mapping of at least `size` bytes with
    /// read and execute permissions, and no other owner may unmap it or
    /// alias it past this buffer's lifetime.
    pub unsafe fn from_raw_parts(base: *const u8, size: usize) -> CodeBuffer {
        CodeBuffer { base, size }
    }

    /// Base address of the region (the function entry point).
    pub fn base(&self) -> *const u8 {
        self.base
    }

    /// Size of the region in bytes.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The raw machine code bytes.
    pub fn as_bytes(&self) -> &[u8] {
        if self.base.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.base, self.size) }
    }

    /// Whether an absolute address falls inside `[base, base + len)`.
    pub fn contains(&self, address: usize) -> bool {
        let start = self.base as usize;
        address >= start && address < start + self.size
    }
}

#[cfg(unix)]
impl Drop for CodeBuffer {
    fn drop(&mut self) {
        // Best effort: there is no caller left to report an unmap failure to.
        if !self.base.is_null() && self.size > 0 {
            unsafe {
                libc::munmap(self.base as *mut libc::c_void, self.size);
            }
        }
    }
}

/// Copy raw machine code into fresh executable memory.
///
/// W^X: the region is writable while the code is copied in, then flipped
/// to read+execute before being handed off. On failure nothing stays
/// mapped.
#[cfg(unix)]
pub fn map_executable(code: &[u8]) -> Result<CodeBuffer, CodeMapError> {
    if code.is_empty() {
        return Ok(unsafe { CodeBuffer::from_raw_parts(std::ptr::null(), 0) });
    }

    unsafe {
        let ptr = libc::mmap(
            std::ptr::null_mut(),
            code.len(),
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANON,
            -1,
            0,
        );
        if ptr == libc::MAP_FAILED {
            return Err(CodeMapError::Map(std::io::Error::last_os_error()));
        }

        std::ptr::copy_nonoverlapping(code.as_ptr(), ptr as *mut u8, code.len());

        if libc::mprotect(ptr, code.len(), libc::PROT_READ | libc::PROT_EXEC) != 0 {
            let err = std::io::Error::last_os_error();
            libc::munmap(ptr, code.len());
            return Err(CodeMapError::Protect(err));
        }

        Ok(CodeBuffer::from_raw_parts(ptr as *const u8, code.len()))
    }
}

#[cfg(not(unix))]
pub fn map_executable(_code: &[u8]) -> Result<CodeBuffer, CodeMapError> {
    Err(CodeMapError::Unsupported)
}
