use std::fs::File;
use std::io::Result;
use std::os::fd::AsRawFd;
use std::ptr::{null_mut, NonNull};
use std::slice;

use tracing::error;

use crate::ffi::syscall::{mmap, munmap};

/// An owned shared memory mapping, unmapped on drop.
pub struct Arena {
    ptr: NonNull<u8>,
    len: usize,
}

// The mapping is owned; concurrent access goes through atomics in `Rb`.
unsafe impl Send for Arena {}

impl Arena {
    /// Maps `len` bytes of a perf event fd.
    pub fn new(file: &File, len: usize, offset: usize) -> Result<Self> {
        let prot = libc::PROT_READ | libc::PROT_WRITE;
        // https://github.com/torvalds/linux/blob/v6.13/kernel/events/core.c#L6582
        let flags = libc::MAP_SHARED;
        let fd = file.as_raw_fd();
        let ptr = unsafe { mmap(null_mut(), len, prot, flags, fd, offset as _) }?;
        Ok(Self::from_raw(ptr, len))
    }

    /// Maps `len` zeroed bytes not backed by any file.
    pub fn anonymous(len: usize) -> Result<Self> {
        let prot = libc::PROT_READ | libc::PROT_WRITE;
        let flags = libc::MAP_SHARED | libc::MAP_ANONYMOUS;
        let ptr = unsafe { mmap(null_mut(), len, prot, flags, -1, 0) }?;
        Ok(Self::from_raw(ptr, len))
    }

    fn from_raw(ptr: *mut u8, len: usize) -> Self {
        // mmap never returns null on success.
        let ptr = NonNull::new(ptr).unwrap_or(NonNull::dangling());
        Self { ptr, len }
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        if let Err(e) = unsafe { munmap(self.ptr.as_ptr(), self.len) } {
            error!(error = %e, len = self.len, "failed to unmap arena");
        }
    }
}
