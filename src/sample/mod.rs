use std::io::{Error, Result};
use std::ptr::addr_of_mut;
use std::sync::atomic::AtomicU64;

use rb::Rb;
use tracing::trace;

use crate::count::Handle;
use crate::ffi::{Metadata, PAGE_SIZE};

mod arena;
mod callchain;
mod rb;
mod symbol;
#[cfg(test)]
mod test;

pub use arena::Arena;
pub use callchain::Callchain;
pub use symbol::*;

/// Callchain sampler.
///
/// Owns the ring-buffer the kernel writes the samples of one counter into.
/// The counter must have been opened with call chain sampling enabled.
pub struct Sampler {
    arena: Arena,
}

impl Sampler {
    /// Maps 1 + 2^`exp` pages of the counter: the metadata page and the data pages.
    pub fn new<H: Handle>(handle: &H, exp: u8) -> Result<Self> {
        let Some(len) = 2_usize
            .checked_pow(exp as u32)
            .and_then(|n| n.checked_add(1))
            .and_then(|n| n.checked_mul(*PAGE_SIZE))
        else {
            return Err(Error::other("allocation size overflow"));
        };
        let arena = handle.map(len)?;

        Ok(Sampler { arena })
    }

    fn rb(&self) -> Rb<'_> {
        let alloc = self.arena.as_slice();
        let metadata = self.arena.as_ptr() as *mut Metadata;
        Rb::new(
            // https://github.com/torvalds/linux/blob/v6.13/kernel/events/core.c#L6212
            &alloc[*PAGE_SIZE..],
            unsafe { AtomicU64::from_ptr(addr_of_mut!((*metadata).data_tail)) },
            self.head(),
        )
    }

    /// Renders every sample written since the previous call.
    ///
    /// Returns `None` if the kernel wrote nothing in between.
    pub fn callchains(&self, callchain: &Callchain) -> Option<String> {
        let mut out = String::new();
        let records = self.rb().drain(|record| {
            callchain.render(record, &mut out);
        })?;
        trace!(records, len = out.len(), "drained callchain samples");
        Some(out)
    }

    fn head(&self) -> &AtomicU64 {
        let metadata = self.arena.as_ptr() as *mut Metadata;
        unsafe { AtomicU64::from_ptr(addr_of_mut!((*metadata).data_head)) }
    }

    /// Appends raw records to the ring-buffer the way the kernel does.
    #[cfg(test)]
    pub(crate) fn produce(&self, bytes: &[u8]) {
        use std::sync::atomic::Ordering;

        let data = self.arena.as_ptr().wrapping_add(*PAGE_SIZE);
        let size = self.arena.as_slice().len() - *PAGE_SIZE;
        let head = self.head().load(Ordering::Relaxed);
        for (i, byte) in bytes.iter().enumerate() {
            let offset = (head as usize + i) % size;
            unsafe { data.add(offset).write(*byte) };
        }
        self.head().store(head + bytes.len() as u64, Ordering::Release);
    }

    #[cfg(test)]
    pub(crate) fn tail(&self) -> u64 {
        let metadata = self.arena.as_ptr() as *mut Metadata;
        let tail = unsafe { AtomicU64::from_ptr(addr_of_mut!((*metadata).data_tail)) };
        tail.load(std::sync::atomic::Ordering::Relaxed)
    }
}
