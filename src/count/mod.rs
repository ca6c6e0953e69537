use std::fs::File;
use std::io::Result;
use std::os::fd::AsRawFd;

use crate::config::Scope;
use crate::ffi::bindings as b;
use crate::ffi::syscall::{ioctl_arg, perf_event_open, read};
use crate::sample::Arena;

pub use crate::ffi::Attr;

#[cfg(test)]
pub(crate) mod fake;
mod group;
mod stat;

pub use group::*;
pub use stat::*;

/// One open counter.
///
/// The `*_group` operations apply to the whole group when called on a leader.
pub trait Handle {
    fn enable_group(&self) -> Result<()>;

    fn reset_group(&self) -> Result<()>;

    /// Reads the counter report, returns the number of bytes read.
    fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Maps `len` bytes of the counter ring-buffer (metadata page included).
    fn map(&self, len: usize) -> Result<Arena>;
}

/// Opens counters.
pub trait Pmu {
    type Counter: Handle;

    /// Opens a counter, as a sibling of `leader` if given.
    fn open(&self, attr: &Attr, scope: &Scope, leader: Option<&Self::Counter>) -> Result<Self::Counter>;
}

/// Counters backed by the `perf_event_open` system call.
#[derive(Clone, Copy, Debug, Default)]
pub struct Kernel;

impl Pmu for Kernel {
    type Counter = Counter;

    fn open(&self, attr: &Attr, scope: &Scope, leader: Option<&Counter>) -> Result<Counter> {
        let group_fd = leader.map_or(-1, |it| it.perf.as_raw_fd());
        // All events in a group should monitor the same task (or cgroup) and CPU:
        // https://github.com/torvalds/linux/blob/v6.13/kernel/events/core.c#L12932
        let flags = scope.flags | b::PERF_FLAG_FD_CLOEXEC as u64;
        let perf = perf_event_open(attr, scope.pid, scope.cpu, group_fd, flags)?;
        Ok(Counter { perf })
    }
}

/// A perf event file descriptor, closed on drop.
#[derive(Debug)]
pub struct Counter {
    perf: File,
}

impl Counter {
    pub fn file(&self) -> &File {
        &self.perf
    }
}

impl Handle for Counter {
    fn enable_group(&self) -> Result<()> {
        ioctl_arg(
            &self.perf,
            b::PERF_IOC_OP_ENABLE as _,
            b::PERF_IOC_FLAG_GROUP as _,
        )?;
        Ok(())
    }

    fn reset_group(&self) -> Result<()> {
        ioctl_arg(
            &self.perf,
            b::PERF_IOC_OP_RESET as _,
            b::PERF_IOC_FLAG_GROUP as _,
        )?;
        Ok(())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        read(&self.perf, buf)
    }

    fn map(&self, len: usize) -> Result<Arena> {
        Arena::new(&self.perf, len, 0)
    }
}
