use std::io::{Error, ErrorKind, Result};

use crate::ffi::deref_offset;

/// Counts of a whole group, read through its leader.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupStat {
    pub time_enabled: u64,
    pub time_running: u64,
    /// One count per counter, in group order (leader first).
    pub counts: Vec<u64>,
}

impl GroupStat {
    // https://github.com/torvalds/linux/blob/v6.13/include/uapi/linux/perf_event.h#L344
    // struct read_format {
    //     u64 nr;
    //     u64 time_enabled; # PERF_FORMAT_TOTAL_TIME_ENABLED
    //     u64 time_running; # PERF_FORMAT_TOTAL_TIME_RUNNING
    //     { u64 value; } cntr[nr];
    // };
    pub(crate) fn read_buf_size(group_size: usize) -> usize {
        (3 + group_size) * size_of::<u64>()
    }

    pub(crate) fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::read_buf_size(0) {
            return Err(Error::new(ErrorKind::InvalidData, "truncated read format"));
        }

        let mut ptr = buf.as_ptr();
        let nr: u64 = unsafe { deref_offset(&mut ptr) };
        if nr > (buf.len() / size_of::<u64>() - 3) as u64 {
            let msg = format!("read format reports {} counters, too many for {} bytes", nr, buf.len());
            return Err(Error::new(ErrorKind::InvalidData, msg));
        }

        // Bounds are checked above.
        let (time_enabled, time_running, counts) = unsafe {
            let time_enabled = deref_offset(&mut ptr);
            let time_running = deref_offset(&mut ptr);
            let counts = (0..nr).map(|_| deref_offset(&mut ptr)).collect();
            (time_enabled, time_running, counts)
        };

        Ok(Self {
            time_enabled,
            time_running,
            counts,
        })
    }

    /// Share of the enabled time the group actually spent on the PMU.
    ///
    /// Below 1.0 the kernel multiplexed the group with other events.
    /// A group that was never enabled reports 1.0.
    pub fn multiplexing_ratio(&self) -> f64 {
        if self.time_enabled == 0 {
            return 1.0;
        }
        (self.time_running as f64 / self.time_enabled as f64).min(1.0)
    }
}
