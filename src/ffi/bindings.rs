//! Subset of `<linux/perf_event.h>` used by this crate.
//!
//! Names follow the kernel header so the code reads like the C API.
//! Layouts are the ones of `PERF_ATTR_SIZE_VER8` (Linux 6.3+), older kernels
//! accept the larger struct as long as the trailing fields stay zeroed.

#![allow(dead_code, non_camel_case_types, non_upper_case_globals)]

use std::mem::offset_of;

// https://github.com/torvalds/linux/blob/v6.13/include/uapi/linux/perf_event.h#L29
pub const PERF_TYPE_HARDWARE: u32 = 0;
pub const PERF_TYPE_SOFTWARE: u32 = 1;
pub const PERF_TYPE_TRACEPOINT: u32 = 2;
pub const PERF_TYPE_HW_CACHE: u32 = 3;
pub const PERF_TYPE_RAW: u32 = 4;

pub const PERF_COUNT_HW_CPU_CYCLES: u64 = 0;
pub const PERF_COUNT_HW_INSTRUCTIONS: u64 = 1;
pub const PERF_COUNT_HW_CACHE_REFERENCES: u64 = 2;
pub const PERF_COUNT_HW_CACHE_MISSES: u64 = 3;
pub const PERF_COUNT_HW_BRANCH_INSTRUCTIONS: u64 = 4;
pub const PERF_COUNT_HW_BRANCH_MISSES: u64 = 5;
pub const PERF_COUNT_HW_BUS_CYCLES: u64 = 6;
pub const PERF_COUNT_HW_STALLED_CYCLES_FRONTEND: u64 = 7;
pub const PERF_COUNT_HW_STALLED_CYCLES_BACKEND: u64 = 8;
pub const PERF_COUNT_HW_REF_CPU_CYCLES: u64 = 9;

pub const PERF_COUNT_SW_CPU_CLOCK: u64 = 0;
pub const PERF_COUNT_SW_TASK_CLOCK: u64 = 1;
pub const PERF_COUNT_SW_PAGE_FAULTS: u64 = 2;
pub const PERF_COUNT_SW_CONTEXT_SWITCHES: u64 = 3;
pub const PERF_COUNT_SW_CPU_MIGRATIONS: u64 = 4;
pub const PERF_COUNT_SW_PAGE_FAULTS_MIN: u64 = 5;
pub const PERF_COUNT_SW_PAGE_FAULTS_MAJ: u64 = 6;
pub const PERF_COUNT_SW_ALIGNMENT_FAULTS: u64 = 7;
pub const PERF_COUNT_SW_EMULATION_FAULTS: u64 = 8;
pub const PERF_COUNT_SW_DUMMY: u64 = 9;

pub const PERF_FORMAT_TOTAL_TIME_ENABLED: u64 = 1 << 0;
pub const PERF_FORMAT_TOTAL_TIME_RUNNING: u64 = 1 << 1;
pub const PERF_FORMAT_ID: u64 = 1 << 2;
pub const PERF_FORMAT_GROUP: u64 = 1 << 3;

pub const PERF_SAMPLE_IP: u64 = 1 << 0;
pub const PERF_SAMPLE_TID: u64 = 1 << 1;
pub const PERF_SAMPLE_TIME: u64 = 1 << 2;
pub const PERF_SAMPLE_CALLCHAIN: u64 = 1 << 5;

pub const PERF_FLAG_FD_NO_GROUP: u32 = 1 << 0;
pub const PERF_FLAG_FD_OUTPUT: u32 = 1 << 1;
pub const PERF_FLAG_PID_CGROUP: u32 = 1 << 2;
pub const PERF_FLAG_FD_CLOEXEC: u32 = 1 << 3;

pub const PERF_RECORD_LOST: u32 = 2;
pub const PERF_RECORD_THROTTLE: u32 = 5;
pub const PERF_RECORD_UNTHROTTLE: u32 = 6;
pub const PERF_RECORD_SAMPLE: u32 = 9;

pub const PERF_IOC_FLAG_GROUP: u32 = 1;

// _IO('$', n), the same number on every architecture.
pub const PERF_IOC_OP_ENABLE: u32 = 0x2400;
pub const PERF_IOC_OP_DISABLE: u32 = 0x2401;
pub const PERF_IOC_OP_REFRESH: u32 = 0x2402;
pub const PERF_IOC_OP_RESET: u32 = 0x2403;

// https://github.com/torvalds/linux/blob/v6.13/include/uapi/linux/perf_event.h#L389
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct perf_event_attr {
    pub type_: u32,
    pub size: u32,
    pub config: u64,
    /// `sample_period` or `sample_freq` (when `freq` is set).
    pub sample_period: u64,
    pub sample_type: u64,
    pub read_format: u64,
    /// Bitfield starting at `disabled`.
    pub flags: u64,
    /// `wakeup_events` or `wakeup_watermark` (when `watermark` is set).
    pub wakeup_events: u32,
    pub bp_type: u32,
    pub config1: u64,
    pub config2: u64,
    pub branch_sample_type: u64,
    pub sample_regs_user: u64,
    pub sample_stack_user: u32,
    pub clockid: i32,
    pub sample_regs_intr: u64,
    pub aux_watermark: u32,
    pub sample_max_stack: u16,
    pub __reserved_2: u16,
    pub aux_sample_size: u32,
    pub __reserved_3: u32,
    pub sig_data: u64,
    pub config3: u64,
}

macro_rules! bit {
    ($($set:ident, $get:ident = $bit:literal;)+) => {
        impl perf_event_attr {
            $(
            #[inline]
            pub fn $set(&mut self, val: u64) {
                self.flags = (self.flags & !(1 << $bit)) | ((val & 1) << $bit);
            }

            #[inline]
            pub fn $get(&self) -> u64 {
                (self.flags >> $bit) & 1
            }
            )+
        }
    };
}

bit! {
    set_disabled, disabled = 0;
    set_inherit, inherit = 1;
    set_pinned, pinned = 2;
    set_exclusive, exclusive = 3;
    set_exclude_user, exclude_user = 4;
    set_exclude_kernel, exclude_kernel = 5;
    set_exclude_hv, exclude_hv = 6;
    set_exclude_idle, exclude_idle = 7;
    set_mmap, mmap = 8;
    set_comm, comm = 9;
    set_freq, freq = 10;
}

pub const PERF_ATTR_SIZE_VER8: usize = 136;

const _: () = assert!(size_of::<perf_event_attr>() == PERF_ATTR_SIZE_VER8);

// https://github.com/torvalds/linux/blob/v6.13/include/uapi/linux/perf_event.h#L580
#[repr(C)]
pub struct perf_event_mmap_page {
    pub version: u32,
    pub compat_version: u32,
    pub lock: u32,
    pub index: u32,
    pub offset: i64,
    pub time_enabled: u64,
    pub time_running: u64,
    pub capabilities: u64,
    pub pmc_width: u16,
    pub time_shift: u16,
    pub time_mult: u32,
    pub time_offset: u64,
    pub time_zero: u64,
    pub size: u32,
    pub __reserved_1: u32,
    pub time_cycles: u64,
    pub time_mask: u64,
    pub __reserved: [u8; 116 * 8],
    pub data_head: u64,
    pub data_tail: u64,
    pub data_offset: u64,
    pub data_size: u64,
    pub aux_head: u64,
    pub aux_tail: u64,
    pub aux_offset: u64,
    pub aux_size: u64,
}

const _: () = assert!(offset_of!(perf_event_mmap_page, data_head) == 1024);

// https://github.com/torvalds/linux/blob/v6.13/include/uapi/linux/perf_event.h#L824
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct perf_event_header {
    pub type_: u32,
    pub misc: u16,
    pub size: u16,
}
