use crate::ffi::bindings as b;

/// Low-level counter description, as written into `perf_event_attr`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub ty: u32,
    pub config: u64,
    pub config1: u64,
    pub config2: u64,
}

impl Event {
    pub fn new(ty: u32, config: u64) -> Self {
        Self {
            ty,
            config,
            config1: 0,
            config2: 0,
        }
    }
}

/// Generalized hardware events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hardware {
    CpuCycle,
    BusCycle,
    RefCpuCycle,

    CacheMiss,
    CacheAccess,

    BranchMiss,
    BranchInstr,

    BackendStalledCycle,
    FrontendStalledCycle,

    Instr,
}

impl From<Hardware> for Event {
    fn from(value: Hardware) -> Self {
        let config = match value {
            Hardware::CpuCycle => b::PERF_COUNT_HW_CPU_CYCLES,
            Hardware::BusCycle => b::PERF_COUNT_HW_BUS_CYCLES,
            Hardware::RefCpuCycle => b::PERF_COUNT_HW_REF_CPU_CYCLES,

            Hardware::CacheMiss => b::PERF_COUNT_HW_CACHE_MISSES,
            Hardware::CacheAccess => b::PERF_COUNT_HW_CACHE_REFERENCES,

            Hardware::BranchMiss => b::PERF_COUNT_HW_BRANCH_MISSES,
            Hardware::BranchInstr => b::PERF_COUNT_HW_BRANCH_INSTRUCTIONS,

            Hardware::BackendStalledCycle => b::PERF_COUNT_HW_STALLED_CYCLES_BACKEND,
            Hardware::FrontendStalledCycle => b::PERF_COUNT_HW_STALLED_CYCLES_FRONTEND,

            Hardware::Instr => b::PERF_COUNT_HW_INSTRUCTIONS,
        };
        Event::new(b::PERF_TYPE_HARDWARE, config)
    }
}

/// Software events provided by the kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Software {
    CpuClock,
    TaskClock,

    PageFault,
    MinorPageFault,
    MajorPageFault,

    EmuFault,
    AlignFault,

    CtxSwitch,
    CpuMigration,

    Dummy,
}

impl From<Software> for Event {
    fn from(value: Software) -> Self {
        let config = match value {
            Software::CpuClock => b::PERF_COUNT_SW_CPU_CLOCK,
            Software::TaskClock => b::PERF_COUNT_SW_TASK_CLOCK,

            Software::PageFault => b::PERF_COUNT_SW_PAGE_FAULTS,
            Software::MinorPageFault => b::PERF_COUNT_SW_PAGE_FAULTS_MIN,
            Software::MajorPageFault => b::PERF_COUNT_SW_PAGE_FAULTS_MAJ,

            Software::EmuFault => b::PERF_COUNT_SW_EMULATION_FAULTS,
            Software::AlignFault => b::PERF_COUNT_SW_ALIGNMENT_FAULTS,

            Software::CtxSwitch => b::PERF_COUNT_SW_CONTEXT_SWITCHES,
            Software::CpuMigration => b::PERF_COUNT_SW_CPU_MIGRATIONS,

            Software::Dummy => b::PERF_COUNT_SW_DUMMY,
        };
        Event::new(b::PERF_TYPE_SOFTWARE, config)
    }
}

/// A "raw" implementation-specific event, as found in the CPU vendor manuals
/// or in `/sys/bus/event_source/devices/cpu/events`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Raw {
    pub config: u64,
    pub config1: u64,
    pub config2: u64,
}

impl From<Raw> for Event {
    fn from(value: Raw) -> Self {
        Event {
            ty: b::PERF_TYPE_RAW,
            config: value.config,
            config1: value.config1,
            config2: value.config2,
        }
    }
}
