use super::Event;
use crate::ffi::{bindings as b, Attr};

// Every counter of a group is read through its leader with `PERF_FORMAT_GROUP`,
// see `crate::count::GroupStat` for the resulting layout.
pub(crate) const READ_FORMAT: u64 =
    b::PERF_FORMAT_GROUP | b::PERF_FORMAT_TOTAL_TIME_ENABLED | b::PERF_FORMAT_TOTAL_TIME_RUNNING;

/// Attr for one counting member of an events group.
///
/// Counters start disabled, the whole group is enabled at once through the leader.
pub(crate) fn counting(event: &Event) -> Attr {
    let mut attr = Attr {
        size: size_of::<Attr>() as _,
        ..Default::default()
    };

    attr.type_ = event.ty;
    attr.config = event.config;
    attr.config1 = event.config1;
    attr.config2 = event.config2;

    attr.read_format = READ_FORMAT;
    attr.set_disabled(1);

    attr
}

/// Turns a counting attr into one that also samples call chains at `freq` Hz.
pub(crate) fn sampling(mut attr: Attr, freq: u64) -> Attr {
    attr.set_freq(1);
    attr.sample_period = freq;
    attr.sample_type = b::PERF_SAMPLE_CALLCHAIN;
    attr
}
