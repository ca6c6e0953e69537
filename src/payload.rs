//! Per-tick snapshot handed to the reporting sink.
//!
//! The tree is keyed like the session tree: group name, package id, CPU id.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Metric name of the time the group was enabled during the interval.
pub const TIME_ENABLED: &str = "time_enabled";
/// Metric name of the time the group was scheduled on the PMU during the interval.
pub const TIME_RUNNING: &str = "time_running";
/// Metric name of the rendered call chains.
pub const CALLCHAIN: &str = "callchain";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Payload {
    pub timestamp: u64,
    /// Display name of the monitored target.
    pub target: String,
    pub groups: BTreeMap<String, GroupData>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupData {
    pub pkgs: BTreeMap<u32, PkgData>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PkgData {
    pub cpus: BTreeMap<u32, CpuData>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CpuData {
    pub metrics: BTreeMap<String, Metric>,
}

impl CpuData {
    pub fn counter(&self, name: &str) -> Option<u64> {
        match self.metrics.get(name)? {
            Metric::Counter(n) => Some(*n),
            Metric::Callchain(_) => None,
        }
    }

    pub fn callchain(&self) -> Option<&str> {
        match self.metrics.get(CALLCHAIN)? {
            Metric::Callchain(it) => Some(it),
            Metric::Counter(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Metric {
    Counter(u64),
    Callchain(String),
}
