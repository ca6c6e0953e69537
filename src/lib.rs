//! Grouped hardware performance counter monitoring on top of `perf_event_open`.
//!
//! A [`Monitor`][monitor::Monitor] watches one target, either the whole system
//! or one cgroup. It opens one counter group per events group, package and CPU,
//! then on every tick reads and resets all of them and reports a
//! [`Payload`][payload::Payload] mirroring that tree. For cgroup targets the
//! leaders of the first events group also sample call chains, which are
//! reported alongside the counts.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//!
//! use futures::channel::mpsc;
//! use futures::executor::block_on;
//! use futures::StreamExt;
//! use hwpc_monitor::config::{
//!     EventsGroup, Hardware, MonitoringConfig, MonitoringMode, SamplingOpts, System, Topology,
//! };
//! use hwpc_monitor::count::Kernel;
//! use hwpc_monitor::monitor::{Monitor, Ticker};
//!
//! let topology = Topology::detect().unwrap();
//! let group = EventsGroup::new("core", MonitoringMode::AllCpus)
//!     .event("cycles", Hardware::CpuCycle)
//!     .event("instructions", Hardware::Instr);
//! let groups = BTreeMap::from([(group.name.clone(), group)]);
//!
//! let config = MonitoringConfig::new(&topology, &groups, System, SamplingOpts::default());
//!
//! let mut ticker = Ticker::new();
//! let (sink, mut payloads) = mpsc::unbounded();
//! let monitor = Monitor::new(config, Kernel).spawn(ticker.subscribe(), sink).unwrap();
//!
//! ticker.tick(1000);
//! let payload = block_on(payloads.next()).unwrap();
//! println!("{:?}", payload.groups["core"]);
//!
//! monitor.terminate().unwrap();
//! ```
//!
//! ## Kernel compatibility
//!
//! Any Linux kernel since 4.0 is supported. Cgroup targets need the
//! `perf_event` controller (always present on cgroup v2).

pub mod config;
pub mod count;
mod error;
mod ffi;
pub mod monitor;
pub mod payload;
pub mod probe;
pub mod sample;
pub mod session;

pub use error::{Error, Leaf, ProbeError};
