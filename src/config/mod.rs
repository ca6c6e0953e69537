use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{Error, Result};
use std::path::Path;
use std::sync::Arc;

pub(crate) mod attr;
mod event;
mod target;

pub use event::*;
pub use target::*;


/// Hardware topology: CPU packages (sockets) and their CPUs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Topology {
    pkgs: BTreeMap<u32, Vec<u32>>,
}

impl Topology {
    /// Adds CPUs to a package, keeping them in ascending order.
    pub fn add_pkg(&mut self, pkg: u32, cpus: impl IntoIterator<Item = u32>) -> &mut Self {
        let entry = self.pkgs.entry(pkg).or_default();
        entry.extend(cpus);
        entry.sort_unstable();
        entry.dedup();
        self
    }

    pub fn pkgs(&self) -> &BTreeMap<u32, Vec<u32>> {
        &self.pkgs
    }

    /// Reads the topology of the online CPUs of the running system.
    pub fn detect() -> Result<Self> {
        Self::from_sysfs("/sys/devices/system/cpu")
    }

    /// Reads `cpu<N>/topology/physical_package_id` below `root`.
    ///
    /// Offline CPUs have no `topology` directory and are skipped.
    pub fn from_sysfs(root: impl AsRef<Path>) -> Result<Self> {
        let mut topology = Self::default();

        for entry in fs::read_dir(root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(cpu) = name
                .to_str()
                .and_then(|it| it.strip_prefix("cpu"))
                .and_then(|it| it.parse::<u32>().ok())
            else {
                continue;
            };

            let path = entry.path().join("topology/physical_package_id");
            let Ok(pkg) = fs::read_to_string(path) else {
                continue;
            };
            let pkg = pkg.trim().parse::<u32>().map_err(Error::other)?;

            topology.add_pkg(pkg, [cpu]);
        }

        Ok(topology)
    }
}

/// Which CPUs of a package an events group is opened on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MonitoringMode {
    /// Every CPU of every package.
    #[default]
    AllCpus,
    /// The first CPU of every package, for package-wide events (e.g. RAPL).
    OneCpuPerPackage,
}

/// A counter with the name its value is reported under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventDescriptor {
    pub name: String,
    pub event: Event,
}

impl EventDescriptor {
    pub fn new(name: impl Into<String>, event: impl Into<Event>) -> Self {
        Self {
            name: name.into(),
            event: event.into(),
        }
    }
}

/// Counters scheduled together on the PMU.
///
/// The first event becomes the group leader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventsGroup {
    pub name: String,
    pub mode: MonitoringMode,
    pub events: Vec<EventDescriptor>,
}

impl EventsGroup {
    pub fn new(name: impl Into<String>, mode: MonitoringMode) -> Self {
        Self {
            name: name.into(),
            mode,
            events: vec![],
        }
    }

    pub fn event(mut self, name: impl Into<String>, event: impl Into<Event>) -> Self {
        self.events.push(EventDescriptor::new(name, event));
        self
    }
}

/// Call chain sampling options, used when the target is a cgroup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplingOpts {
    /// Samples per second.
    pub frequency: u64,
    /// The ring-buffer holds 2^`pages_exp` data pages.
    pub pages_exp: u8,
    /// Samples reporting more addresses than this are dropped.
    pub max_depth: u64,
}

impl Default for SamplingOpts {
    fn default() -> Self {
        Self {
            frequency: 1000,
            pages_exp: 6,
            max_depth: 50,
        }
    }
}

/// Everything a monitor needs, owned by the monitor for its whole life.
pub struct MonitoringConfig {
    pub topology: Topology,
    pub groups: BTreeMap<String, Arc<EventsGroup>>,
    pub target: Box<dyn Target>,
    pub sampling: SamplingOpts,
}

impl MonitoringConfig {
    /// Duplicates the shared topology and events groups for one monitor.
    pub fn new(
        topology: &Topology,
        groups: &BTreeMap<String, EventsGroup>,
        target: impl Target + 'static,
        sampling: SamplingOpts,
    ) -> Self {
        let groups = groups
            .iter()
            .map(|(name, group)| (name.clone(), Arc::new(group.clone())))
            .collect();

        Self {
            topology: topology.clone(),
            groups,
            target: Box::new(target),
            sampling,
        }
    }
}

impl fmt::Debug for MonitoringConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitoringConfig")
            .field("topology", &self.topology)
            .field("groups", &self.groups)
            .field("cgroup", &self.target.cgroup())
            .field("sampling", &self.sampling)
            .finish()
    }
}
