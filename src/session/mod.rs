//! Open counters of one monitored target.
//!
//! Sessions form a tree: events group, then package, then CPU. Every CPU
//! session owns one [`CounterGroup`] driven through its leader.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::attr::{counting, sampling};
use crate::config::{
    cgroup_pids, CgroupFd, Cpu, EventDescriptor, EventsGroup, MonitoringConfig, MonitoringMode, SamplingOpts,
    Scope,
};
use crate::count::{CounterGroup, Handle, Pmu};
use crate::error::{Error, Leaf};
use crate::payload::{CpuData, GroupData, Metric, Payload, PkgData, CALLCHAIN, TIME_ENABLED, TIME_RUNNING};
use crate::sample::{Backend, Callchain, NoSymbols, Sampler, Symbolize};


/// All sessions of one target.
pub struct SessionTree<C> {
    groups: BTreeMap<String, GroupSession<C>>,
    callchain: Callchain,
    pid: Option<u32>,
    // Closed after every counter scoped to it.
    cgroup: Option<File>,
}

pub struct GroupSession<C> {
    config: Arc<EventsGroup>,
    pkgs: BTreeMap<u32, PkgSession<C>>,
}

pub struct PkgSession<C> {
    cpus: BTreeMap<u32, CpuSession<C>>,
}

pub struct CpuSession<C> {
    // Unmapped before the counters are closed.
    sampler: Option<Sampler>,
    counters: CounterGroup<C>,
}

impl<C: Handle> SessionTree<C> {
    /// Opens every counter described by `config`.
    ///
    /// Either every counter is opened or none is left open: on failure the
    /// counters opened so far are closed before returning.
    ///
    /// With a cgroup target, the leaders of the first events group also sample
    /// call chains, symbolized through `backend` when one attaches to the
    /// first process of the cgroup.
    pub fn build<P>(pmu: &P, config: &MonitoringConfig, backend: Option<&dyn Backend>) -> Result<Self, Error>
    where
        P: Pmu<Counter = C>,
    {
        let (cgroup, pid) = match config.target.cgroup() {
            Some(path) => {
                let file = File::open(path).map_err(|source| Error::Cgroup {
                    path: path.into(),
                    source,
                })?;
                (Some(file), Some(resolve_pid(path)?))
            }
            None => (None, None),
        };

        let symbols = match (pid, backend) {
            (Some(pid), Some(backend)) => match backend.attach(pid) {
                Ok(symbols) => symbols,
                Err(e) => {
                    warn!(pid, error = %e, "failed to attach symbol backend, using raw addresses");
                    Box::new(NoSymbols)
                }
            },
            _ => Box::new(NoSymbols) as Box<dyn Symbolize>,
        };
        let callchain = Callchain::new(symbols, config.sampling.max_depth);

        let scope = |cpu: u32| match &cgroup {
            Some(file) => Scope::from((CgroupFd(file), Cpu(cpu))),
            None => Scope::from((Cpu::ALL, Cpu(cpu))),
        };

        let mut groups = BTreeMap::new();
        for (i, (name, group)) in config.groups.iter().enumerate() {
            let sampled = (i == 0 && cgroup.is_some()).then_some(&config.sampling);

            let mut pkgs = BTreeMap::new();
            for (&pkg, cpus) in config.topology.pkgs() {
                let cpus = match group.mode {
                    MonitoringMode::AllCpus => &cpus[..],
                    MonitoringMode::OneCpuPerPackage => &cpus[..cpus.len().min(1)],
                };

                let mut sessions = BTreeMap::new();
                for &cpu in cpus {
                    let leaf = Leaf {
                        group: name.clone(),
                        pkg,
                        cpu,
                    };
                    let session = CpuSession::open(pmu, group, &scope(cpu), sampled, &leaf)?;
                    debug!(group = %name, pkg, cpu, counters = session.counters.len(), "opened cpu session");
                    sessions.insert(cpu, session);
                }
                pkgs.insert(pkg, PkgSession { cpus: sessions });
            }

            let session = GroupSession {
                config: group.clone(),
                pkgs,
            };
            groups.insert(name.clone(), session);
        }

        Ok(Self {
            groups,
            callchain,
            pid,
            cgroup,
        })
    }

    /// Resets then enables every counter group.
    ///
    /// A failing group is logged and left as is, the others are still enabled.
    /// The failures are returned for inspection.
    pub fn enable(&self) -> Vec<Error> {
        let mut failures = vec![];
        for (name, group) in &self.groups {
            for (&pkg, pkg_session) in &group.pkgs {
                for (&cpu, session) in &pkg_session.cpus {
                    let leaf = || Leaf {
                        group: name.clone(),
                        pkg,
                        cpu,
                    };
                    if let Err(source) = session.counters.clear_count() {
                        error!(group = %name, pkg, cpu, error = %source, "cannot reset events");
                        failures.push(Error::Reset { leaf: leaf(), source });
                    }
                    if let Err(source) = session.counters.enable() {
                        error!(group = %name, pkg, cpu, error = %source, "cannot enable events");
                        failures.push(Error::Enable { leaf: leaf(), source });
                    }
                }
            }
        }
        failures
    }

    /// Reads and resets every counter group, collecting the values into a payload.
    ///
    /// The first failing group aborts the whole payload.
    pub fn collect(&mut self, timestamp: u64, target: &str) -> Result<Payload, Error> {
        let mut payload = Payload {
            timestamp,
            target: target.into(),
            groups: BTreeMap::new(),
        };

        for (name, group) in &mut self.groups {
            let mut group_data = GroupData::default();
            for (&pkg, pkg_session) in &mut group.pkgs {
                let mut pkg_data = PkgData::default();
                for (&cpu, session) in &mut pkg_session.cpus {
                    let leaf = Leaf {
                        group: name.clone(),
                        pkg,
                        cpu,
                    };
                    let data = session.collect(&group.config, &self.callchain, leaf)?;
                    pkg_data.cpus.insert(cpu, data);
                }
                group_data.pkgs.insert(pkg, pkg_data);
            }
            payload.groups.insert(name.clone(), group_data);
        }

        Ok(payload)
    }

    pub fn groups(&self) -> &BTreeMap<String, GroupSession<C>> {
        &self.groups
    }

    /// Process the call chains are symbolized for, with a cgroup target.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_cgroup(&self) -> bool {
        self.cgroup.is_some()
    }
}

impl<C> GroupSession<C> {
    pub fn config(&self) -> &EventsGroup {
        &self.config
    }

    pub fn pkgs(&self) -> &BTreeMap<u32, PkgSession<C>> {
        &self.pkgs
    }
}

impl<C> PkgSession<C> {
    pub fn cpus(&self) -> &BTreeMap<u32, CpuSession<C>> {
        &self.cpus
    }
}

impl<C: Handle> CpuSession<C> {
    fn open<P>(
        pmu: &P,
        group: &EventsGroup,
        scope: &Scope,
        sampled: Option<&SamplingOpts>,
        leaf: &Leaf,
    ) -> Result<Self, Error>
    where
        P: Pmu<Counter = C>,
    {
        let open_err = |event: &EventDescriptor| {
            let event = event.name.clone();
            move |source| Error::Open {
                leaf: leaf.clone(),
                event,
                source,
            }
        };

        let Some((first, rest)) = group.events.split_first() else {
            return Err(Error::Open {
                leaf: leaf.clone(),
                event: String::new(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "events group has no events"),
            });
        };

        // Counts are reported keyed by event name, next to the reserved metrics.
        let mut names = BTreeSet::from([TIME_ENABLED, TIME_RUNNING, CALLCHAIN]);
        if let Some(dup) = group.events.iter().find(|it| !names.insert(it.name.as_str())) {
            return Err(Error::Open {
                leaf: leaf.clone(),
                event: dup.name.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "duplicate event name"),
            });
        }

        let attr = match sampled {
            Some(opts) => sampling(counting(&first.event), opts.frequency),
            None => counting(&first.event),
        };
        let leader = pmu.open(&attr, scope, None).map_err(open_err(first))?;

        let sampler = match sampled {
            Some(opts) => {
                let sampler = Sampler::new(&leader, opts.pages_exp).map_err(|source| Error::Map {
                    leaf: leaf.clone(),
                    source,
                })?;
                Some(sampler)
            }
            None => None,
        };

        let mut counters = CounterGroup::from(leader);
        for event in rest {
            let attr = counting(&event.event);
            counters.add(pmu, &attr, scope).map_err(open_err(event))?;
        }

        Ok(Self { sampler, counters })
    }

    fn collect(&mut self, group: &EventsGroup, callchain: &Callchain, leaf: Leaf) -> Result<CpuData, Error> {
        let stat = match self.counters.stat() {
            Ok(stat) => stat,
            Err(source) => return Err(Error::Read { leaf, source }),
        };
        // Counts restart from zero every tick.
        if let Err(source) = self.counters.clear_count() {
            return Err(Error::Reset { leaf, source });
        }

        let ratio = stat.multiplexing_ratio();
        if ratio < 1.0 {
            warn!(group = %leaf.group, pkg = leaf.pkg, cpu = leaf.cpu, ratio, "perf multiplexing");
        }

        let mut data = CpuData::default();
        data.metrics.insert(TIME_ENABLED.into(), Metric::Counter(stat.time_enabled));
        data.metrics.insert(TIME_RUNNING.into(), Metric::Counter(stat.time_running));
        for (event, count) in group.events.iter().zip(stat.counts) {
            data.metrics.insert(event.name.clone(), Metric::Counter(count));
        }

        if let Some(chains) = self.sampler.as_ref().and_then(|it| it.callchains(callchain)) {
            if !chains.is_empty() {
                data.metrics.insert(CALLCHAIN.into(), Metric::Callchain(chains));
            }
        }

        Ok(data)
    }

    pub fn counters(&self) -> &CounterGroup<C> {
        &self.counters
    }

    pub fn sampler(&self) -> Option<&Sampler> {
        self.sampler.as_ref()
    }
}

// Only the first process of a cgroup is used to symbolize call chains.
fn resolve_pid(path: &Path) -> Result<u32, Error> {
    let pids = cgroup_pids(path).map_err(|source| Error::Cgroup {
        path: path.into(),
        source,
    })?;

    match pids[..] {
        [] => Err(Error::NoPid { path: path.into() }),
        [pid] => Ok(pid),
        [pid, ..] => {
            warn!(path = %path.display(), pids = pids.len(), pid, "more than one pid in cgroup, using the first");
            Ok(pid)
        }
    }
}
