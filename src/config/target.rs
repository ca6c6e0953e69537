use std::fs::{self, File};
use std::io::{Error, ErrorKind, Result};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::ffi::bindings as b;

/// The monitored scope: the whole system or one cgroup.
pub trait Target: Send {
    /// Resolves the name used to label payloads and log lines.
    fn name(&self) -> Result<String>;

    /// Cgroup directory to restrict the counters to.
    fn cgroup(&self) -> Option<&Path>;
}

/// System-wide monitoring.
#[derive(Clone, Copy, Debug, Default)]
pub struct System;

impl Target for System {
    fn name(&self) -> Result<String> {
        Ok("all".into())
    }

    fn cgroup(&self) -> Option<&Path> {
        None
    }
}

/// Monitoring restricted to the processes of one cgroup (v2 directory, or a
/// `perf_event` controller directory on cgroup v1).
#[derive(Clone, Debug)]
pub struct Cgroup {
    pub path: PathBuf,
    /// Display name, defaults to the last component of `path`.
    pub name: Option<String>,
}

impl Cgroup {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl Target for Cgroup {
    fn name(&self) -> Result<String> {
        if let Some(name) = &self.name {
            return Ok(name.clone());
        }
        self.path
            .file_name()
            .and_then(|it| it.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                let msg = format!("no name for cgroup path: {}", self.path.display());
                Error::new(ErrorKind::InvalidInput, msg)
            })
    }

    fn cgroup(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Reads the process ids listed in `<path>/cgroup.procs`.
pub fn cgroup_pids(path: &Path) -> Result<Vec<u32>> {
    let content = fs::read_to_string(path.join("cgroup.procs"))?;

    let mut pids = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<u32>() {
            Ok(pid) => {
                debug!(pid, "found pid in cgroup");
                pids.push(pid);
            }
            Err(_) => warn!(line, "non-numeric line in cgroup.procs"),
        }
    }

    Ok(pids)
}

#[derive(Clone, Copy, Debug)]
pub struct All;

#[derive(Clone, Copy, Debug)]
pub struct Cpu(pub u32);

impl Cpu {
    pub const ALL: All = All;
}

#[derive(Clone, Copy, Debug)]
pub struct CgroupFd<'a>(pub &'a File);

/// The `pid`, `cpu` and `flags` arguments of one `perf_event_open` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    pub(crate) pid: i32,
    pub(crate) cpu: i32,
    pub(crate) flags: u64,
}

impl Scope {
    pub fn cpu(&self) -> i32 {
        self.cpu
    }

    pub fn is_cgroup(&self) -> bool {
        self.flags & b::PERF_FLAG_PID_CGROUP as u64 > 0
    }
}

macro_rules! into_scope {
    ($ty: ty, $destruct: tt, $pid: expr, $cpu: expr, $flags: expr) => {
        impl From<$ty> for Scope {
            fn from($destruct: $ty) -> Self {
                Scope {
                    pid: $pid as _,
                    cpu: $cpu as _,
                    flags: $flags as _,
                }
            }
        }
    };
}

into_scope!((All, Cpu), (_, Cpu(cpu)), -1, cpu, 0);
into_scope!((Cpu, All), (Cpu(cpu), _), -1, cpu, 0);

// A cgroup fd is only valid together with a CPU:
// https://github.com/torvalds/linux/blob/v6.13/kernel/events/core.c#L12835
into_scope!(
    (CgroupFd<'_>, Cpu),
    (CgroupFd(file), Cpu(cpu)),
    file.as_raw_fd(),
    cpu,
    b::PERF_FLAG_PID_CGROUP
);
