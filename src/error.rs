use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Locates one CPU session in the session tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leaf {
    pub group: String,
    pub pkg: u32,
    pub cpu: u32,
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group={} pkg={} cpu={}", self.group, self.pkg, self.cpu)
    }
}

/// Monitoring errors.
///
/// Errors raised while building the session tree are fatal to the monitor,
/// errors raised while collecting only abort the current tick.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot resolve target name")]
    TargetName(#[source] io::Error),

    #[error("cannot open cgroup dir path={}", .path.display())]
    Cgroup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no pid found in cgroup path={}", .path.display())]
    NoPid { path: PathBuf },

    #[error("failed opening perf event for {leaf} event={event}")]
    Open {
        leaf: Leaf,
        event: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to map ring buffer for {leaf}")]
    Map {
        leaf: Leaf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read perf values for {leaf}")]
    Read {
        leaf: Leaf,
        #[source]
        source: io::Error,
    },

    #[error("cannot reset events for {leaf}")]
    Reset {
        leaf: Leaf,
        #[source]
        source: io::Error,
    },

    #[error("cannot enable events for {leaf}")]
    Enable {
        leaf: Leaf,
        #[source]
        source: io::Error,
    },
}

/// Failures of the [capability probe][crate::probe::probe].
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("kernel does not support performance counters")]
    Unsupported(#[source] io::Error),

    #[error("not allowed to open performance counters (perf_event_paranoid={})", .paranoid.map_or("?".into(), |it| it.to_string()))]
    PermissionDenied {
        paranoid: Option<i32>,
        #[source]
        source: io::Error,
    },

    #[error("failed to open performance counter")]
    Other(#[source] io::Error),
}

/// Displays an error followed by its sources, separated by `: `.
pub(crate) struct Chain<'a>(pub &'a dyn StdError);

impl fmt::Display for Chain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(e) = source {
            write!(f, ": {}", e)?;
            source = e.source();
        }
        Ok(())
    }
}
