use std::{fs, io};

use tracing::debug;

use crate::config::attr::counting;
use crate::config::{Cpu, Hardware, Scope};
use crate::count::{Kernel, Pmu};
use crate::error::ProbeError;

const PARANOID: &str = "/proc/sys/kernel/perf_event_paranoid";

/// Checks that this process can open hardware counters.
///
/// Opens one disabled, system-wide instructions counter on CPU 0 and closes it.
///
/// # Examples
///
/// ```rust
/// use hwpc_monitor::probe::probe;
/// use hwpc_monitor::ProbeError;
///
/// match probe() {
///     Ok(()) => println!("hardware counters available"),
///     Err(ProbeError::PermissionDenied { paranoid, .. }) => {
///         println!("permission denied, perf_event_paranoid={:?}", paranoid)
///     }
///     Err(e) => println!("{}", e),
/// }
/// ```
pub fn probe() -> Result<(), ProbeError> {
    let attr = counting(&Hardware::Instr.into());
    let scope = Scope::from((Cpu::ALL, Cpu(0)));

    match Kernel.open(&attr, &scope, None) {
        Ok(counter) => {
            debug!("performance counters available");
            drop(counter);
            Ok(())
        }
        Err(e) => Err(classify(e)),
    }
}

fn classify(e: io::Error) -> ProbeError {
    match e.raw_os_error() {
        Some(libc::ENOENT | libc::ENODEV | libc::EOPNOTSUPP | libc::ENOSYS) => ProbeError::Unsupported(e),
        Some(libc::EACCES | libc::EPERM) => ProbeError::PermissionDenied {
            paranoid: paranoid(),
            source: e,
        },
        _ => ProbeError::Other(e),
    }
}

/// Reads `perf_event_paranoid`, `None` if it cannot be read.
pub fn paranoid() -> Option<i32> {
    fs::read_to_string(PARANOID).ok()?.trim().parse().ok()
}
