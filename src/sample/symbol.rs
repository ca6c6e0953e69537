use std::fs;
use std::io::Result;
use std::path::Path;

use tracing::debug;

/// Resolves instruction addresses of a callchain into names.
pub trait Symbolize: Send {
    /// Returns `None` when nothing is known about `addr`.
    fn resolve(&self, addr: u64) -> Option<String>;
}

/// Resolves nothing, addresses are rendered raw.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSymbols;

impl Symbolize for NoSymbols {
    fn resolve(&self, _: u64) -> Option<String> {
        None
    }
}

/// Creates a [`Symbolize`] for one process.
pub trait Backend: Send {
    fn attach(&self, pid: u32) -> Result<Box<dyn Symbolize>>;
}

/// Executable mappings of a process, resolving addresses to `module+0xoffset`.
///
/// The offset is relative to the start of the mapped file, which is what
/// `addr2line`-like tools expect.
#[derive(Clone, Debug, Default)]
pub struct ProcMaps {
    mappings: Vec<Mapping>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Mapping {
    start: u64,
    end: u64,
    offset: u64,
    module: String,
}

impl ProcMaps {
    /// Reads `/proc/<pid>/maps`.
    pub fn read(pid: u32) -> Result<Self> {
        Self::from_file(format!("/proc/{}/maps", pid))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mappings: Vec<_> = content.lines().filter_map(parse_map_line).collect();
        debug!(mappings = mappings.len(), "loaded executable mappings");
        Self { mappings }
    }
}

impl Symbolize for ProcMaps {
    fn resolve(&self, addr: u64) -> Option<String> {
        let it = self
            .mappings
            .iter()
            .find(|it| addr >= it.start && addr < it.end)?;
        Some(format!("{}+0x{:x}", it.module, addr - it.start + it.offset))
    }
}

/// Attaches a [`ProcMaps`] to the process.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcMapsBackend;

impl Backend for ProcMapsBackend {
    fn attach(&self, pid: u32) -> Result<Box<dyn Symbolize>> {
        Ok(Box::new(ProcMaps::read(pid)?))
    }
}

// Format: 7f45c000-7f45e000 r-xp 00000000 08:01 123456 /path/to/file
// Only executable mappings with a path are kept.
fn parse_map_line(line: &str) -> Option<Mapping> {
    let mut parts = line.split_whitespace();
    let (start, end) = parts.next()?.split_once('-')?;
    let perms = parts.next()?;
    let offset = parts.next()?;
    let module = parts.nth(2)?;

    if !perms.contains('x') {
        return None;
    }

    let module = Path::new(module).file_name()?.to_str()?.to_string();
    Some(Mapping {
        start: u64::from_str_radix(start, 16).ok()?,
        end: u64::from_str_radix(end, 16).ok()?,
        offset: u64::from_str_radix(offset, 16).ok()?,
        module,
    })
}
