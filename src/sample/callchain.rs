use std::fmt::Write;

use tracing::{debug, warn};

use super::symbol::{NoSymbols, Symbolize};
use crate::ffi::{bindings as b, deref_offset, Header};

/// Renders `PERF_RECORD_SAMPLE` records carrying only `PERF_SAMPLE_CALLCHAIN`.
///
/// Each sample becomes its addresses joined by `;` and terminated by `|`.
/// Addresses are replaced by their symbol when one resolves.
pub struct Callchain {
    symbols: Box<dyn Symbolize>,
    max_depth: u64,
}

impl Callchain {
    pub fn new(symbols: Box<dyn Symbolize>, max_depth: u64) -> Self {
        Self { symbols, max_depth }
    }

    pub fn without_symbols(max_depth: u64) -> Self {
        Self::new(Box::new(NoSymbols), max_depth)
    }

    /// Appends one record to `out`, returns whether it was a rendered sample.
    //
    // https://github.com/torvalds/linux/blob/v6.13/include/uapi/linux/perf_event.h#L957
    // struct {
    //     struct perf_event_header header;
    //     u64 nr;
    //     u64 ips[nr]; # PERF_SAMPLE_CALLCHAIN
    // };
    pub fn render(&self, record: &[u8], out: &mut String) -> bool {
        const PREFIX: usize = size_of::<Header>() + size_of::<u64>();

        if record.len() < PREFIX {
            return false;
        }

        let mut ptr = record.as_ptr();
        let header: Header = unsafe { deref_offset(&mut ptr) };
        if header.type_ != b::PERF_RECORD_SAMPLE {
            debug!(ty = header.type_, "skipping non-sample record");
            return false;
        }

        let nr: u64 = unsafe { deref_offset(&mut ptr) };
        if nr > self.max_depth {
            warn!(nr, max = self.max_depth, "callchain too deep, sample dropped");
            return false;
        }
        if nr > ((record.len() - PREFIX) / size_of::<u64>()) as u64 {
            warn!(nr, len = record.len(), "truncated callchain sample");
            return false;
        }

        for i in 0..nr {
            // Bounds are checked above.
            let ip: u64 = unsafe { deref_offset(&mut ptr) };
            if i > 0 {
                out.push(';');
            }
            match self.symbols.resolve(ip) {
                Some(name) => out.push_str(&name),
                None => {
                    let _ = write!(out, "0x{:016x}", ip);
                }
            }
        }
        out.push('|');

        true
    }
}
