use std::borrow::Cow;
use std::sync::atomic::{fence, AtomicU64, Ordering};

use arrayvec::ArrayVec;
use tracing::warn;

use crate::ffi::{deref_offset, Header};

#[cfg(test)]
mod test;

const HEADER_LEN: usize = size_of::<Header>();

/// Consumer side of a kernel sample ring-buffer.
///
/// `head` only moves forward and is written by the kernel, `tail` is owned by us.
/// Both are free-running byte positions, the offset in `data` is the position
/// modulo the data size.
pub(crate) struct Rb<'a> {
    data: &'a [u8],
    tail: &'a AtomicU64,
    head: &'a AtomicU64,
}

impl<'a> Rb<'a> {
    pub fn new(data: &'a [u8], tail: &'a AtomicU64, head: &'a AtomicU64) -> Self {
        Self { data, tail, head }
    }

    /// Passes every complete record written before the call to `f`, header included.
    ///
    /// Returns `None` if there was nothing to read, otherwise the number of records
    /// visited. The tail always ends at the head observed on entry.
    pub fn drain(&self, mut f: impl FnMut(&[u8])) -> Option<usize> {
        let size = self.data.len() as u64;

        // Single consumer, nobody else writes the tail.
        let mut tail = self.tail.load(Ordering::Relaxed);
        // https://github.com/torvalds/linux/blob/v6.13/include/uapi/linux/perf_event.h#L720
        // https://github.com/torvalds/linux/blob/v6.13/kernel/events/ring_buffer.c#L99
        let head = self.head.load(Ordering::Acquire);
        fence(Ordering::SeqCst);

        if tail == head || size == 0 {
            return None;
        }

        let mut visited = 0;
        while tail != head {
            let remaining = head.wrapping_sub(tail);
            let offset = (tail % size) as usize;

            let header = match self.header_at(offset) {
                Some(header) if remaining >= HEADER_LEN as u64 => header,
                _ => {
                    warn!(tail, head, "truncated record header in ring buffer");
                    self.skip_to(head);
                    break;
                }
            };

            let len = header.size as usize;
            if len < HEADER_LEN || len as u64 > remaining || len > self.data.len() {
                warn!(tail, head, len, "malformed record size in ring buffer");
                self.skip_to(head);
                break;
            }

            f(&self.record_at(offset, len));
            visited += 1;

            tail = tail.wrapping_add(len as u64);
            // https://github.com/torvalds/linux/blob/v6.13/include/uapi/linux/perf_event.h#L723
            fence(Ordering::SeqCst);
            self.tail.store(tail, Ordering::Release);
        }
        fence(Ordering::SeqCst);

        Some(visited)
    }

    // https://github.com/torvalds/linux/blob/v6.13/include/uapi/linux/perf_event.h#L824
    // struct perf_event_header {
    //     u32 type; # 4 bytes
    //     u16 misc; # 2 bytes
    //     u16 size; # 2 bytes
    // };
    fn header_at(&self, offset: usize) -> Option<Header> {
        let mut buf = ArrayVec::<u8, HEADER_LEN>::new();
        let hi_part = &self.data[offset..];
        let hi_part = &hi_part[..hi_part.len().min(HEADER_LEN)];
        buf.try_extend_from_slice(hi_part).ok()?;
        if !buf.is_full() {
            // The header wraps around the end of the buffer.
            let lo_part_len = HEADER_LEN - buf.len();
            buf.try_extend_from_slice(self.data.get(..lo_part_len)?).ok()?;
        }
        let buf = buf.into_inner().ok()?;
        Some(unsafe { deref_offset(&mut buf.as_ptr()) })
    }

    fn record_at(&self, offset: usize, len: usize) -> Cow<'a, [u8]> {
        let hi_part = &self.data[offset..];
        if len <= hi_part.len() {
            return Cow::Borrowed(&hi_part[..len]);
        }

        let mut buf = Vec::with_capacity(len);
        buf.extend_from_slice(hi_part);
        buf.extend_from_slice(&self.data[..len - hi_part.len()]);
        Cow::Owned(buf)
    }

    fn skip_to(&self, head: u64) {
        fence(Ordering::SeqCst);
        self.tail.store(head, Ordering::Release);
    }
}
