use std::io::{Error, ErrorKind, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{Attr, Handle, Pmu};
use crate::config::Scope;
use crate::sample::Arena;

/// One `open` call seen by a [`FakePmu`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Opened {
    pub config: u64,
    pub sample_type: u64,
    pub cpu: i32,
    pub cgroup: bool,
    pub leader: bool,
}

#[derive(Debug, Default)]
pub(crate) struct State {
    pub live: AtomicUsize,
    pub opened: AtomicUsize,
    pub enables: AtomicUsize,
    pub resets: AtomicUsize,
    pub fail_read: AtomicBool,
    pub fail_reset: AtomicBool,
    pub short_read: AtomicBool,
    pub opens: Mutex<Vec<Opened>>,
}

/// In-memory counters, accounting for every open handle.
#[derive(Clone, Debug)]
pub(crate) struct FakePmu {
    pub state: Arc<State>,
    /// Index of the `open` call to fail.
    pub fail_open_at: Option<usize>,
    pub fail_map: bool,
    pub time_enabled: u64,
    pub time_running: u64,
}

impl Default for FakePmu {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            fail_open_at: None,
            fail_map: false,
            time_enabled: 1000,
            time_running: 1000,
        }
    }
}

impl FakePmu {
    pub fn live(&self) -> usize {
        self.state.live.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> Vec<Opened> {
        self.state.opens.lock().unwrap().clone()
    }
}

impl Pmu for FakePmu {
    type Counter = FakeCounter;

    fn open(&self, attr: &Attr, scope: &Scope, leader: Option<&FakeCounter>) -> Result<FakeCounter> {
        let nth = self.state.opened.fetch_add(1, Ordering::SeqCst);
        if self.fail_open_at == Some(nth) {
            return Err(Error::from_raw_os_error(libc::EMFILE));
        }

        self.state.opens.lock().unwrap().push(Opened {
            config: attr.config,
            sample_type: attr.sample_type,
            cpu: scope.cpu(),
            cgroup: scope.is_cgroup(),
            leader: leader.is_none(),
        });
        self.state.live.fetch_add(1, Ordering::SeqCst);

        Ok(FakeCounter {
            pmu: self.clone(),
        })
    }
}

#[derive(Debug)]
pub(crate) struct FakeCounter {
    pmu: FakePmu,
}

impl Handle for FakeCounter {
    fn enable_group(&self) -> Result<()> {
        self.pmu.state.enables.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn reset_group(&self) -> Result<()> {
        if self.pmu.state.fail_reset.load(Ordering::SeqCst) {
            return Err(Error::from_raw_os_error(libc::EBADF));
        }
        self.pmu.state.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    // Counter `i` of the group reports `(i + 1) * 10`.
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let state = &self.pmu.state;
        if state.fail_read.load(Ordering::SeqCst) {
            return Err(Error::from_raw_os_error(libc::EIO));
        }
        if buf.len() < 24 {
            return Err(Error::from(ErrorKind::InvalidInput));
        }

        let nr = (buf.len() - 24) / 8;
        let mut words = vec![nr as u64, self.pmu.time_enabled, self.pmu.time_running];
        words.extend((0..nr as u64).map(|i| (i + 1) * 10));
        for (chunk, word) in buf.chunks_exact_mut(8).zip(words) {
            chunk.copy_from_slice(&word.to_ne_bytes());
        }

        if state.short_read.load(Ordering::SeqCst) {
            return Ok(buf.len() - 8);
        }
        Ok(buf.len())
    }

    fn map(&self, len: usize) -> Result<Arena> {
        if self.pmu.fail_map {
            return Err(Error::from_raw_os_error(libc::ENOMEM));
        }
        Arena::anonymous(len)
    }
}

impl Drop for FakeCounter {
    fn drop(&mut self) {
        self.pmu.state.live.fetch_sub(1, Ordering::SeqCst);
    }
}
