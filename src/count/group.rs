use std::io::{Error, ErrorKind, Result};

use super::{Attr, GroupStat, Handle, Pmu};
use crate::config::Scope;

/// Counter group.
///
/// An event group is scheduled onto the CPU as a unit: it will be put onto
/// the CPU only if all of the events in the group can be put onto the CPU.
///
/// This means that the values of the member events can be meaningfully compared, added,
/// divided (to get ratios), and so on with each other, since they have counted events
/// for the same set of executed instructions.
///
/// Enabling, resetting and reading go through the leader with group-wide semantics.
pub struct CounterGroup<C> {
    // Declared first so siblings are closed before the leader.
    siblings: Vec<C>,
    leader: C,
    read_buf: Vec<u8>,
}

impl<C: Handle> CounterGroup<C> {
    /// Create group with leader counter.
    pub fn from(leader: C) -> Self {
        Self {
            siblings: vec![],
            leader,
            read_buf: vec![0; GroupStat::read_buf_size(1)],
        }
    }

    /// Returns a reference to the leader of the counter group.
    pub fn leader(&self) -> &C {
        &self.leader
    }

    /// Returns the sibling counters of the counter group in the order they were added.
    pub fn siblings(&self) -> &[C] {
        &self.siblings
    }

    /// Number of counters, leader included.
    pub fn len(&self) -> usize {
        self.siblings.len() + 1
    }

    /// Opens a sibling counter on the same scope as the leader.
    pub fn add<P>(&mut self, pmu: &P, attr: &Attr, scope: &Scope) -> Result<&C>
    where
        P: Pmu<Counter = C>,
    {
        let sibling = pmu.open(attr, scope, Some(&self.leader))?;
        self.siblings.push(sibling);
        self.read_buf.resize(GroupStat::read_buf_size(self.len()), 0);
        Ok(&self.siblings[self.siblings.len() - 1])
    }

    /// Enables all counters in the group.
    pub fn enable(&self) -> Result<()> {
        self.leader.enable_group()
    }

    /// Clears the counts of all counters in the group.
    pub fn clear_count(&self) -> Result<()> {
        self.leader.reset_group()
    }

    /// Reads the counts of all counters in the group.
    pub fn stat(&mut self) -> Result<GroupStat> {
        let expected = self.read_buf.len();
        let got = self.leader.read(&mut self.read_buf)?;
        if got != expected {
            let msg = format!("short read: {} of {} bytes", got, expected);
            return Err(Error::new(ErrorKind::UnexpectedEof, msg));
        }

        let stat = GroupStat::from_bytes(&self.read_buf)?;
        if stat.counts.len() != self.len() {
            let msg = format!("{} counts for a group of {}", stat.counts.len(), self.len());
            return Err(Error::new(ErrorKind::InvalidData, msg));
        }

        Ok(stat)
    }
}
