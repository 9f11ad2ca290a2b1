//! Authoritative table of active sessions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::RelayError;
use crate::peer::PeerId;
use crate::Result;

/// A directed sender -> receiver sharing relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub sender: PeerId,
    pub receiver: PeerId,
    /// Time since the session was started.
    pub age: Duration,
}

#[derive(Debug)]
struct Entry {
    receiver: PeerId,
    /// Insertion order, used to make reverse lookups deterministic.
    seq: u64,
    started_at: Instant,
}

#[derive(Debug, Default)]
struct Table {
    entries: HashMap<PeerId, Entry>,
    next_seq: u64,
}

impl Table {
    /// Earliest-inserted sender targeting `receiver`.
    fn first_sender_of(&self, receiver: PeerId) -> Option<PeerId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.receiver == receiver)
            .min_by_key(|(_, entry)| entry.seq)
            .map(|(sender, _)| *sender)
    }
}

/// Thread-safe sender -> receiver mapping.
///
/// Every operation takes the same mutex, so operations are serialized
/// relative to each other. The lock is never held across an await point.
#[derive(Debug, Default)]
pub struct SessionDirectory {
    table: Mutex<Table>,
}

impl SessionDirectory {
    /// Create a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Table>> {
        self.table.lock().map_err(|_| RelayError::LockPoisoned)
    }

    /// Insert `sender -> receiver`, failing if the sender already has an entry.
    pub fn create(&self, sender: PeerId, receiver: PeerId) -> Result<()> {
        let mut table = self.lock()?;

        if let Some(existing) = table.entries.get(&sender) {
            return Err(RelayError::AlreadySharing {
                sender,
                receiver: existing.receiver,
            });
        }

        let seq = table.next_seq;
        table.next_seq += 1;
        table.entries.insert(
            sender,
            Entry {
                receiver,
                seq,
                started_at: Instant::now(),
            },
        );
        Ok(())
    }

    /// Receiver the sender is currently sharing with.
    pub fn lookup_by_sender(&self, sender: PeerId) -> Result<Option<PeerId>> {
        let table = self.lock()?;
        Ok(table.entries.get(&sender).map(|entry| entry.receiver))
    }

    /// A sender currently sharing with `receiver`.
    ///
    /// When several senders target the same receiver, the one whose session
    /// was created first is returned.
    pub fn lookup_by_receiver(&self, receiver: PeerId) -> Result<Option<PeerId>> {
        let table = self.lock()?;
        Ok(table.first_sender_of(receiver))
    }

    /// Remove the sender's entry, returning the receiver it pointed to.
    pub fn remove(&self, sender: PeerId) -> Result<Option<PeerId>> {
        let mut table = self.lock()?;
        Ok(table.entries.remove(&sender).map(|entry| entry.receiver))
    }

    /// Reverse lookup and removal under a single lock acquisition.
    ///
    /// Removes only the earliest sender targeting `receiver`.
    pub fn remove_by_receiver(&self, receiver: PeerId) -> Result<Option<PeerId>> {
        let mut table = self.lock()?;
        let sender = table.first_sender_of(receiver);
        if let Some(sender) = sender {
            table.entries.remove(&sender);
        }
        Ok(sender)
    }

    /// Get the number of active sessions.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// List all active sessions in creation order.
    pub fn snapshot(&self) -> Result<Vec<Session>> {
        let table = self.lock()?;
        let mut entries: Vec<_> = table.entries.iter().collect();
        entries.sort_by_key(|(_, entry)| entry.seq);

        Ok(entries
            .into_iter()
            .map(|(sender, entry)| Session {
                sender: *sender,
                receiver: entry.receiver,
                age: entry.started_at.elapsed(),
            })
            .collect())
    }
}
