//! Subscriber handle for a live query.

use super::lock_unpoisoned;
use super::tracker::{Registry, SubscriptionId};
use crate::repo::RepoResult;
use std::sync::mpsc::Receiver;
use std::sync::{Mutex, Weak};
use std::time::Duration;

/// Receiving end of a live query.
///
/// Yields the query result once after subscription and again after every
/// committed change to the tables it reads. Receive methods return `None`
/// when nothing is available (or the database was closed). Dropping the view
/// unsubscribes it.
pub struct QueryView<T> {
    id: SubscriptionId,
    receiver: Receiver<RepoResult<T>>,
    registry: Weak<Mutex<Registry>>,
}

impl<T> QueryView<T> {
    pub(crate) fn new(
        id: SubscriptionId,
        receiver: Receiver<RepoResult<T>>,
        registry: Weak<Mutex<Registry>>,
    ) -> Self {
        Self {
            id,
            receiver,
            registry,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Blocks until the next result, `None` once the database is closed.
    pub fn recv(&self) -> Option<RepoResult<T>> {
        self.receiver.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<RepoResult<T>> {
        self.receiver.recv_timeout(timeout).ok()
    }

    pub fn try_recv(&self) -> Option<RepoResult<T>> {
        self.receiver.try_recv().ok()
    }

    /// Drains every pending result and returns the newest one.
    pub fn latest(&self) -> Option<RepoResult<T>> {
        let mut latest = None;
        while let Ok(result) = self.receiver.try_recv() {
            latest = Some(result);
        }
        latest
    }

    /// Blocking iterator over results until the database is closed.
    pub fn iter(&self) -> impl Iterator<Item = RepoResult<T>> + '_ {
        self.receiver.iter()
    }

    /// Unsubscribes; no further results are delivered.
    pub fn cancel(self) {}
}

impl<T> Drop for QueryView<T> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock_unpoisoned(&registry).remove(self.id);
        }
    }
}
