//! Subscription registry and background dispatcher.

use super::lock_unpoisoned;
use super::view::QueryView;
use crate::db::{DbResult, Table};
use crate::repo::RepoResult;
use log::{debug, warn};
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, JoinHandle};

const DISPATCHER_THREAD_NAME: &str = "healthstore-notify";

/// Identifier of one live query subscription.
pub type SubscriptionId = u64;

type Runner = Box<dyn FnMut(&Connection) -> Delivery + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Delivered,
    Disconnected,
}

enum Dispatch {
    Refresh(SubscriptionId),
    Invalidate(BTreeSet<Table>),
    Shutdown,
}

struct Subscription {
    tables: BTreeSet<Table>,
    runner: Arc<Mutex<Runner>>,
}

#[derive(Default)]
pub(crate) struct Registry {
    next_id: SubscriptionId,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
}

impl Registry {
    fn insert(&mut self, tables: BTreeSet<Table>, runner: Runner) -> SubscriptionId {
        self.next_id += 1;
        let id = self.next_id;
        self.subscriptions.insert(
            id,
            Subscription {
                tables,
                runner: Arc::new(Mutex::new(runner)),
            },
        );
        id
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    fn runner(&self, id: SubscriptionId) -> Option<Arc<Mutex<Runner>>> {
        self.subscriptions
            .get(&id)
            .map(|subscription| Arc::clone(&subscription.runner))
    }

    fn runners_touching(&self, tables: &BTreeSet<Table>) -> Vec<(SubscriptionId, Arc<Mutex<Runner>>)> {
        self.subscriptions
            .iter()
            .filter(|(_, subscription)| !subscription.tables.is_disjoint(tables))
            .map(|(id, subscription)| (*id, Arc::clone(&subscription.runner)))
            .collect()
    }
}

/// Routes committed table changes to the live queries that read them.
pub struct InvalidationTracker {
    registry: Arc<Mutex<Registry>>,
    dispatch: Sender<Dispatch>,
    worker: Option<JoinHandle<()>>,
}

impl InvalidationTracker {
    /// Starts the dispatcher thread for the connection behind `conn`.
    ///
    /// The dispatcher holds only a weak reference, so it never keeps the
    /// database alive.
    pub(crate) fn start(conn: Weak<Mutex<Connection>>) -> DbResult<Self> {
        let registry = Arc::new(Mutex::new(Registry::default()));
        let (dispatch, receiver) = mpsc::channel();
        let worker_registry = Arc::clone(&registry);
        let worker = thread::Builder::new()
            .name(DISPATCHER_THREAD_NAME.to_string())
            .spawn(move || run_dispatcher(receiver, worker_registry, conn))?;

        Ok(Self {
            registry,
            dispatch,
            worker: Some(worker),
        })
    }

    /// Registers a live query reading `tables`.
    ///
    /// Returns immediately; the first result is produced on the dispatcher
    /// thread. Do not block on the returned view while holding a write scope
    /// of the same database: the dispatcher needs the connection to run the
    /// query.
    pub fn subscribe<T, Q>(&self, tables: &[Table], mut query: Q) -> QueryView<T>
    where
        T: Send + 'static,
        Q: FnMut(&Connection) -> RepoResult<T> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let runner: Runner = Box::new(move |conn: &Connection| {
            if sender.send(query(conn)).is_ok() {
                Delivery::Delivered
            } else {
                Delivery::Disconnected
            }
        });

        let tables = tables.iter().copied().collect::<BTreeSet<_>>();
        let table_list = describe_tables(&tables);
        let id = lock_unpoisoned(&self.registry).insert(tables, runner);
        debug!(
            "event=query_subscribe module=notify status=ok subscription_id={} tables={}",
            id, table_list
        );

        if self.dispatch.send(Dispatch::Refresh(id)).is_err() {
            warn!(
                "event=query_subscribe module=notify status=error subscription_id={} error_code=dispatcher_stopped",
                id
            );
        }

        QueryView::new(id, receiver, Arc::downgrade(&self.registry))
    }

    /// Publishes committed changes to `tables`.
    pub fn notify(&self, tables: BTreeSet<Table>) {
        if tables.is_empty() {
            return;
        }
        debug!(
            "event=tables_invalidated module=notify status=ok tables={}",
            describe_tables(&tables)
        );
        if self.dispatch.send(Dispatch::Invalidate(tables)).is_err() {
            warn!("event=tables_invalidated module=notify status=error error_code=dispatcher_stopped");
        }
    }

    /// Removes a subscription; returns whether it was still registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        lock_unpoisoned(&self.registry).remove(id)
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        lock_unpoisoned(&self.registry).subscriptions.len()
    }
}

impl Drop for InvalidationTracker {
    fn drop(&mut self) {
        let _ = self.dispatch.send(Dispatch::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("event=notify_shutdown module=notify status=error error_code=dispatcher_panicked");
            }
        }
    }
}

fn run_dispatcher(
    receiver: Receiver<Dispatch>,
    registry: Arc<Mutex<Registry>>,
    conn: Weak<Mutex<Connection>>,
) {
    while let Ok(message) = receiver.recv() {
        let targets = match message {
            Dispatch::Shutdown => break,
            Dispatch::Refresh(id) => lock_unpoisoned(&registry)
                .runner(id)
                .map(|runner| vec![(id, runner)])
                .unwrap_or_default(),
            Dispatch::Invalidate(tables) => lock_unpoisoned(&registry).runners_touching(&tables),
        };
        if targets.is_empty() {
            continue;
        }

        let Some(live_conn) = conn.upgrade() else {
            break;
        };

        // Registry lock is never held while waiting on the connection.
        for (id, runner) in targets {
            let delivery = {
                let conn_guard = lock_unpoisoned(&live_conn);
                let mut runner_guard = lock_unpoisoned(&runner);
                let run = &mut *runner_guard;
                run(&*conn_guard)
            };
            if delivery == Delivery::Disconnected && lock_unpoisoned(&registry).remove(id) {
                debug!(
                    "event=query_unsubscribe module=notify status=ok subscription_id={} reason=receiver_dropped",
                    id
                );
            }
        }
    }
    debug!("event=notify_shutdown module=notify status=ok");
}

fn describe_tables(tables: &BTreeSet<Table>) -> String {
    tables
        .iter()
        .map(|table| table.name())
        .collect::<Vec<_>>()
        .join(",")
}
