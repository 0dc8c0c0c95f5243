//! Change notification for live query views.
//!
//! # Responsibility
//! - Track which tables each live query reads.
//! - After a committed write, re-run every affected query on a background
//!   dispatcher thread and deliver the fresh result to its subscriber.
//!
//! # Invariants
//! - Queries run under the connection lock, so every delivered result reflects
//!   a committed state.
//! - Each subscription receives one initial result, then one result per
//!   committed write touching one of its tables.
//! - After a view is cancelled or dropped, nothing more is delivered to it.
//! - No ordering is guaranteed between distinct subscriptions.

use std::sync::{Mutex, MutexGuard, PoisonError};

mod tracker;
mod view;

pub use tracker::{InvalidationTracker, SubscriptionId};
pub use view::QueryView;

/// Locks `mutex`, recovering the guard if a previous holder panicked.
///
/// Connection state stays consistent after a panic because open transactions
/// roll back on drop.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
