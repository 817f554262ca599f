//! A bounded, timestamped history of a value over time.
//!
//! [`StatusSchedule<T>`] is the building block underneath every admin/
//! operational status in this crate (EVSE, station) plus any other
//! entity property that's tracked as "what was it at instant X" rather than
//! just "what is it now". It keeps a capped, newest-first list of
//! [`Timestamped`] values and fires a change callback in-line whenever the
//! *current* value (the newest entry at-or-before now) changes.

use crate::time::Timestamped;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// How [`StatusSchedule::insert_bulk`] combines incoming entries with the
/// schedule's existing history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    /// Merge the incoming entries into the existing history.
    Insert,
    /// Discard the existing history first, then insert.
    Replace,
}

type ChangeHandler<T> = Arc<dyn Fn(DateTime<Utc>, T, T) + Send + Sync>;

struct Inner<T> {
    /// Newest-first. Never longer than `max_size`.
    entries: Vec<Timestamped<T>>,
    max_size: usize,
    on_changed: Vec<ChangeHandler<T>>,
}

/// A bounded, newest-first history of timestamped values of `T`, with
/// change notification.
///
/// A single lock covers the whole read-modify-fire sequence of every
/// mutator: change handlers run synchronously, still inside the lock. A
/// handler that calls back into the *same* schedule instance will deadlock;
/// this is a documented invariant, not something this type enforces.
pub struct StatusSchedule<T: Clone + PartialEq + Default + Send + Sync + 'static> {
    inner: Mutex<Inner<T>>,
}

impl<T: Clone + PartialEq + Default + Send + Sync + 'static> StatusSchedule<T> {
    /// Build an empty schedule retaining at most `max_size` entries.
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: Vec::new(),
                max_size: max_size.max(1),
                on_changed: Vec::new(),
            }),
        }
    }

    /// Register a handler invoked whenever [`current`](Self::current) changes.
    ///
    /// Handlers are expected to be infallible and are run synchronously,
    /// in the order they were registered, while the schedule's internal
    /// lock is held.
    pub fn on_status_changed(&self, handler: impl Fn(DateTime<Utc>, T, T) + Send + Sync + 'static) {
        self.inner.lock().on_changed.push(Arc::new(handler));
    }

    /// Insert `value` as effective from now.
    pub fn insert(&self, value: T) {
        self.insert_at(value, crate::now());
    }

    /// Insert `value` as effective from `instant`.
    ///
    /// A no-op if the newest existing entry already holds an equal value
    /// (regardless of `instant`) — this is what keeps mirrored schedules
    /// (e.g. a remote EVSE echoing its local twin) from looping forever.
    /// Otherwise, any existing entry at exactly `instant` is replaced, the
    /// history is re-sorted newest-first and truncated to `max_size`, and
    /// [`current`](Self::current) is recomputed; if it changed, every
    /// registered handler fires exactly once with `(now, old, new)`.
    pub fn insert_at(&self, value: T, instant: DateTime<Utc>) {
        let mut guard = self.inner.lock();

        if let Some(newest) = guard.entries.first() {
            if newest.value == value {
                return;
            }
        }

        let now = crate::now();
        let old_current = compute_current(&guard.entries, now);

        guard.entries.retain(|e| e.instant != instant);
        guard.entries.push(Timestamped::new(instant, value));
        guard.entries.sort_by(|a, b| b.instant.cmp(&a.instant));
        let max_size = guard.max_size;
        guard.entries.truncate(max_size);

        let new_current = compute_current(&guard.entries, crate::now());
        if new_current.value != old_current.value {
            for handler in guard.on_changed.iter() {
                handler(now, old_current.value.clone(), new_current.value.clone());
            }
        }
    }

    /// Insert many entries at once.
    ///
    /// Entries sharing an `instant` are de-duplicated, the later occurrence
    /// in `values` winning over both earlier occurrences and any existing
    /// entry at that same instant. The change check compares the
    /// pre-existing [`current`](Self::current) against the post-merge one,
    /// so only a single transition is ever reported regardless of how many
    /// entries were bulk-inserted.
    pub fn insert_bulk(&self, values: Vec<Timestamped<T>>, mode: InsertMode) {
        if values.is_empty() && mode == InsertMode::Insert {
            return;
        }

        let mut guard = self.inner.lock();
        let now = crate::now();
        let old_current = compute_current(&guard.entries, now);

        if mode == InsertMode::Replace {
            guard.entries.clear();
        }

        let mut deduped: Vec<Timestamped<T>> = Vec::with_capacity(values.len());
        for v in values {
            deduped.retain(|e: &Timestamped<T>| e.instant != v.instant);
            deduped.push(v);
        }

        guard
            .entries
            .retain(|e| !deduped.iter().any(|d| d.instant == e.instant));
        guard.entries.extend(deduped);
        guard.entries.sort_by(|a, b| b.instant.cmp(&a.instant));
        let max_size = guard.max_size;
        guard.entries.truncate(max_size);

        let new_current = compute_current(&guard.entries, crate::now());
        if new_current.value != old_current.value {
            for handler in guard.on_changed.iter() {
                handler(now, old_current.value.clone(), new_current.value.clone());
            }
        }
    }

    /// The newest entry at-or-before now, or a synthetic `(now, T::default())`
    /// entry if the schedule is empty or every entry lies in the future.
    pub fn current(&self) -> Timestamped<T> {
        let guard = self.inner.lock();
        compute_current(&guard.entries, crate::now())
    }

    /// Shorthand for `self.current().value`.
    pub fn current_value(&self) -> T {
        self.current().value
    }

    /// The soonest entry still in the future, if any.
    pub fn next(&self) -> Option<Timestamped<T>> {
        let guard = self.inner.lock();
        compute_next(&guard.entries, crate::now())
    }

    /// A newest-first snapshot of the whole retained history.
    pub fn entries(&self) -> Vec<Timestamped<T>> {
        self.inner.lock().entries.clone()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.inner.lock().max_size
    }
}

/// Replace the whole history with a single synthetic entry stamped at
/// `instant`, as used for admin-status masking (SPEC_FULL.md §3/§4.4).
///
/// Bypasses the equal-value no-op check in [`insert_at`](StatusSchedule::insert_at):
/// masking always wants a fresh single entry even if it repeats the
/// previously-masked value, since the stamped instant itself is the signal
/// (e.g. "out of service as of the admin-status change").
impl<T: Clone + PartialEq + Default + Send + Sync + 'static> StatusSchedule<T> {
    pub fn reset_to(&self, value: T, instant: DateTime<Utc>) {
        let mut guard = self.inner.lock();
        let now = crate::now();
        let old_current = compute_current(&guard.entries, now);

        guard.entries.clear();
        guard.entries.push(Timestamped::new(instant, value));

        let new_current = compute_current(&guard.entries, crate::now());
        if new_current.value != old_current.value {
            for handler in guard.on_changed.iter() {
                handler(now, old_current.value.clone(), new_current.value.clone());
            }
        }
    }
}

fn compute_current<T: Clone + Default>(entries: &[Timestamped<T>], now: DateTime<Utc>) -> Timestamped<T> {
    entries
        .iter()
        .find(|e| e.instant <= now)
        .cloned()
        .unwrap_or_else(|| Timestamped::new(now, T::default()))
}

fn compute_next<T: Clone>(entries: &[Timestamped<T>], now: DateTime<Utc>) -> Option<Timestamped<T>> {
    let mut soonest: Option<&Timestamped<T>> = None;
    for e in entries {
        if e.instant > now {
            soonest = Some(e);
        } else {
            break;
        }
    }
    soonest.cloned()
}
