//! Serialized access to a [`WorkspaceBuilder`] from many threads.
//!
//! Concurrent `update` calls are queued and applied one at a time in the
//! order they arrived.

use parking_lot::{Condvar, Mutex};

use super::builder::{BuildReport, CancelRegistry, WorkspaceBuilder};
use super::error::WorkspaceError;
use crate::base::Location;

#[derive(Debug, Default)]
struct Tickets {
    next: u64,
    serving: u64,
}

/// A builder shared between threads, with FIFO update ordering.
pub struct SharedWorkspace {
    builder: Mutex<WorkspaceBuilder>,
    tickets: Mutex<Tickets>,
    turn: Condvar,
    cancel: CancelRegistry,
}

/// Hands the turn to the next ticket, even if the update panicked.
struct TurnGuard<'a> {
    tickets: &'a Mutex<Tickets>,
    turn: &'a Condvar,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.tickets.lock().serving += 1;
        self.turn.notify_all();
    }
}

impl SharedWorkspace {
    pub fn new(builder: WorkspaceBuilder) -> Self {
        let cancel = builder.cancel_registry();
        Self {
            builder: Mutex::new(builder),
            tickets: Mutex::new(Tickets::default()),
            turn: Condvar::new(),
            cancel,
        }
    }

    /// Queue an update and wait until it has been applied.
    pub fn update(
        &self,
        changed: Vec<Location>,
        deleted: Vec<Location>,
    ) -> Result<BuildReport, WorkspaceError> {
        let mut tickets = self.tickets.lock();
        let ticket = tickets.next;
        tickets.next += 1;
        while tickets.serving != ticket {
            self.turn.wait(&mut tickets);
        }
        drop(tickets);

        let _guard = TurnGuard {
            tickets: &self.tickets,
            turn: &self.turn,
        };
        tracing::trace!("[BUILD] applying queued update #{}", ticket);
        self.builder.lock().update(changed, deleted)
    }

    /// Run `f` against the builder once no update is being applied.
    pub fn with_builder<R>(&self, f: impl FnOnce(&WorkspaceBuilder) -> R) -> R {
        f(&self.builder.lock())
    }

    /// Cancellation handles; usable while an update is running.
    pub fn cancel_registry(&self) -> &CancelRegistry {
        &self.cancel
    }

    pub fn into_inner(self) -> WorkspaceBuilder {
        self.builder.into_inner()
    }
}
