//! This module contains the cooperative cancellation of an exploration.
//!
//! # Polling
//!
//! The generator cannot be interrupted while it waits on the decision
//! procedure. Instead, it counts the feasibility queries it makes and polls
//! the watchdog every [`Watchdog::poll_every`] queries. When the watchdog
//! asks it to stop, the step in progress is abandoned with
//! [`crate::error::execution::Error::StoppedByWatchdog`] and no successor
//! states are produced for it.
//!
//! A decision procedure that can hang should enforce its own timeout, which
//! surfaces as an ordinary decision procedure failure.

use std::{
    fmt::Debug,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::constant::DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS;

/// A dynamically dispatched [`Watchdog`] instance.
pub type DynWatchdog = Rc<dyn Watchdog>;

/// The interface to an object that can be polled to see if the generator
/// needs to abandon the exploration.
pub trait Watchdog
where
    Self: Debug,
{
    /// Checks if the generator should stop and return an error.
    #[must_use]
    fn should_stop(&self) -> bool;

    /// Gets the number of feasibility queries the generator should make
    /// between two polls.
    #[must_use]
    fn poll_every(&self) -> usize;
}

/// A watchdog that never stops the generator.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LazyWatchdog;

impl LazyWatchdog {
    /// Wraps `self` into an [`Rc`].
    #[must_use]
    pub fn in_rc(self) -> DynWatchdog {
        Rc::new(self)
    }
}

impl Watchdog for LazyWatchdog {
    fn should_stop(&self) -> bool {
        false
    }

    fn poll_every(&self) -> usize {
        usize::MAX
    }
}

/// A watchdog that stops the generator once a shared flag is raised, for
/// instance by another thread enforcing a time budget.
///
/// By default, the generator polls it every
/// [`DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS`] queries. This is configurable by
/// calling [`Self::polling_every`].
#[derive(Clone, Debug)]
pub struct FlagWatchdog {
    /// The flag that is raised externally to stop the generator.
    flag: Arc<AtomicBool>,

    /// The number of queries between two polls.
    poll_every: usize,
}

impl FlagWatchdog {
    /// Constructs a new `FlagWatchdog` wrapping the provided `flag`.
    #[must_use]
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        let poll_every = DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS;
        Self { flag, poll_every }
    }

    /// Sets the number of feasibility queries between two polls. Zero is
    /// treated as one.
    #[must_use]
    pub fn polling_every(mut self, queries: usize) -> Self {
        self.poll_every = queries.max(1);
        self
    }

    /// Wraps the watchdog into an [`Rc`].
    #[must_use]
    pub fn in_rc(self) -> DynWatchdog {
        Rc::new(self)
    }
}

impl Watchdog for FlagWatchdog {
    fn should_stop(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn poll_every(&self) -> usize {
        self.poll_every
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use crate::watchdog::{FlagWatchdog, LazyWatchdog, Watchdog};

    #[test]
    fn lazy_watchdog_never_stops() {
        let watchdog = LazyWatchdog.in_rc();
        assert!(!watchdog.should_stop());
    }

    #[test]
    fn flag_watchdog_follows_its_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let watchdog = FlagWatchdog::new(flag.clone()).polling_every(0);
        assert_eq!(watchdog.poll_every(), 1);
        assert!(!watchdog.should_stop());

        flag.store(true, Ordering::Relaxed);
        assert!(watchdog.should_stop());
    }
}
