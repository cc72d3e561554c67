//! Time-boxed work budgets.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Source of scheduler ticks.
pub trait Clock {
    /// Monotonic tick count.
    fn now_ticks(&self) -> u64;
}

/// Wall clock in milliseconds since construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ticks(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    ticks: Cell<u64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ticks: u64) {
        self.ticks.set(self.ticks.get() + ticks);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.get()
    }
}

impl Clock for ManualClock {
    fn now_ticks(&self) -> u64 {
        self.ticks.get()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now_ticks(&self) -> u64 {
        (**self).now_ticks()
    }
}

/// How often the yield check runs, in polls of [`WorkBudget::is_expired`].
pub const DEFAULT_YIELD_POLL_INTERVAL: u32 = 16;

/// "May I keep working" oracle for one slice of scanning.
///
/// A budget expires when the ticks elapsed since [`start`](Self::start)
/// reach the limit, or when the injected yield check reports that the host
/// has something more urgent to do. Once expired it stays expired until the
/// next `start`.
pub struct WorkBudget<'a> {
    clock: &'a dyn Clock,
    should_yield: Option<Box<dyn FnMut() -> bool + 'a>>,
    yield_interval: u32,
    started_at: u64,
    limit: Option<u64>,
    expired: bool,
    polls: u32,
}

impl<'a> WorkBudget<'a> {
    /// An unbounded budget reading `clock`. Call [`start`](Self::start) to
    /// bound it.
    pub fn new(clock: &'a dyn Clock) -> Self {
        Self {
            clock,
            should_yield: None,
            yield_interval: DEFAULT_YIELD_POLL_INTERVAL,
            started_at: clock.now_ticks(),
            limit: None,
            expired: false,
            polls: 0,
        }
    }

    /// Expire early whenever `check` returns true.
    pub fn with_yield_check(mut self, check: impl FnMut() -> bool + 'a) -> Self {
        self.should_yield = Some(Box::new(check));
        self
    }

    /// Run the yield check every `interval` polls instead of the default.
    pub fn with_yield_interval(mut self, interval: u32) -> Self {
        self.yield_interval = interval.max(1);
        self
    }

    /// Begin a new slice of `ticks`.
    pub fn start(&mut self, ticks: u64) {
        self.reset(Some(ticks));
    }

    /// Begin a slice that only the yield check can end.
    pub fn start_unbounded(&mut self) {
        self.reset(None);
    }

    fn reset(&mut self, limit: Option<u64>) {
        self.started_at = self.clock.now_ticks();
        self.limit = limit;
        self.expired = false;
        self.polls = 0;
    }

    /// Whether work should stop now.
    pub fn is_expired(&mut self) -> bool {
        if self.expired {
            return true;
        }
        if let Some(limit) = self.limit {
            if self.elapsed() >= limit {
                self.expired = true;
                return true;
            }
        }
        let poll = self.polls;
        self.polls = self.polls.wrapping_add(1);
        if poll % self.yield_interval == 0 {
            if let Some(check) = self.should_yield.as_mut() {
                if check() {
                    self.expired = true;
                }
            }
        }
        self.expired
    }

    /// Current tick count of the underlying clock.
    pub fn now(&self) -> u64 {
        self.clock.now_ticks()
    }

    /// Ticks since the slice started.
    pub fn elapsed(&self) -> u64 {
        self.now().saturating_sub(self.started_at)
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }
}

impl std::fmt::Debug for WorkBudget<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkBudget")
            .field("started_at", &self.started_at)
            .field("limit", &self.limit)
            .field("expired", &self.expired)
            .finish()
    }
}
