//! Single-slot handoff between a producer and a consumer thread
//!
//! A [`Feeder`] moves through IDLE -> RESERVED -> RUNNING -> IDLE. The producer
//! reserves the slot and feeds it one value; the consumer, holding the
//! matching [`Monitor`], blocks until the value arrives, processes it and
//! calls `done` to hand the slot back.
//!
//! Listeners run on the thread that caused the transition, after the slot
//! lock is released. A panicking listener is logged and otherwise ignored.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FeederError {
    #[error("feeder is not idle")]
    NotIdle,

    #[error("feeder is not reserved")]
    NotReserved,

    #[error("feeder is not running")]
    NotRunning,

    #[error("no idle feeder in pool")]
    NoIdleFeeder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeederStatus {
    Idle,
    Reserved,
    Running,
}

/// Observer of busy/idle transitions
///
/// Both methods default to doing nothing.
pub trait FeederListener: Send + Sync {
    fn became_busy(&self) {}

    fn became_idle(&self) {}
}

struct SlotState<T> {
    status: FeederStatus,
    value: Option<T>,
}

struct Slot<T> {
    state: Mutex<SlotState<T>>,
    fed: Condvar,
    listeners: Mutex<Vec<Arc<dyn FeederListener>>>,
}

impl<T> Slot<T> {
    fn state(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> Vec<Arc<dyn FeederListener>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Producer side of the slot
pub struct Feeder<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Clone for Feeder<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for Feeder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Feeder<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Slot {
                state: Mutex::new(SlotState {
                    status: FeederStatus::Idle,
                    value: None,
                }),
                fed: Condvar::new(),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Consumer view of this feeder
    pub fn monitor(&self) -> Monitor<T> {
        Monitor {
            slot: Arc::clone(&self.slot),
        }
    }

    pub fn status(&self) -> FeederStatus {
        self.slot.state().status
    }

    pub fn is_idle(&self) -> bool {
        self.status() == FeederStatus::Idle
    }

    pub fn add_listener(&self, listener: Arc<dyn FeederListener>) {
        self.slot
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Claims the slot for the caller
    pub fn reserve(&self) -> Result<(), FeederError> {
        {
            let mut state = self.slot.state();
            if state.status != FeederStatus::Idle {
                return Err(FeederError::NotIdle);
            }
            state.status = FeederStatus::Reserved;
        }
        notify(&self.slot.listeners(), |l| l.became_busy());
        Ok(())
    }

    /// Hands `value` to the consumer of a reserved slot
    ///
    /// The value comes back with the error when the slot was not reserved.
    pub fn feed(&self, value: T) -> Result<(), (FeederError, T)> {
        let mut state = self.slot.state();
        if state.status != FeederStatus::Reserved {
            return Err((FeederError::NotReserved, value));
        }
        state.status = FeederStatus::Running;
        state.value = Some(value);
        self.slot.fed.notify_all();
        Ok(())
    }
}

/// Consumer side of the slot
pub struct Monitor<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Clone for Monitor<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Monitor<T> {
    /// Blocks up to `timeout` for a fed value
    ///
    /// Each fed value is handed out once. The slot stays RUNNING until `done`.
    pub fn wait(&self, timeout: Duration) -> Option<T> {
        let state = self.slot.state();
        let (mut state, _) = self
            .slot
            .fed
            .wait_timeout_while(state, timeout, |s| s.value.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        state.value.take()
    }

    /// Returns the slot to IDLE once the fed value was processed
    pub fn done(&self) -> Result<(), FeederError> {
        {
            let mut state = self.slot.state();
            if state.status != FeederStatus::Running {
                return Err(FeederError::NotRunning);
            }
            state.status = FeederStatus::Idle;
            state.value = None;
        }
        notify(&self.slot.listeners(), |l| l.became_idle());
        Ok(())
    }

    pub fn status(&self) -> FeederStatus {
        self.slot.state().status
    }
}

fn notify(listeners: &[Arc<dyn FeederListener>], event: impl Fn(&dyn FeederListener)) {
    for listener in listeners {
        if catch_unwind(AssertUnwindSafe(|| event(listener.as_ref()))).is_err() {
            error!("Feeder listener panicked");
        }
    }
}

// =============================================================================
// Feeder Pool
// =============================================================================

/// Fixed set of feeders, idle as long as any one of them is
pub struct FeederPool<T> {
    feeders: Vec<Feeder<T>>,
    aggregate: Arc<Aggregate>,
}

/// Tracks the number of idle feeders and re-broadcasts edges of "any idle"
struct Aggregate {
    idle: AtomicUsize,
    listeners: Mutex<Vec<Arc<dyn FeederListener>>>,
}

impl Aggregate {
    fn listeners(&self) -> Vec<Arc<dyn FeederListener>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FeederListener for Aggregate {
    fn became_busy(&self) {
        // Last idle feeder taken
        if self.idle.fetch_sub(1, Ordering::SeqCst) == 1 {
            notify(&self.listeners(), |l| l.became_busy());
        }
    }

    fn became_idle(&self) {
        // First feeder back
        if self.idle.fetch_add(1, Ordering::SeqCst) == 0 {
            notify(&self.listeners(), |l| l.became_idle());
        }
    }
}

impl<T> FeederPool<T> {
    pub fn new(size: usize) -> Self {
        let aggregate = Arc::new(Aggregate {
            idle: AtomicUsize::new(size),
            listeners: Mutex::new(Vec::new()),
        });
        let feeders = (0..size)
            .map(|_| {
                let feeder = Feeder::new();
                feeder.add_listener(Arc::clone(&aggregate) as Arc<dyn FeederListener>);
                feeder
            })
            .collect();
        Self { feeders, aggregate }
    }

    pub fn size(&self) -> usize {
        self.feeders.len()
    }

    /// Reserves the first idle feeder found
    pub fn reserve(&self) -> Result<Feeder<T>, FeederError> {
        self.feeders
            .iter()
            .find(|feeder| feeder.reserve().is_ok())
            .cloned()
            .ok_or(FeederError::NoIdleFeeder)
    }

    pub fn is_idle(&self) -> bool {
        self.feeders.iter().any(Feeder::is_idle)
    }

    pub fn feeders(&self) -> &[Feeder<T>] {
        &self.feeders
    }

    pub fn monitors(&self) -> Vec<Monitor<T>> {
        self.feeders.iter().map(Feeder::monitor).collect()
    }

    /// Listens to the pool turning full (`became_busy`) or regaining capacity
    /// (`became_idle`)
    pub fn add_listener(&self, listener: Arc<dyn FeederListener>) {
        self.aggregate
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[derive(Default)]
    struct Counting {
        busy: AtomicUsize,
        idle: AtomicUsize,
    }

    impl FeederListener for Counting {
        fn became_busy(&self) {
            self.busy.fetch_add(1, Ordering::SeqCst);
        }

        fn became_idle(&self) {
            self.idle.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Panicking;

    impl FeederListener for Panicking {
        fn became_busy(&self) {
            panic!("listener failure");
        }
    }

    #[test]
    fn test_reserve_feed_done_cycle() {
        let feeder = Feeder::new();
        let monitor = feeder.monitor();

        feeder.reserve().unwrap();
        assert_eq!(feeder.reserve(), Err(FeederError::NotIdle));

        feeder.feed(7).unwrap();
        assert_eq!(feeder.status(), FeederStatus::Running);
        assert_eq!(feeder.reserve(), Err(FeederError::NotIdle));

        assert_eq!(monitor.wait(Duration::from_millis(10)), Some(7));
        monitor.done().unwrap();

        assert!(feeder.is_idle());
        feeder.reserve().unwrap();
    }

    #[test]
    fn test_feed_requires_reservation() {
        let feeder = Feeder::new();
        assert_eq!(feeder.feed("x"), Err((FeederError::NotReserved, "x")));

        feeder.reserve().unwrap();
        feeder.feed("x").unwrap();
        assert_eq!(feeder.feed("y"), Err((FeederError::NotReserved, "y")));
    }

    #[test]
    fn test_done_requires_running() {
        let feeder: Feeder<u8> = Feeder::new();
        assert_eq!(feeder.monitor().done(), Err(FeederError::NotRunning));
    }

    #[test]
    fn test_wait_times_out_without_value() {
        let feeder: Feeder<u8> = Feeder::new();
        feeder.reserve().unwrap();
        assert_eq!(feeder.monitor().wait(Duration::from_millis(10)), None);
    }

    #[test]
    fn test_consumer_blocks_until_fed() {
        let feeder = Feeder::new();
        let monitor = feeder.monitor();

        let consumer = thread::spawn(move || {
            let value = monitor.wait(Duration::from_secs(5));
            monitor.done().unwrap();
            value
        });

        thread::sleep(Duration::from_millis(20));
        feeder.reserve().unwrap();
        feeder.feed(42).unwrap();

        assert_eq!(consumer.join().unwrap(), Some(42));
        assert!(feeder.is_idle());
    }

    #[test]
    fn test_listeners_fire_and_panics_are_contained() {
        let feeder = Feeder::new();
        let counting = Arc::new(Counting::default());
        feeder.add_listener(Arc::new(Panicking));
        feeder.add_listener(Arc::clone(&counting) as Arc<dyn FeederListener>);

        feeder.reserve().unwrap();
        feeder.feed(()).unwrap();
        feeder.monitor().done().unwrap();

        assert_eq!(counting.busy.load(Ordering::SeqCst), 1);
        assert_eq!(counting.idle.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pool_idle_tracks_any_free_feeder() {
        let pool: FeederPool<u8> = FeederPool::new(2);
        let monitors = pool.monitors();

        let first = pool.reserve().unwrap();
        assert!(pool.is_idle());
        let second = pool.reserve().unwrap();
        assert!(!pool.is_idle());
        assert!(matches!(pool.reserve(), Err(FeederError::NoIdleFeeder)));

        second.feed(2).unwrap();
        first.feed(1).unwrap();
        assert_eq!(monitors[1].wait(Duration::from_millis(10)), Some(2));
        monitors[1].done().unwrap();

        assert!(pool.is_idle());
        pool.reserve().unwrap();
    }

    #[test]
    fn test_pool_listener_fires_on_aggregate_edges_only() {
        let pool: FeederPool<u8> = FeederPool::new(2);
        let counting = Arc::new(Counting::default());
        pool.add_listener(Arc::clone(&counting) as Arc<dyn FeederListener>);
        let monitors = pool.monitors();

        let a = pool.reserve().unwrap();
        assert_eq!(counting.busy.load(Ordering::SeqCst), 0);
        let b = pool.reserve().unwrap();
        assert_eq!(counting.busy.load(Ordering::SeqCst), 1);

        a.feed(1).unwrap();
        b.feed(2).unwrap();
        monitors[0].wait(Duration::from_millis(10));
        monitors[0].done().unwrap();
        assert_eq!(counting.idle.load(Ordering::SeqCst), 1);
        monitors[1].wait(Duration::from_millis(10));
        monitors[1].done().unwrap();
        assert_eq!(counting.idle.load(Ordering::SeqCst), 1);
    }
}
