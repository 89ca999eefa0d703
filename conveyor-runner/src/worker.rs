//! Single-slot worker loop
//!
//! A worker owns one feeder slot. `submit` claims the slot and feeds it; the
//! thread running `run` picks the item up, processes it and frees the slot.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error};

use crate::feeder::{Feeder, Monitor};

/// An item handed to a worker, with the reason it was submitted
pub struct Submission<P> {
    pub item: P,
    pub reason: String,
}

/// Processing function shared by the workers of a pool
pub type ProcessFn<P> = Arc<dyn Fn(P, &str) -> anyhow::Result<()> + Send + Sync>;

pub struct Worker<P> {
    name: String,
    feeder: Feeder<Submission<P>>,
    monitor: Monitor<Submission<P>>,
    process: ProcessFn<P>,
    wait_timeout: Duration,
    running: AtomicBool,
}

impl<P> Worker<P> {
    pub fn new(
        name: impl Into<String>,
        feeder: Feeder<Submission<P>>,
        process: ProcessFn<P>,
        wait_timeout: Duration,
    ) -> Self {
        let monitor = feeder.monitor();
        Self {
            name: name.into(),
            feeder,
            monitor,
            process,
            wait_timeout,
            running: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_idle(&self) -> bool {
        self.feeder.is_idle()
    }

    /// Hands `item` to this worker
    ///
    /// Gives the item back when the worker is already busy.
    pub fn submit(&self, item: P, reason: impl Into<String>) -> Result<(), P> {
        if self.feeder.reserve().is_err() {
            return Err(item);
        }
        let submission = Submission {
            item,
            reason: reason.into(),
        };
        self.feeder
            .feed(submission)
            .map_err(|(_, submission)| submission.item)
    }

    /// Processes submissions until `stop` is called
    ///
    /// Blocks at most `wait_timeout` at a time so that a stop request is seen
    /// promptly. An item already handed over when the stop arrives is still
    /// processed.
    pub fn run(&self) {
        debug!("Worker {} started", self.name);

        while self.running.load(Ordering::SeqCst) {
            if let Some(submission) = self.monitor.wait(self.wait_timeout) {
                self.handle(submission);
            }
        }

        if let Some(submission) = self.monitor.wait(Duration::ZERO) {
            self.handle(submission);
        }

        debug!("Worker {} stopped", self.name);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn handle(&self, submission: Submission<P>) {
        let Submission { item, reason } = submission;

        match catch_unwind(AssertUnwindSafe(|| (self.process)(item, &reason))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Worker {} failed processing ({}): {:#}", self.name, reason, e),
            Err(_) => error!("Worker {} panicked processing ({})", self.name, reason),
        }

        if let Err(e) = self.monitor.done() {
            error!("Worker {} could not free its slot: {}", self.name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::mpsc;
    use std::thread;

    fn worker_with<F>(process: F) -> Arc<Worker<u32>>
    where
        F: Fn(u32, &str) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Arc::new(Worker::new(
            "test-worker",
            Feeder::new(),
            Arc::new(process),
            Duration::from_millis(10),
        ))
    }

    #[test]
    fn test_submit_is_refused_while_busy() {
        let worker = worker_with(|_, _| Ok(()));

        assert!(worker.submit(1, "first").is_ok());
        assert_eq!(worker.submit(2, "second"), Err(2));
        assert!(!worker.is_idle());
    }

    #[test]
    fn test_run_processes_items_in_turn() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let (tx, rx) = mpsc::channel();
        let worker = worker_with(move |item, reason| {
            sink.lock().unwrap().push((item, reason.to_string()));
            tx.send(()).unwrap();
            Ok(())
        });

        let runner = Arc::clone(&worker);
        let handle = thread::spawn(move || runner.run());

        worker.submit(1, "a").unwrap();
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        while !worker.is_idle() {
            thread::sleep(Duration::from_millis(1));
        }
        worker.submit(2, "b").unwrap();
        rx.recv_timeout(Duration::from_secs(2)).unwrap();

        worker.stop();
        handle.join().unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(1, "a".to_string()), (2, "b".to_string())]
        );
        assert!(worker.is_idle());
    }

    #[test]
    fn test_failures_do_not_kill_the_loop() {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let worker = worker_with(move |item, _| {
            tx.lock().unwrap().send(item).unwrap();
            match item {
                1 => anyhow::bail!("boom"),
                2 => panic!("worse"),
                _ => Ok(()),
            }
        });

        let runner = Arc::clone(&worker);
        let handle = thread::spawn(move || runner.run());

        for item in 1..=3 {
            while worker.submit(item, "retry").is_err() {
                thread::sleep(Duration::from_millis(1));
            }
            assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), item);
        }

        worker.stop();
        handle.join().unwrap();
    }

    #[test]
    fn test_item_fed_before_stop_is_processed() {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let worker = worker_with(move |item, _| {
            tx.lock().unwrap().send(item).unwrap();
            Ok(())
        });

        worker.submit(9, "late").unwrap();
        worker.stop();
        worker.run();

        assert_eq!(rx.try_recv(), Ok(9));
        assert!(worker.is_idle());
    }
}
