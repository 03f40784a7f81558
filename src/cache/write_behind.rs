//! Write-behind queue for the disk tier.
//!
//! Producers append to an unbounded FIFO and return immediately. A single
//! worker thread drains it. When the queue has been empty for a whole idle
//! timeout the worker exits, and the next `enqueue` spawns a fresh one.
//!
//! The worker's exit decision and the producers' respawn check happen under
//! the same lock, so an item is never stranded between an exiting worker
//! and a producer that saw it still running.
//!
//! Each job carries the store's clear epoch from when it was produced; jobs
//! from before a `clear_all` are discarded instead of written.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use super::CacheStore;
use crate::artwork::{CacheKey, CachedImage};

/// Counters for observing the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteBehindStats {
    /// Items written to disk
    pub written: u64,
    /// Items whose write failed
    pub failed: u64,
    /// Items dropped because the cache was cleared after they were queued
    pub discarded: u64,
    /// Workers started over the queue's lifetime
    pub workers_spawned: u64,
}

struct WriteJob {
    key: CacheKey,
    image: Arc<CachedImage>,
    epoch: u64,
}

struct Shared {
    store: Arc<CacheStore>,
    tx: Sender<WriteJob>,
    rx: Receiver<WriteJob>,
    idle_timeout: Duration,
    worker_running: Mutex<bool>,
    enqueued: AtomicU64,
    written: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
    workers_spawned: AtomicU64,
}

/// Asynchronous, single-worker disk persistence.
#[derive(Clone)]
pub struct WriteBehindQueue {
    shared: Arc<Shared>,
}

impl WriteBehindQueue {
    pub fn new(store: Arc<CacheStore>, idle_timeout: Duration) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            shared: Arc::new(Shared {
                store,
                tx,
                rx,
                idle_timeout,
                worker_running: Mutex::new(false),
                enqueued: AtomicU64::new(0),
                written: AtomicU64::new(0),
                failed: AtomicU64::new(0),
                discarded: AtomicU64::new(0),
                workers_spawned: AtomicU64::new(0),
            }),
        }
    }

    /// Queue an image for disk persistence. Never blocks on I/O.
    ///
    /// The same key enqueued twice is written twice; the last write wins.
    pub fn enqueue(&self, key: CacheKey, image: Arc<CachedImage>) {
        let epoch = self.shared.store.epoch();
        self.enqueue_at(epoch, key, image);
    }

    /// Queue an image produced during clear epoch `epoch`.
    pub fn enqueue_at(&self, epoch: u64, key: CacheKey, image: Arc<CachedImage>) {
        self.shared.enqueued.fetch_add(1, Ordering::Relaxed);
        // Cannot fail: `shared` owns the receiver
        let _ = self.shared.tx.send(WriteJob { key, image, epoch });
        self.ensure_worker();
    }

    fn ensure_worker(&self) {
        let mut running = self.shared.worker_running.lock();
        if *running {
            return;
        }

        let shared = self.shared.clone();
        match thread::Builder::new()
            .name("artwork-write-behind".to_string())
            .spawn(move || run_worker(shared))
        {
            Ok(_) => {
                *running = true;
                self.shared.workers_spawned.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Started write-behind worker");
            }
            Err(e) => {
                // Items stay queued; the next enqueue retries the spawn
                tracing::warn!("Failed to start write-behind worker: {}", e);
            }
        }
    }

    /// Items waiting to be written.
    pub fn pending(&self) -> usize {
        self.shared.rx.len()
    }

    pub fn is_worker_running(&self) -> bool {
        *self.shared.worker_running.lock()
    }

    /// Block until every queued item has been written, failed or been
    /// discarded.
    ///
    /// Returns false if `timeout` passes first. Used before process exit,
    /// since the worker thread does not keep the process alive.
    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let stats = self.stats();
            if stats.written + stats.failed + stats.discarded >= self.shared.enqueued.load(Ordering::Relaxed) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    pub fn stats(&self) -> WriteBehindStats {
        WriteBehindStats {
            written: self.shared.written.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
            discarded: self.shared.discarded.load(Ordering::Relaxed),
            workers_spawned: self.shared.workers_spawned.load(Ordering::Relaxed),
        }
    }
}

fn run_worker(shared: Arc<Shared>) {
    loop {
        match shared.rx.recv_timeout(shared.idle_timeout) {
            Ok(job) => write(&shared, job),
            Err(RecvTimeoutError::Timeout) => {
                let mut running = shared.worker_running.lock();
                if shared.rx.is_empty() {
                    *running = false;
                    tracing::debug!("Write-behind worker idle, exiting");
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                *shared.worker_running.lock() = false;
                return;
            }
        }
    }
}

fn write(shared: &Shared, job: WriteJob) {
    match shared.store.persist_at(job.epoch, &job.key, &job.image) {
        Ok(true) => {
            shared.written.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %job.key, "Persisted artwork to disk");
        }
        Ok(false) => {
            shared.discarded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %job.key, "Cache cleared since queued, skipping write");
        }
        Err(e) => {
            shared.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(key = %job.key, "Disk write failed: {}", e);
        }
    }
}
