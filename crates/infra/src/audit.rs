//! Asynchronous operation-log writer.
//!
//! Request handling never waits on the op-log table. Entries are pushed onto a
//! bounded queue with `try_send`; a single background task drains the queue
//! into an [`OpLogStore`]. A full queue drops the entry and bumps a counter,
//! and a failed write is logged and counted. Neither affects the response.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use schoolmart_core::NewOpLog;

use crate::store::OpLogStore;

/// Audit queue configuration.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Maximum number of entries waiting to be written.
    pub capacity: usize,
    /// Name for logging
    pub name: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            name: "audit-writer".to_string(),
        }
    }
}

impl AuditConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }
}

/// Audit runtime statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct AuditStats {
    pub enqueued: u64,
    pub written: u64,
    pub failed: u64,
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> AuditStats {
        AuditStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Producer side of the queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AuditLog {
    tx: mpsc::Sender<NewOpLog>,
    counters: Arc<Counters>,
}

impl AuditLog {
    /// Start the writer task on the current runtime.
    pub fn spawn(store: Arc<dyn OpLogStore>, config: AuditConfig) -> (AuditLog, AuditWorkerHandle) {
        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let counters = Arc::new(Counters::default());

        info!(name = %config.name, capacity = config.capacity, "audit writer starting");
        let join = tokio::spawn(writer_loop(store, config.name, rx, shutdown_rx, counters.clone()));

        let log = AuditLog {
            tx,
            counters: counters.clone(),
        };
        let handle = AuditWorkerHandle {
            shutdown: Some(shutdown_tx),
            join: Some(join),
            counters,
        };
        (log, handle)
    }

    /// Queue an entry without waiting. Returns `false` if it was dropped.
    pub fn record(&self, entry: NewOpLog) -> bool {
        match self.tx.try_send(entry) {
            Ok(()) => {
                self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(entry)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(module = %entry.module, action = %entry.action, "audit queue full, entry dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(entry)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(module = %entry.module, action = %entry.action, "audit writer stopped, entry dropped");
                false
            }
        }
    }

    pub fn stats(&self) -> AuditStats {
        self.counters.snapshot()
    }
}

/// Handle to control a running writer.
#[derive(Debug)]
pub struct AuditWorkerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl AuditWorkerHandle {
    /// Flush queued entries and stop the writer.
    pub async fn shutdown(mut self) -> AuditStats {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                warn!(error = %e, "audit writer task ended abnormally");
            }
        }
        self.counters.snapshot()
    }
}

async fn writer_loop(
    store: Arc<dyn OpLogStore>,
    name: String,
    mut rx: mpsc::Receiver<NewOpLog>,
    mut shutdown_rx: oneshot::Receiver<()>,
    counters: Arc<Counters>,
) {
    let mut shutdown_armed = true;

    loop {
        tokio::select! {
            biased;

            signal = &mut shutdown_rx, if shutdown_armed => {
                if signal.is_err() {
                    // Handle dropped without a shutdown request; keep serving.
                    shutdown_armed = false;
                    continue;
                }
                rx.close();
                while let Some(entry) = rx.recv().await {
                    write_entry(store.as_ref(), entry, &counters).await;
                }
                break;
            }

            next = rx.recv() => match next {
                Some(entry) => write_entry(store.as_ref(), entry, &counters).await,
                None => break,
            },
        }
    }

    let stats = counters.snapshot();
    info!(
        name = %name,
        written = stats.written,
        failed = stats.failed,
        dropped = stats.dropped,
        "audit writer stopped"
    );
}

async fn write_entry(store: &dyn OpLogStore, entry: NewOpLog, counters: &Counters) {
    let module = entry.module.clone();
    let action = entry.action.clone();
    match store.append_op_log(entry).await {
        Ok(log) => {
            counters.written.fetch_add(1, Ordering::Relaxed);
            debug!(op_log_id = %log.id, module = %module, action = %action, "op log written");
        }
        Err(e) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, module = %module, action = %action, "op log write failed");
        }
    }
}
