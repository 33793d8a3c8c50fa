//! Monitor Context - process-wide state, built once in `main`
//!
//! Holds everything the worker, the consumer and the HTTP API share. The
//! transport worker is started at most once per context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::FixedOffset;
use parking_lot::RwLock;
use tokio::sync::watch;

use crate::logic::config::MonitorConfig;
use crate::logic::history::StateHandle;
use crate::logic::model::{self, ClassifierEngine, EngineStatus, ModelStatus};
use crate::logic::persistence::CsvMirror;
use crate::logic::pipeline::Pipeline;
use crate::logic::queue::IngestQueue;
use crate::logic::transport::{CommandPublisher, SubscriptionWorker};

pub struct MonitorContext {
    config: MonitorConfig,
    queue: Arc<IngestQueue>,
    state: StateHandle,
    model_status: RwLock<ModelStatus>,
    engine: RwLock<Option<Arc<ClassifierEngine>>>,
    transport_started: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl MonitorContext {
    pub fn new(config: MonitorConfig) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            queue: Arc::new(IngestQueue::new(config.history.ingest_queue_limit)),
            state: StateHandle::new(config.history.capacity),
            model_status: RwLock::new(ModelStatus::default()),
            engine: RwLock::new(None),
            transport_started: AtomicBool::new(false),
            shutdown,
            config,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<IngestQueue> {
        &self.queue
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    pub fn offset(&self) -> FixedOffset {
        self.config.dashboard.offset()
    }

    // ------------------------------------------------------------------
    // Startup
    // ------------------------------------------------------------------

    /// Load the configured model. A missing model leaves the pipeline
    /// running on edge labels.
    pub fn load_model(&self) {
        let (engine, status) = model::load_configured(&self.config.model);
        *self.engine.write() = engine.map(Arc::new);
        *self.model_status.write() = status;
    }

    pub fn model_status(&self) -> ModelStatus {
        self.model_status.read().clone()
    }

    pub fn engine_status(&self) -> Option<EngineStatus> {
        self.engine.read().as_ref().map(|e| e.status())
    }

    fn mirror(&self) -> Option<CsvMirror> {
        let persistence = &self.config.persistence;
        persistence
            .enabled
            .then(|| CsvMirror::new(persistence.csv_path.clone()))
    }

    /// Seed the history from the CSV mirror, returns the restored count
    pub fn restore_history(&self) -> usize {
        if !self.config.persistence.reload_on_startup {
            return 0;
        }
        let Some(mirror) = self.mirror() else {
            return 0;
        };

        match mirror.load(self.offset()) {
            Ok(records) if records.is_empty() => 0,
            Ok(records) => {
                let restored = self.state.restore(records);
                log::info!("Restored {} records from {}", restored, mirror.path().display());
                restored
            }
            Err(e) => {
                log::warn!("Could not read {}: {}", mirror.path().display(), e);
                0
            }
        }
    }

    /// Pipeline wired to this context's queue, state and tables
    pub fn build_pipeline(&self, publisher: Arc<dyn CommandPublisher>) -> Pipeline {
        Pipeline::new(
            self.queue.clone(),
            self.state.clone(),
            publisher,
            self.config.topics.output.clone(),
        )
        .with_classifier(self.engine.read().clone())
        .with_tables(self.config.edge_labels.clone(), self.config.commands.clone())
        .with_mirror(self.mirror())
        .with_offset(self.offset())
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    /// Start the subscription worker unless it is already running.
    /// Must be called inside a Tokio runtime. Returns true if this call
    /// started it.
    pub fn ensure_transport_started(&self) -> bool {
        self.ensure_started_with(|| {
            let worker = SubscriptionWorker::new(
                &self.config.broker,
                &self.config.topics.sensor,
                self.queue.clone(),
            );
            tokio::spawn(worker.run(self.shutdown_signal()));
        })
    }

    fn ensure_started_with(&self, start: impl FnOnce()) -> bool {
        if self
            .transport_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("Transport already started");
            return false;
        }

        log::info!(
            "Starting transport ({} → '{}')",
            self.config.broker.address(),
            self.config.topics.sensor
        );
        start();
        true
    }

    pub fn transport_started(&self) -> bool {
        self.transport_started.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------------

    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn shutdown(&self) {
        log::info!("Shutdown requested");
        self.shutdown.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::events::IngestEvent;
    use crate::logic::labels::LabelKind;
    use crate::logic::transport::TransportError;
    use std::sync::atomic::AtomicUsize;

    struct NullPublisher;

    impl CommandPublisher for NullPublisher {
        fn publish(&self, _topic: &str, _payload: &str) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn config_in(dir: &std::path::Path) -> MonitorConfig {
        let mut config = MonitorConfig::default();
        config.persistence.csv_path = dir.join("log.csv");
        config.model.model_path = dir.join("model.onnx");
        config.model.metadata_path = dir.join("model.json");
        config
    }

    #[test]
    fn test_transport_starts_once() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = MonitorContext::new(config_in(dir.path()));
        let starts = AtomicUsize::new(0);

        assert!(ctx.ensure_started_with(|| {
            starts.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(!ctx.ensure_started_with(|| {
            starts.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert!(ctx.transport_started());
    }

    #[test]
    fn test_shutdown_signal() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = MonitorContext::new(config_in(dir.path()));
        let rx = ctx.shutdown_signal();
        assert!(!ctx.is_shutting_down());

        ctx.shutdown();
        assert!(ctx.is_shutting_down());
        assert!(*rx.borrow());
    }

    #[test]
    fn test_missing_model_falls_back_to_edge_labels() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = MonitorContext::new(config_in(dir.path()));
        ctx.load_model();
        assert!(!ctx.model_status().loaded);
        assert!(ctx.engine_status().is_none());

        let mut pipeline = ctx.build_pipeline(Arc::new(NullPublisher));
        let payload = br#"{"temperature": 30, "humidity": 70, "light": 100, "label": "Bahaya"}"#;
        ctx.queue().push(IngestEvent::decode("s", payload, chrono::Utc::now()));
        assert!(pipeline.run_once());

        let record = ctx.state().read(|s| s.current.clone()).unwrap();
        assert_eq!(record.label, LabelKind::Unsafe);
        assert_eq!(record.command, "LED_MERAH");
    }

    #[test]
    fn test_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();

        let first = MonitorContext::new(config_in(dir.path()));
        let mut pipeline = first.build_pipeline(Arc::new(NullPublisher));
        for t in [20, 21, 22] {
            let payload = format!(r#"{{"temperature": {}, "label": "aman"}}"#, t);
            first.queue().push(IngestEvent::decode("s", payload.as_bytes(), chrono::Utc::now()));
        }
        assert!(pipeline.run_once());

        let mut config = config_in(dir.path());
        config.history.capacity = 2;
        let second = MonitorContext::new(config);
        assert_eq!(second.restore_history(), 2);

        let temps: Vec<Option<f64>> = second.state().read(|s| s.history.iter().map(|r| r.temperature).collect());
        assert_eq!(temps, vec![Some(21.0), Some(22.0)]);
    }

    #[test]
    fn test_restore_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.persistence.enabled = false;
        std::fs::write(dir.path().join("log.csv"), "ts,temperature\n").unwrap();
        assert_eq!(MonitorContext::new(config).restore_history(), 0);
    }
}
