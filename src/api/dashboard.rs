//! Dashboard views - read-only projections of the monitor state

use chrono::Utc;
use serde::Serialize;

use crate::constants::{CHART_POINTS, TABLE_ROWS, TIMESTAMP_FORMAT};
use crate::logic::context::MonitorContext;
use crate::logic::features::LayoutInfo;
use crate::logic::history::{Delivery, LogRecord, MonitorStats};
use crate::logic::labels::LabelKind;
use crate::logic::model::{EngineStatus, ModelStatus};
use crate::logic::persistence::to_csv_string;
use crate::logic::queue::QueueStats;

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionView {
    /// "connected" | "disconnected" | "connecting"
    pub status: &'static str,
    pub since: Option<String>,
    pub last_error: Option<String>,
    pub last_error_at: Option<String>,
    pub broker: String,
    pub sensor_topic: String,
    pub output_topic: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadingView {
    pub seq: u64,
    pub timestamp: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light: Option<f64>,
    pub raw_light: Option<f64>,
    pub edge_label: Option<String>,
    pub label: LabelKind,
    pub color: &'static str,
    pub raw_prediction: Option<String>,
    pub confidence: Option<f32>,
    pub command: String,
    pub delivery: Delivery,
}

impl From<&LogRecord> for ReadingView {
    fn from(record: &LogRecord) -> Self {
        Self {
            seq: record.seq,
            timestamp: record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            temperature: record.temperature,
            humidity: record.humidity,
            light: record.light,
            raw_light: record.raw_light,
            edge_label: record.edge_label.clone(),
            label: record.label,
            color: record.label.color(),
            raw_prediction: record.raw_prediction.clone(),
            confidence: record.confidence,
            command: record.command.clone(),
            delivery: record.delivery.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartPoint {
    pub timestamp: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light: Option<f64>,
    pub label: LabelKind,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub generated_at: String,
    pub refresh_interval_ms: u64,
    pub connection: ConnectionView,
    pub current: Option<ReadingView>,
    /// Oldest first
    pub chart: Vec<ChartPoint>,
    /// Newest first
    pub recent: Vec<ReadingView>,
    pub history_len: usize,
    pub history_capacity: usize,
    pub stats: MonitorStats,
    pub queue: QueueStats,
    pub model: ModelStatus,
    /// Feature layout the classifier is fed
    pub layout: LayoutInfo,
    pub engine: Option<EngineStatus>,
    pub last_raw: Option<String>,
}

pub fn get_dashboard(ctx: &MonitorContext) -> DashboardSnapshot {
    let config = ctx.config();
    let offset = ctx.offset();
    let fmt = |t: chrono::DateTime<Utc>| t.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string();

    let mut snapshot = ctx.state().read(|s| DashboardSnapshot {
        generated_at: fmt(Utc::now()),
        refresh_interval_ms: config.dashboard.refresh_interval_ms,
        connection: ConnectionView {
            status: match s.connected {
                Some(true) => "connected",
                Some(false) => "disconnected",
                None => "connecting",
            },
            since: s.connection_changed_at.map(fmt),
            last_error: s.last_error.clone(),
            last_error_at: s.last_error_at.map(fmt),
            broker: config.broker.address(),
            sensor_topic: config.topics.sensor.clone(),
            output_topic: config.topics.output.clone(),
        },
        current: s.current.as_ref().map(ReadingView::from),
        chart: s
            .history
            .recent(CHART_POINTS)
            .iter()
            .map(|r| ChartPoint {
                timestamp: r.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                temperature: r.temperature,
                humidity: r.humidity,
                light: r.light,
                label: r.label,
                color: r.label.color(),
            })
            .collect(),
        recent: s.history.recent(TABLE_ROWS).iter().rev().map(ReadingView::from).collect(),
        history_len: s.history.len(),
        history_capacity: s.history.capacity(),
        stats: s.stats,
        queue: QueueStats::default(),
        model: ModelStatus::default(),
        layout: LayoutInfo::current(Default::default()),
        engine: None,
        last_raw: s.last_raw.clone(),
    });

    snapshot.queue = ctx.queue().stats();
    snapshot.model = ctx.model_status();
    snapshot.layout = LayoutInfo::current(snapshot.model.light_scale.unwrap_or_default());
    snapshot.engine = ctx.engine_status();
    snapshot
}

/// Newest first
pub fn get_readings(ctx: &MonitorContext, limit: usize) -> Vec<ReadingView> {
    ctx.state()
        .read(|s| s.history.recent(limit).iter().rev().map(ReadingView::from).collect())
}

pub fn export_csv(ctx: &MonitorContext) -> String {
    ctx.state().read(|s| to_csv_string(s.history.iter()))
}
