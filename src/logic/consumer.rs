//! Consumer Loop - drives the pipeline on its own thread
//!
//! Every refresh interval: drain the queue through the pipeline, then log
//! a one-line summary of the newest record.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::logic::context::MonitorContext;
use crate::logic::history::{Delivery, LogRecord};
use crate::logic::pipeline::Pipeline;

const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

pub fn start(ctx: Arc<MonitorContext>, mut pipeline: Pipeline) -> std::io::Result<JoinHandle<()>> {
    let interval = ctx.config().dashboard.refresh_interval();

    thread::Builder::new()
        .name("envmon-consumer".to_string())
        .spawn(move || {
            log::info!("Consumer loop started (every {} ms)", interval.as_millis());

            while !ctx.is_shutting_down() {
                tick(&ctx, &mut pipeline);
                sleep_until_next(&ctx, interval);
            }

            // Flush whatever arrived before shutdown
            tick(&ctx, &mut pipeline);
            log::info!("Consumer loop stopped");
        })
}

fn tick(ctx: &MonitorContext, pipeline: &mut Pipeline) {
    if pipeline.run_once() {
        if let Some(record) = ctx.state().read(|s| s.current.clone()) {
            log::info!("{}", render_summary(&record));
        }
    }
}

fn sleep_until_next(ctx: &MonitorContext, interval: Duration) {
    let deadline = Instant::now() + interval;
    while !ctx.is_shutting_down() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(SHUTDOWN_POLL.min(deadline - now));
    }
}

fn cell(value: Option<f64>, unit: &str) -> String {
    value
        .map(|v| format!("{:.1}{}", v, unit))
        .unwrap_or_else(|| "-".to_string())
}

/// e.g. `#12 12:00:01 T=29.5°C H=71.0% L=3000.0 -> unsafe (91%) cmd=LED_MERAH`
pub fn render_summary(record: &LogRecord) -> String {
    let confidence = record
        .confidence
        .map(|c| format!(" ({:.0}%)", c * 100.0))
        .unwrap_or_default();

    let delivery = match &record.delivery {
        Delivery::Sent => String::new(),
        Delivery::Failed { reason } => format!(" [not sent: {}]", reason),
        Delivery::Restored => " [restored]".to_string(),
    };

    format!(
        "#{} {} T={} H={} L={} -> {}{} cmd={}{}",
        record.seq,
        record.timestamp.format("%H:%M:%S"),
        cell(record.temperature, "°C"),
        cell(record.humidity, "%"),
        cell(record.light, ""),
        record.label,
        confidence,
        record.command,
        delivery
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::labels::LabelKind;
    use chrono::{FixedOffset, TimeZone};

    fn record() -> LogRecord {
        LogRecord {
            seq: 12,
            timestamp: FixedOffset::east_opt(7 * 3600)
                .unwrap()
                .with_ymd_and_hms(2024, 5, 1, 12, 0, 1)
                .unwrap(),
            temperature: Some(29.5),
            humidity: Some(71.0),
            light: Some(3000.0),
            raw_light: None,
            edge_label: None,
            label: LabelKind::Unsafe,
            raw_prediction: Some("1".to_string()),
            confidence: Some(0.91),
            command: "LED_MERAH".to_string(),
            delivery: Delivery::Sent,
        }
    }

    #[test]
    fn test_render_summary() {
        assert_eq!(
            render_summary(&record()),
            "#12 12:00:01 T=29.5°C H=71.0% L=3000.0 -> unsafe (91%) cmd=LED_MERAH"
        );
    }

    #[test]
    fn test_render_missing_and_failed() {
        let mut r = record();
        r.humidity = None;
        r.confidence = None;
        r.label = LabelKind::Unavailable;
        r.delivery = Delivery::Failed {
            reason: "not connected to broker".to_string(),
        };
        assert_eq!(
            render_summary(&r),
            "#12 12:00:01 T=29.5°C H=- L=3000.0 -> unavailable cmd=LED_MERAH [not sent: not connected to broker]"
        );
    }
}
