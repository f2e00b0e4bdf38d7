//! Placement of trace records on a test-long timeline bar.
//!
//! Two regimes exist and are intentionally not merged:
//!
//! - timestamped: every record carries a start time, so each span is placed
//!   at its real offset within `[earliest start, latest end]`;
//! - sequential: without start times nothing is known about overlap or
//!   ordering gaps, so every span starts at 0 and its length is the record's
//!   share of the summed elapsed time.

use std::borrow::Borrow;

use chrono::DateTime;
use chrono::NaiveDateTime;
use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::trace::TraceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingRegime {
    Timestamped,
    Sequential,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineWindow {
    pub regime: TimingRegime,
    /// Earliest record start; `None` in the sequential regime.
    pub start: Option<DateTime<Utc>>,
    pub duration_ms: f64,
}

/// Fill of one record's bar. Values are not clamped to `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineSpan {
    pub start_percent: f64,
    pub end_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub window: TimelineWindow,
    /// One span per input record, same order.
    pub spans: Vec<TimelineSpan>,
}

pub fn normalize<R: Borrow<TraceRecord>>(records: &[R]) -> Timeline {
    let starts: Option<Vec<DateTime<Utc>>> = records
        .iter()
        .map(|record| record.borrow().start.as_deref().and_then(parse_timestamp))
        .collect();

    let timeline = match starts {
        Some(starts) if !starts.is_empty() => timestamped(records, &starts),
        _ => sequential(records),
    };
    debug!(
        "timeline over {} records: {:?} window of {}ms",
        records.len(),
        timeline.window.regime,
        timeline.window.duration_ms
    );
    timeline
}

fn timestamped<R: Borrow<TraceRecord>>(records: &[R], starts: &[DateTime<Utc>]) -> Timeline {
    let window_start = starts.iter().min().copied();

    let bounds: Vec<(f64, f64)> = records
        .iter()
        .zip(starts)
        .map(|(record, start)| {
            let offset = window_start.map_or(0.0, |origin| millis_between(origin, *start));
            (offset, offset + record.borrow().elapsed_ms)
        })
        .collect();
    let duration_ms = bounds.iter().map(|(_, end)| *end).fold(0.0, f64::max);

    Timeline {
        window: TimelineWindow {
            regime: TimingRegime::Timestamped,
            start: window_start,
            duration_ms,
        },
        spans: bounds
            .into_iter()
            .map(|(start, end)| TimelineSpan {
                start_percent: percent_of(start, duration_ms),
                end_percent: percent_of(end, duration_ms),
            })
            .collect(),
    }
}

fn sequential<R: Borrow<TraceRecord>>(records: &[R]) -> Timeline {
    let duration_ms: f64 = records.iter().map(|record| record.borrow().elapsed_ms).sum();

    Timeline {
        window: TimelineWindow {
            regime: TimingRegime::Sequential,
            start: None,
            duration_ms,
        },
        spans: records
            .iter()
            .map(|record| TimelineSpan {
                start_percent: 0.0,
                end_percent: percent_of(record.borrow().elapsed_ms, duration_ms),
            })
            .collect(),
    }
}

fn percent_of(value_ms: f64, duration_ms: f64) -> f64 {
    if duration_ms > 0.0 {
        value_ms / duration_ms * 100.0
    } else {
        0.0
    }
}

fn millis_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    delta
        .num_microseconds()
        .map_or(delta.num_milliseconds() as f64, |micros| micros as f64 / 1000.0)
}

/// RFC 3339 timestamps; a date-time without an offset is read as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(elapsed: f64, start: Option<&str>) -> TraceRecord {
        let mut value = json!({
            "type": "request",
            "file": "a.ts",
            "testTitlePath": ["a"],
            "result": "success",
            "elapsed": elapsed,
            "request": { "method": "GET", "url": "http://localhost/" },
        });
        if let Some(start) = start {
            value["start"] = json!(start);
        }
        serde_json::from_value(value).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 0.01,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn timestamped_offsets() {
        let records = vec![
            record(100.0, Some("2024-03-01T10:00:00.000Z")),
            record(100.0, Some("2024-03-01T10:00:00.050Z")),
        ];
        let timeline = normalize(&records);

        assert_eq!(timeline.window.regime, TimingRegime::Timestamped);
        assert_close(timeline.window.duration_ms, 150.0);
        assert_eq!(timeline.window.start, parse_timestamp("2024-03-01T10:00:00Z"));
        assert_close(timeline.spans[0].start_percent, 0.0);
        assert_close(timeline.spans[0].end_percent, 66.67);
        assert_close(timeline.spans[1].start_percent, 33.33);
        assert_close(timeline.spans[1].end_percent, 100.0);
    }

    #[test]
    fn timestamped_window_starts_at_earliest_record() {
        let records = vec![
            record(10.0, Some("2024-03-01T10:00:00.100+00:00")),
            record(50.0, Some("2024-03-01T11:00:00.000+01:00")),
        ];
        let timeline = normalize(&records);

        assert_close(timeline.window.duration_ms, 110.0);
        assert_close(timeline.spans[1].start_percent, 0.0);
        assert_close(timeline.spans[0].start_percent, 100.0 / 110.0 * 100.0);
        assert_close(timeline.spans[0].end_percent, 100.0);
    }

    #[test]
    fn sequential_shares_are_independent() {
        let records = vec![record(100.0, None), record(300.0, None)];
        let timeline = normalize(&records);

        assert_eq!(timeline.window.regime, TimingRegime::Sequential);
        assert_eq!(timeline.window.start, None);
        assert_close(timeline.window.duration_ms, 400.0);
        assert_eq!(
            timeline.spans,
            vec![
                TimelineSpan {
                    start_percent: 0.0,
                    end_percent: 25.0,
                },
                TimelineSpan {
                    start_percent: 0.0,
                    end_percent: 75.0,
                },
            ]
        );
    }

    #[test]
    fn mixed_timestamps_fall_back_to_sequential() {
        let records = vec![
            record(100.0, Some("2024-03-01T10:00:00Z")),
            record(100.0, None),
            record(200.0, Some("yesterday")),
        ];
        let timeline = normalize(&records);
        assert_eq!(timeline.window.regime, TimingRegime::Sequential);
        assert_close(timeline.spans[2].end_percent, 50.0);
    }

    #[test]
    fn zero_duration_is_zero_not_nan() {
        let timeline = normalize(&[record(0.0, None)]);
        assert_eq!(
            timeline.spans,
            vec![TimelineSpan {
                start_percent: 0.0,
                end_percent: 0.0,
            }]
        );

        let timeline = normalize(&[record(0.0, Some("2024-03-01T10:00:00Z"))]);
        assert_eq!(timeline.window.regime, TimingRegime::Timestamped);
        assert_eq!(
            timeline.spans,
            vec![TimelineSpan {
                start_percent: 0.0,
                end_percent: 0.0,
            }]
        );
    }

    #[test]
    fn empty_input() {
        let timeline = normalize::<TraceRecord>(&[]);
        assert!(timeline.spans.is_empty());
        assert_eq!(timeline.window.duration_ms, 0.0);
    }

    #[test]
    fn timestamp_without_offset_is_utc() {
        assert_eq!(
            parse_timestamp("2024-03-01T10:00:00.250"),
            parse_timestamp("2024-03-01T10:00:00.250Z")
        );
        assert!(parse_timestamp("2024-03-01T10:00:00").is_some());
        assert!(parse_timestamp("not a date").is_none());
    }
}
