//! Human-readable text derived from trace records: the one-line summary
//! shown on a trace bar and the markup-free description used for copying.

use std::fmt::Write as _;

use indexmap::IndexMap;
use serde_json::Value;

use crate::trace::RequestTrace;
use crate::trace::SqlTrace;
use crate::trace::TraceDetails;
use crate::trace::TraceRecord;
use crate::trace::TraceResult;

/// `"METHOD /path"` for requests, the leading keyword for SQL.
pub fn summary(record: &TraceRecord) -> String {
    match &record.details {
        TraceDetails::Request(trace) => {
            format!("{} {}", trace.request.method, url_path(&trace.request.url))
        }
        TraceDetails::Sql(trace) => trace
            .sql
            .split_whitespace()
            .next()
            .unwrap_or("SQL")
            .to_string(),
        TraceDetails::Unknown { kind, .. } => unrenderable(kind),
    }
}

/// Full plain-text description of a record.
pub fn plain_text(record: &TraceRecord) -> String {
    match &record.details {
        TraceDetails::Request(trace) => request_text(record, trace),
        TraceDetails::Sql(trace) => sql_text(record, trace),
        TraceDetails::Unknown { kind, .. } => unrenderable(kind),
    }
}

fn unrenderable(kind: &str) -> String {
    format!("cannot render trace of type '{kind}'")
}

fn url_path(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(url) => url.path().to_string(),
        Err(_) => raw.split(['?', '#']).next().unwrap_or(raw).to_string(),
    }
}

fn request_text(record: &TraceRecord, trace: &RequestTrace) -> String {
    let request = &trace.request;
    let mut text = format!("{} {} ({}ms)\n", request.method, request.url, record.elapsed_ms);
    push_headers(&mut text, &request.headers);
    if let Some(body) = request.body.as_ref().filter(|body| is_present(body)) {
        text.push_str(&render_body(body, &request.headers));
    }
    text.push('\n');

    match record.result {
        TraceResult::Success => {
            if let Some(response) = &trace.response {
                let _ = writeln!(text, "<<< {}", scalar_text(&response.status));
                push_headers(&mut text, &response.headers);
                if let Some(body) = response.body.as_ref().filter(|body| is_present(body)) {
                    text.push_str(&render_body(body, &response.headers));
                }
            }
        }
        TraceResult::Error => {
            let message = trace.error.as_ref().map_or("", |err| err.message.as_str());
            let _ = write!(text, "<<< error\n{message}");
        }
    }
    text
}

fn sql_text(record: &TraceRecord, trace: &SqlTrace) -> String {
    let mut text = format!("Executed SQL in {}ms\n\n{}", record.elapsed_ms, trace.sql);
    match record.result {
        TraceResult::Success => {
            text.push_str("\n\n<<< success");
            if let Some(rows) = trace.rows() {
                let _ = write!(text, "\n{} rows", rows.len());
            }
        }
        TraceResult::Error => {
            let message = trace.error.as_ref().map_or("", |err| err.message.as_str());
            let _ = write!(text, "\n\n<<< error\n{message}");
        }
    }
    text
}

fn push_headers(text: &mut String, headers: &IndexMap<String, Value>) {
    for (name, value) in headers {
        let _ = writeln!(text, "{name}: {}", scalar_text(value));
    }
}

fn render_body(body: &Value, headers: &IndexMap<String, Value>) -> String {
    let rendered = match body {
        Value::String(raw) if has_json_content_type(headers) => {
            match serde_json::from_str::<Value>(raw) {
                Ok(parsed) => pretty(&parsed),
                Err(_) => raw.clone(),
            }
        }
        Value::String(raw) => raw.clone(),
        other => pretty(other),
    };
    format!("\n{rendered}\n")
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn has_json_content_type(headers: &IndexMap<String, Value>) -> bool {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        .and_then(|(_, value)| value.as_str())
        .is_some_and(is_json_media_type)
}

/// `application/json` or any `application/<subtype>+json`.
fn is_json_media_type(content_type: &str) -> bool {
    content_type.split(';').map(str::trim).any(|part| {
        part == "application/json"
            || part
                .strip_prefix("application/")
                .and_then(|subtype| subtype.strip_suffix("+json"))
                .is_some_and(|prefix| !prefix.is_empty() && !prefix.contains('+'))
    })
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(text) => !text.is_empty(),
        Value::Number(number) => number.as_f64() != Some(0.0),
        _ => true,
    }
}
