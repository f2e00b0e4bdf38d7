//! Trace records as written by the test runner's trace reporter.

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::title_path::TitlePath;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceResult {
    #[default]
    Success,
    Error,
}

/// Error attached to a failed request or statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceError {
    #[serde(rename = "str", alias = "message")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestTrace {
    pub request: HttpRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<HttpResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TraceError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlTrace {
    pub sql: String,
    #[serde(rename = "sqlParams", default, skip_serializing_if = "Value::is_null")]
    pub sql_params: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TraceError>,
}

impl SqlTrace {
    /// Result rows when the statement reported them as `data.rows`.
    pub fn rows(&self) -> Option<&Vec<Value>> {
        self.data.get("rows").and_then(Value::as_array)
    }
}

/// Kind-specific part of a trace record.
///
/// Kinds other than `request` and `sql` keep their raw payload so they can
/// still be correlated, timed and reported as unrenderable.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceDetails {
    Request(RequestTrace),
    Sql(SqlTrace),
    Unknown {
        kind: String,
        payload: Map<String, Value>,
    },
}

impl TraceDetails {
    pub fn kind(&self) -> &str {
        match self {
            TraceDetails::Request(_) => "request",
            TraceDetails::Sql(_) => "sql",
            TraceDetails::Unknown { kind, .. } => kind,
        }
    }
}

/// One recorded HTTP exchange or SQL execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTraceRecord", into = "RawTraceRecord")]
pub struct TraceRecord {
    /// Workspace-relative path of the test file, `/`-separated.
    pub file: String,
    pub title_path: TitlePath,
    pub result: TraceResult,
    pub elapsed_ms: f64,
    /// ISO-8601 start time, when the reporter recorded one.
    pub start: Option<String>,
    pub details: TraceDetails,
}

impl TraceRecord {
    pub fn kind(&self) -> &str {
        self.details.kind()
    }

    pub fn normalized_file(&self) -> String {
        normalize_slashes(&self.file)
    }
}

/// Recorders write `null` for absent maps as often as they omit the key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn normalize_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

/// Wire shape shared by all kinds; the kind-specific fields stay in
/// `payload` until the `type` tag has been inspected.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTraceRecord {
    #[serde(rename = "type")]
    kind: String,
    file: String,
    #[serde(rename = "testTitlePath", alias = "titlePath")]
    title_path: Vec<String>,
    #[serde(default)]
    result: TraceResult,
    #[serde(rename = "elapsed", alias = "elapsedMs", default)]
    elapsed_ms: f64,
    #[serde(
        rename = "start",
        alias = "startTimestamp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    start: Option<String>,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl TryFrom<RawTraceRecord> for TraceRecord {
    type Error = String;

    fn try_from(raw: RawTraceRecord) -> Result<Self, Self::Error> {
        if raw.title_path.is_empty() {
            return Err("testTitlePath must not be empty".to_string());
        }
        if !raw.elapsed_ms.is_finite() || raw.elapsed_ms < 0.0 {
            return Err(format!("elapsed must be a non-negative number, got {}", raw.elapsed_ms));
        }

        let details = match raw.kind.as_str() {
            "request" => serde_json::from_value(Value::Object(raw.payload))
                .map(TraceDetails::Request)
                .map_err(|err| format!("invalid request trace: {err}"))?,
            "sql" => serde_json::from_value(Value::Object(raw.payload))
                .map(TraceDetails::Sql)
                .map_err(|err| format!("invalid sql trace: {err}"))?,
            _ => TraceDetails::Unknown {
                kind: raw.kind,
                payload: raw.payload,
            },
        };

        Ok(Self {
            file: raw.file,
            title_path: TitlePath::new(raw.title_path),
            result: raw.result,
            elapsed_ms: raw.elapsed_ms,
            start: raw.start,
            details,
        })
    }
}

impl From<TraceRecord> for RawTraceRecord {
    fn from(record: TraceRecord) -> Self {
        let kind = record.kind().to_string();
        let payload = match record.details {
            TraceDetails::Request(request) => object_of(serde_json::to_value(request)),
            TraceDetails::Sql(sql) => object_of(serde_json::to_value(sql)),
            TraceDetails::Unknown { payload, .. } => payload,
        };
        Self {
            kind,
            file: record.file,
            title_path: record.title_path.segments().to_vec(),
            result: record.result,
            elapsed_ms: record.elapsed_ms,
            start: record.start,
            payload,
        }
    }
}

fn object_of(value: serde_json::Result<Value>) -> Map<String, Value> {
    match value {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
