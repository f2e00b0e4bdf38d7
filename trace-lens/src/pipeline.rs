use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;
use tracing::info;

use crate::config::TraceLensConfig;
use crate::correlate::correlate;
use crate::correlate::workspace_relative_path;
use crate::error::Result;
use crate::error::TraceLensError;
use crate::language::Language;
use crate::snapshot::load_snapshot;
use crate::summary::plain_text;
use crate::summary::summary;
use crate::test_tree::TestForest;
use crate::test_tree::TestLens;
use crate::test_tree::TestNodeId;
use crate::test_tree::TestTreeExtractor;
use crate::timeline::TimelineWindow;
use crate::timeline::normalize;
use crate::title_path::TitlePath;
use crate::trace::TraceRecord;

/// Which declaration the user asked about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSelector {
    /// Zero-based line of the declaration (where its lens is shown).
    Line(usize),
    TitlePath(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct ShowTracesRequest {
    pub workspace_root: PathBuf,
    /// Test file, absolute or relative to the workspace root.
    pub document: PathBuf,
    /// Unsaved editor contents; the file is read from disk when `None`.
    pub source: Option<String>,
    pub selector: NodeSelector,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedTest {
    pub title_path: TitlePath,
    /// Display form, `outer > inner > case`.
    pub label: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderEntry {
    pub record: TraceRecord,
    pub summary: String,
    pub plain_text: String,
    pub start_percent: f64,
    pub end_percent: f64,
}

/// Everything the renderer needs to draw the traces of one test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPayload {
    pub document: String,
    pub test: Option<SelectedTest>,
    pub snapshot: Option<PathBuf>,
    pub window: TimelineWindow,
    pub entries: Vec<RenderEntry>,
}

impl RenderPayload {
    fn empty(document: String) -> Self {
        Self {
            document,
            test: None,
            snapshot: None,
            window: normalize::<TraceRecord>(&[]).window,
            entries: Vec::new(),
        }
    }
}

pub fn document_language(document: &Path) -> Result<Language> {
    Language::from_path(document)
        .ok_or_else(|| TraceLensError::UnsupportedLanguage(document.display().to_string()))
}

/// Declarations of a document flattened for lens display. Unsupported file
/// types have no lenses.
pub fn document_lenses(document: &Path, source: &str, config: &TraceLensConfig) -> Vec<TestLens> {
    match Language::from_path(document) {
        Some(language) => TestTreeExtractor::new(config).extract(source, language).lenses(),
        None => Vec::new(),
    }
}

/// Run extraction, snapshot loading, correlation and timeline placement for
/// one "show traces" trigger.
///
/// Every stage re-reads from disk; nothing is cached between requests.
pub fn handle_show_traces_request(
    request: &ShowTracesRequest,
    config: &TraceLensConfig,
) -> Result<RenderPayload> {
    let document = if request.document.is_absolute() {
        request.document.clone()
    } else {
        request.workspace_root.join(&request.document)
    };
    let relative = workspace_relative_path(&request.workspace_root, &document);

    let Some(language) = Language::from_path(&document) else {
        debug!("{relative} is not a supported test file");
        return Ok(RenderPayload::empty(relative));
    };
    let source = match &request.source {
        Some(source) => source.clone(),
        None => std::fs::read_to_string(&document)?,
    };

    let forest = TestTreeExtractor::new(config).extract(&source, language);
    let Some(node) = select(&forest, &request.selector) else {
        debug!("no test in {relative} matches {:?}", request.selector);
        return Ok(RenderPayload::empty(relative));
    };
    let title_path = forest.title_path(node);

    let snapshot = load_snapshot(&config.traces_path(&request.workspace_root))?;
    let records = correlate(&forest, node, &snapshot, &relative);
    let timeline = normalize(&records);

    info!(
        "{} traces for {relative} :: {title_path} over {}ms",
        records.len(),
        timeline.window.duration_ms
    );

    let entries = records
        .into_iter()
        .zip(timeline.spans)
        .map(|(record, span)| RenderEntry {
            summary: summary(record),
            plain_text: plain_text(record),
            record: record.clone(),
            start_percent: span.start_percent,
            end_percent: span.end_percent,
        })
        .collect();

    Ok(RenderPayload {
        document: relative,
        test: Some(SelectedTest {
            label: title_path.to_string(),
            line: forest.get(node).map_or(0, |node| node.position.line),
            title_path,
        }),
        snapshot: snapshot.source,
        window: timeline.window,
        entries,
    })
}

fn select(forest: &TestForest, selector: &NodeSelector) -> Option<TestNodeId> {
    match selector {
        NodeSelector::Line(line) => forest.find_by_line(*line),
        NodeSelector::TitlePath(path) => forest.find_by_title_path(path),
    }
}
