//! # Trace Lens
//!
//! Connects test declarations in JavaScript/TypeScript sources to the HTTP
//! and SQL traces a test runner recorded while those tests executed.
//!
//! ## Architecture
//!
//! ```text
//! Test file source
//!     │
//!     ├──> TestTreeExtractor (tree-sitter)
//!     │    └─> TestForest: nested describe/it titles + positions
//!     │
//! traces/ directory
//!     │
//!     ├──> load_snapshot: newest file by name → TraceRecord[]
//!     │
//!     ├──> correlate: same file + identical title path
//!     │
//!     └──> normalize: start/end percentages on the test's timeline
//!              │
//!              └─> RenderPayload (summaries, plain text, spans)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use trace_lens::NodeSelector;
//! use trace_lens::ShowTracesRequest;
//! use trace_lens::TraceLensConfig;
//! use trace_lens::handle_show_traces_request;
//!
//! # fn main() -> trace_lens::Result<()> {
//! let workspace_root = PathBuf::from(".");
//! let config = TraceLensConfig::load(&workspace_root)?;
//! let payload = handle_show_traces_request(
//!     &ShowTracesRequest {
//!         workspace_root,
//!         document: PathBuf::from("test/users.spec.ts"),
//!         source: None,
//!         selector: NodeSelector::TitlePath(vec!["users".into(), "creates a user".into()]),
//!     },
//!     &config,
//! )?;
//! for entry in &payload.entries {
//!     println!("{} {:.0}%..{:.0}%", entry.summary, entry.start_percent, entry.end_percent);
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod correlate;
mod error;
mod language;
mod pipeline;
mod snapshot;
mod summary;
mod test_tree;
mod timeline;
mod title_path;
mod trace;

pub use config::CONFIG_FILE_NAME;
pub use config::TraceLensConfig;
pub use correlate::correlate;
pub use correlate::correlate_path;
pub use correlate::workspace_relative_path;
pub use error::Result;
pub use error::TraceLensError;
pub use language::Language;
pub use pipeline::NodeSelector;
pub use pipeline::RenderEntry;
pub use pipeline::RenderPayload;
pub use pipeline::SelectedTest;
pub use pipeline::ShowTracesRequest;
pub use pipeline::document_language;
pub use pipeline::document_lenses;
pub use pipeline::handle_show_traces_request;
pub use snapshot::TraceSnapshot;
pub use snapshot::latest_snapshot_file;
pub use snapshot::load_snapshot;
pub use summary::plain_text;
pub use summary::summary;
pub use test_tree::SourcePosition;
pub use test_tree::TestForest;
pub use test_tree::TestLens;
pub use test_tree::TestNode;
pub use test_tree::TestNodeId;
pub use test_tree::TestTreeExtractor;
pub use timeline::Timeline;
pub use timeline::TimelineSpan;
pub use timeline::TimelineWindow;
pub use timeline::TimingRegime;
pub use timeline::normalize;
pub use title_path::TitlePath;
pub use trace::HttpRequest;
pub use trace::HttpResponse;
pub use trace::RequestTrace;
pub use trace::SqlTrace;
pub use trace::TraceDetails;
pub use trace::TraceError;
pub use trace::TraceRecord;
pub use trace::TraceResult;
