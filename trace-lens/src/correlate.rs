use std::path::Path;

use tracing::debug;

use crate::snapshot::TraceSnapshot;
use crate::test_tree::TestForest;
use crate::test_tree::TestNodeId;
use crate::title_path::TitlePath;
use crate::trace::TraceRecord;
use crate::trace::normalize_slashes;

/// Records of `snapshot` captured while the test `node` ran.
///
/// A record belongs to the test when its file equals `document_path` and
/// its title path equals the node's title path exactly. The result keeps
/// snapshot order, which is execution order.
pub fn correlate<'s>(
    forest: &TestForest,
    node: TestNodeId,
    snapshot: &'s TraceSnapshot,
    document_path: &str,
) -> Vec<&'s TraceRecord> {
    let title_path = forest.title_path(node);
    if title_path.is_empty() {
        return Vec::new();
    }
    correlate_path(&title_path, &snapshot.records, document_path)
}

pub fn correlate_path<'s>(
    title_path: &TitlePath,
    records: &'s [TraceRecord],
    document_path: &str,
) -> Vec<&'s TraceRecord> {
    let document_path = normalize_slashes(document_path);
    let matched: Vec<&TraceRecord> = records
        .iter()
        .filter(|record| record.normalized_file() == document_path)
        .filter(|record| title_path.matches(record.title_path.segments()))
        .collect();
    debug!(
        "{} of {} trace records match {document_path} :: {title_path}",
        matched.len(),
        records.len()
    );
    matched
}

/// Path of `document` relative to `workspace_root`, `/`-separated, in the
/// form trace reporters record it.
pub fn workspace_relative_path(workspace_root: &Path, document: &Path) -> String {
    let relative = pathdiff::diff_paths(document, workspace_root)
        .unwrap_or_else(|| document.to_path_buf());
    normalize_slashes(&relative.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TraceLensConfig;
    use crate::language::Language;
    use crate::test_tree::TestTreeExtractor;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(file: &str, path: &[&str], sql: &str) -> TraceRecord {
        serde_json::from_value(json!({
            "type": "sql",
            "file": file,
            "testTitlePath": path,
            "result": "success",
            "elapsed": 1,
            "sql": sql,
        }))
        .unwrap()
    }

    fn sqls(records: &[&TraceRecord]) -> Vec<String> {
        records
            .iter()
            .map(|record| match &record.details {
                crate::trace::TraceDetails::Sql(sql) => sql.sql.clone(),
                _ => String::new(),
            })
            .collect()
    }

    fn snapshot() -> TraceSnapshot {
        TraceSnapshot {
            source: None,
            records: vec![
                record("test/a.spec.ts", &["A", "B"], "q1"),
                record("test/a.spec.ts", &["A"], "q2"),
                record("test\\a.spec.ts", &["A", "B"], "q3"),
                record("test/a.spec.ts", &["A", "B", "C"], "q4"),
                record("test/other.spec.ts", &["A", "B"], "q5"),
                record("test/a.spec.ts", &["A", "X"], "q6"),
                record("test/a.spec.ts", &["a", "b"], "q7"),
                record("test/a.spec.ts", &["A", "B"], "q8"),
            ],
        }
    }

    fn forest() -> TestForest {
        TestTreeExtractor::new(&TraceLensConfig::default()).extract(
            "describe('A', () => { it('B', () => {}); it('X', () => {}); it('C', () => {}); });",
            Language::TypeScript,
        )
    }

    #[test]
    fn exact_path_and_file_match_in_snapshot_order() {
        let forest = forest();
        let snapshot = snapshot();
        let node = forest.find_by_title_path(&["A", "B"]).unwrap();

        let matched = correlate(&forest, node, &snapshot, "test/a.spec.ts");
        assert_eq!(sqls(&matched), vec!["q1", "q3", "q8"]);

        let windows_path = correlate(&forest, node, &snapshot, "test\\a.spec.ts");
        assert_eq!(sqls(&windows_path), vec!["q1", "q3", "q8"]);
    }

    #[test]
    fn parent_does_not_match_child_records() {
        let forest = forest();
        let snapshot = snapshot();
        let node = forest.find_by_title_path(&["A"]).unwrap();
        assert_eq!(sqls(&correlate(&forest, node, &snapshot, "test/a.spec.ts")), vec!["q2"]);

        let sibling = forest.find_by_title_path(&["A", "C"]).unwrap();
        assert!(correlate(&forest, sibling, &snapshot, "test/a.spec.ts").is_empty());
    }

    #[test]
    fn correlation_is_repeatable_subsequence() {
        let forest = forest();
        let snapshot = snapshot();
        let node = forest.find_by_title_path(&["A", "B"]).unwrap();

        let first = correlate(&forest, node, &snapshot, "test/a.spec.ts");
        let second = correlate(&forest, node, &snapshot, "test/a.spec.ts");
        assert_eq!(first, second);

        let positions: Vec<usize> = first
            .iter()
            .map(|matched| {
                snapshot
                    .records
                    .iter()
                    .position(|record| std::ptr::eq(record, *matched))
                    .unwrap()
            })
            .collect();
        assert_eq!(positions, vec![0, 2, 7]);
    }

    #[test]
    fn no_match_is_empty() {
        let forest = forest();
        let node = forest.find_by_title_path(&["A", "B"]).unwrap();
        assert!(correlate(&forest, node, &TraceSnapshot::default(), "test/a.spec.ts").is_empty());
        assert!(correlate(&forest, node, &snapshot(), "test/missing.spec.ts").is_empty());
    }

    #[test]
    fn relative_path_uses_forward_slashes() {
        let root = Path::new("/work/app");
        assert_eq!(
            workspace_relative_path(root, &root.join("test").join("a.spec.ts")),
            "test/a.spec.ts"
        );
    }
}
