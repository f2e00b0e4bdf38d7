//! Discovery of nested test declarations in JavaScript/TypeScript source.
//!
//! A declaration is a call with exactly two arguments whose first argument
//! is a string literal and whose callee matches the naming convention in
//! [`classify_callee`]. The convention is a surface-syntax heuristic, not a
//! semantic analysis: it never resolves imports or aliases.

use serde::Serialize;
use tracing::debug;
use tracing::warn;
use tree_sitter::Node;

use crate::config::TraceLensConfig;
use crate::language::Language;
use crate::title_path::TitlePath;

/// Index of a node inside its [`TestForest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TestNodeId(usize);

/// Zero-based line/column as reported by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestNode {
    pub title: String,
    /// Byte offset of the call expression, leading comments excluded.
    pub source_offset: usize,
    pub position: SourcePosition,
    parent: Option<TestNodeId>,
    children: Vec<TestNodeId>,
}

impl TestNode {
    pub fn parent(&self) -> Option<TestNodeId> {
        self.parent
    }

    /// Child declarations in document order.
    pub fn children(&self) -> &[TestNodeId] {
        &self.children
    }
}

/// One "Traces" lens anchor: a declaration and where to show it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestLens {
    pub id: TestNodeId,
    pub line: usize,
    pub title_path: TitlePath,
}

/// All declarations found by one parse of one file.
///
/// Nodes live in a flat table; parent links are indices into it. The
/// forest is rebuilt from scratch on every parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestForest {
    nodes: Vec<TestNode>,
    roots: Vec<TestNodeId>,
}

impl TestForest {
    pub fn roots(&self) -> &[TestNodeId] {
        &self.roots
    }

    pub fn get(&self, id: TestNodeId) -> Option<&TestNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Titles from the root down to `id`, inclusive.
    pub fn title_path(&self, id: TestNodeId) -> TitlePath {
        let mut titles = Vec::new();
        let mut current = self.get(id);
        while let Some(node) = current {
            titles.push(node.title.clone());
            current = node.parent.and_then(|parent| self.get(parent));
        }
        titles.reverse();
        TitlePath::new(titles)
    }

    /// Node ids in document pre-order (parents before their children).
    pub fn preorder(&self) -> Vec<TestNodeId> {
        let mut ordered = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<TestNodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            ordered.push(id);
            if let Some(node) = self.get(id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        ordered
    }

    pub fn lenses(&self) -> Vec<TestLens> {
        self.preorder()
            .into_iter()
            .filter_map(|id| {
                self.get(id).map(|node| TestLens {
                    id,
                    line: node.position.line,
                    title_path: self.title_path(id),
                })
            })
            .collect()
    }

    /// First declaration (outermost on ties) starting on a zero-based line.
    pub fn find_by_line(&self, line: usize) -> Option<TestNodeId> {
        self.preorder()
            .into_iter()
            .find(|id| self.get(*id).is_some_and(|node| node.position.line == line))
    }

    pub fn find_by_title_path<S: AsRef<str>>(&self, path: &[S]) -> Option<TestNodeId> {
        self.preorder()
            .into_iter()
            .find(|id| self.title_path(*id).matches(path))
    }

    fn push(&mut self, node: TestNode) -> TestNodeId {
        let id = TestNodeId(self.nodes.len());
        match node.parent {
            Some(parent) => {
                if let Some(parent) = self.nodes.get_mut(parent.0) {
                    parent.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        self.nodes.push(node);
        id
    }
}

/// How a callee matched the declaration convention.
///
/// | callee shape          | resolved name | accepted when                 |
/// |-----------------------|---------------|-------------------------------|
/// | `name(..)`            | `name`        | `name` is a test function     |
/// | `tags(..).name(..)`   | `name`        | always                        |
/// | `name.only(..)`       | `name`        | `name` is a test function     |
/// | anything else         | -             | never                         |
///
/// Only one level of qualification is understood; `a.b.only(..)` or
/// `tags(..).x.y(..)` are not declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CalleeMatch<'s> {
    Bare(&'s str),
    Tagged(&'s str),
    Modified(&'s str),
}

pub struct TestTreeExtractor<'c> {
    config: &'c TraceLensConfig,
}

impl<'c> TestTreeExtractor<'c> {
    pub fn new(config: &'c TraceLensConfig) -> Self {
        Self { config }
    }

    /// Build the declaration forest for `source`.
    ///
    /// A source that cannot be parsed yields an empty forest; the failure is
    /// logged rather than returned.
    pub fn extract(&self, source: &str, language: Language) -> TestForest {
        let tree = match language.parse(source) {
            Ok(tree) => tree,
            Err(err) => {
                warn!("test extraction skipped: {err}");
                return TestForest::default();
            }
        };

        let root = tree.root_node();
        if self.config.require_clean_parse && root.has_error() {
            warn!(
                "test extraction skipped: {} source has syntax errors",
                language.name()
            );
            return TestForest::default();
        }

        let mut forest = TestForest::default();
        let mut stack: Vec<(Node, Option<TestNodeId>)> = vec![(root, None)];
        while let Some((node, ancestor)) = stack.pop() {
            let active = match self.declaration_title(node, source) {
                Some(title) => {
                    let start = node.start_position();
                    Some(forest.push(TestNode {
                        title,
                        source_offset: node.start_byte(),
                        position: SourcePosition {
                            line: start.row,
                            column: start.column,
                        },
                        parent: ancestor,
                        children: Vec::new(),
                    }))
                }
                None => ancestor,
            };

            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev().map(|child| (child, active)));
        }

        debug!(
            "extracted {} test declarations ({} roots) from {} source",
            forest.len(),
            forest.roots.len(),
            language.name()
        );
        forest
    }

    /// Title of `node` if it is a recognized test declaration.
    fn declaration_title(&self, node: Node, source: &str) -> Option<String> {
        if node.kind() != "call_expression" {
            return None;
        }

        let callee = node.child_by_field_name("function")?;
        let matched = classify_callee(callee, source, self.config)?;
        if !self.accepts(matched) {
            return None;
        }

        let arguments = node.child_by_field_name("arguments")?;
        if arguments.kind() != "arguments" {
            return None;
        }
        let mut cursor = arguments.walk();
        let args: Vec<Node> = arguments
            .named_children(&mut cursor)
            .filter(|arg| arg.kind() != "comment")
            .collect();
        match args.as_slice() {
            [title, _body] => string_literal_value(*title, source),
            _ => None,
        }
    }

    fn accepts(&self, matched: CalleeMatch<'_>) -> bool {
        match matched {
            CalleeMatch::Bare(name) | CalleeMatch::Modified(name) => {
                self.config.is_test_function(name)
            }
            CalleeMatch::Tagged(_) => true,
        }
    }
}

fn node_text<'s>(node: Node, source: &'s str) -> Option<&'s str> {
    node.utf8_text(source.as_bytes()).ok()
}

fn classify_callee<'s>(
    callee: Node,
    source: &'s str,
    config: &TraceLensConfig,
) -> Option<CalleeMatch<'s>> {
    match callee.kind() {
        "identifier" => node_text(callee, source).map(CalleeMatch::Bare),
        "member_expression" => {
            let object = callee.child_by_field_name("object")?;
            let property = node_text(callee.child_by_field_name("property")?, source)?;
            match object.kind() {
                "call_expression" => {
                    let tag = object.child_by_field_name("function")?;
                    (tag.kind() == "identifier"
                        && node_text(tag, source)? == config.tag_function)
                        .then_some(CalleeMatch::Tagged(property))
                }
                "identifier" if config.is_modifier(property) => {
                    node_text(object, source).map(CalleeMatch::Modified)
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Decoded value of a quoted string or a substitution-free template string.
fn string_literal_value(node: Node, source: &str) -> Option<String> {
    match node.kind() {
        "string" | "template_string" => {}
        _ => return None,
    }

    let mut value = String::new();
    let mut cursor = node.walk();
    for part in node.named_children(&mut cursor) {
        let text = node_text(part, source)?;
        match part.kind() {
            "escape_sequence" => value.push_str(&decode_escape(text)),
            "template_substitution" => return None,
            "comment" => {}
            _ => value.push_str(text),
        }
    }
    Some(value)
}

fn decode_escape(raw: &str) -> String {
    let Some(body) = raw.strip_prefix('\\') else {
        return raw.to_string();
    };
    let mut chars = body.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let rest = chars.as_str();
    let decoded = match first {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        'b' => '\u{8}',
        'f' => '\u{c}',
        'v' => '\u{b}',
        '0' if rest.is_empty() => '\0',
        '\n' | '\r' | '\u{2028}' | '\u{2029}' => return String::new(),
        'x' | 'u' => {
            let hex = rest.trim_start_matches('{').trim_end_matches('}');
            return u32::from_str_radix(hex, 16)
                .ok()
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER)
                .to_string();
        }
        other => return format!("{other}{rest}"),
    };
    decoded.to_string()
}
