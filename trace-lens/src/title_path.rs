use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Ordered titles from the outermost test group down to one test.
///
/// This is the correlation key between a declaration in source and the
/// trace records captured while that test ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitlePath {
    segments: Vec<String>,
}

impl TitlePath {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Exact, ordered, case-sensitive comparison. A prefix or an extension
    /// of this path does not match.
    pub fn matches<S: AsRef<str>>(&self, other: &[S]) -> bool {
        self.segments.len() == other.len()
            && self
                .segments
                .iter()
                .zip(other)
                .all(|(mine, theirs)| mine == theirs.as_ref())
    }
}

impl From<Vec<String>> for TitlePath {
    fn from(segments: Vec<String>) -> Self {
        Self::new(segments)
    }
}

impl fmt::Display for TitlePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut segments = self.segments.iter();
        if let Some(first) = segments.next() {
            f.write_str(first)?;
            for segment in segments {
                write!(f, " > {segment}")?;
            }
        }
        Ok(())
    }
}
