//! Source files and locations.
//!
//! Every token, AST node and resolved node carries a [`Span`]; the file
//! component is an index into the process-wide [`SourceMap`] so that spans
//! stay `Copy` while diagnostics can still print the file name.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Index of a source file in the [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FileId(pub u32);

/// Intern table for source file paths.
#[derive(Debug, Default)]
pub struct SourceMap {
    files: Vec<PathBuf>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<PathBuf>) -> FileId {
        let path = path.into();
        if let Some(idx) = self.files.iter().position(|p| *p == path) {
            return FileId(idx as u32);
        }
        self.files.push(path);
        FileId(self.files.len() as u32 - 1)
    }

    pub fn path(&self, id: FileId) -> &Path {
        &self.files[id.0 as usize]
    }

    pub fn name(&self, id: FileId) -> String {
        self.files[id.0 as usize].display().to_string()
    }
}

/// A source location: file, 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub file: FileId,
    pub line: u32,
    pub col: u32,
}

impl Span {
    pub fn new(file: FileId, line: u32, col: u32) -> Self {
        Self { file, line, col }
    }

    /// Renders `<file>:<line>:<col>` for diagnostics and dumps.
    pub fn display(&self, map: &SourceMap) -> String {
        format!("{}:{}:{}", map.name(self.file), self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interns_paths_once() {
        let mut map = SourceMap::new();
        let a = map.add("a.dmz");
        let b = map.add("b.dmz");
        let a2 = map.add("a.dmz");
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(map.name(b), "b.dmz");
    }

    #[test]
    fn span_display() {
        let mut map = SourceMap::new();
        let f = map.add("main.dmz");
        assert_eq!(Span::new(f, 3, 7).display(&map), "main.dmz:3:7");
    }
}
