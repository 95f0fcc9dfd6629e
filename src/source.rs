//! Source positions attached to declarations and diagnostics.
//!
//! The resolver does not own file contents; it only carries positions
//! through from the parser so diagnostics can point back at the source.

use std::num::NonZeroU32;

/// Identifies one source file within a compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(NonZeroU32);

impl SourceId {
    pub fn new(id: u32) -> Option<Self> {
        NonZeroU32::new(id).map(SourceId)
    }

    /// Source id reserved for predefined declarations.
    pub fn builtin() -> Self {
        SourceId(NonZeroU32::new(1).unwrap())
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// A line/column position in one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub source_id: SourceId,
    pub line: u32,
    pub column: u32,
}

impl SourceSpan {
    pub fn new(source_id: SourceId, line: u32, column: u32) -> Self {
        SourceSpan {
            source_id,
            line,
            column,
        }
    }

    /// Position used for predefined declarations and for errors that are
    /// not tied to any one declaration.
    pub fn builtin() -> Self {
        SourceSpan::new(SourceId::builtin(), 0, 0)
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}

impl Default for SourceSpan {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
