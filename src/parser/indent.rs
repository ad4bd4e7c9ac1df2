//! The indent stack tracking currently open indentation levels.

/// Stack of open indentation columns, initialized to the base level `0`.
///
/// The lexer pushes a column when a line is indented deeper than the
/// current level and pops when a line dedents. It never pops the base
/// level; [`IndentStack::pop`] itself does not enforce that, so callers
/// guard with [`IndentStack::is_base`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentStack {
    levels: Vec<usize>,
}

impl Default for IndentStack {
    fn default() -> Self {
        Self::new()
    }
}

impl IndentStack {
    pub fn new() -> Self {
        Self { levels: vec![0] }
    }

    /// Open a deeper indentation level.
    pub fn push(&mut self, column: usize) {
        self.levels.push(column);
    }

    /// Remove and return the deepest level.
    ///
    /// Returns the base level once when it is the only one left, and `None`
    /// after that.
    pub fn pop(&mut self) -> Option<usize> {
        self.levels.pop()
    }

    /// The deepest open level (`0` once the stack has been exhausted).
    pub fn current(&self) -> usize {
        self.levels.last().copied().unwrap_or(0)
    }

    /// Position of the last level equal to `column`, if it is still open.
    ///
    /// Used to dedent to an ancestor level that is not the most recent one.
    pub fn find_last_index(&self, column: usize) -> Option<usize> {
        self.levels.iter().rposition(|&level| level == column)
    }

    /// A copy of the open levels, base first.
    pub fn get(&self) -> Vec<usize> {
        self.levels.clone()
    }

    /// Number of open levels, including the base level.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// True when only the base level (or nothing) is left.
    pub fn is_base(&self) -> bool {
        self.levels.len() <= 1
    }
}
