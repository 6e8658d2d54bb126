//! Input line

/// One line of input and the name of the source it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Source file name, empty for anonymous input
    pub filename: String,
    /// Line text without its terminator
    pub text: String,
}

impl LogLine {
    /// Create a line read from `filename`
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            text: text.into(),
        }
    }
}
