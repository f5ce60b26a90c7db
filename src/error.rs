use thiserror::Error;

/// Failures of the transcript core. Everything else degrades to a fallback strategy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("input is empty")]
    EmptyInput,
    #[error("could not extract a conversation from the document")]
    NoExtractableStructure,
    #[error("unsupported document value: {kind}")]
    UnsupportedInput { kind: &'static str },
    #[error("invalid role names: {0}")]
    InvalidRoleNames(String),
}

impl TranscriptError {
    /// Follow-up hint shown to the user alongside the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::EmptyInput => Some("Please paste a conversation first."),
            Self::NoExtractableStructure => {
                Some("Please try copying and pasting the text manually instead.")
            }
            _ => None,
        }
    }
}
