use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A matched substring could not be turned into a date. Recovered per match.
    #[error("Could not resolve date '{text}': {reason}")]
    UnresolvableDate { text: String, reason: String },

    #[error("No dates found in the syllabus text")]
    EmptyExtractionResult,

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("Failed to read syllabus from {source_name}: {reason}")]
    SourceReadFailure { source_name: String, reason: String },
}

impl Error {
    pub(crate) fn unresolvable(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnresolvableDate {
            text: text.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn source_read(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceReadFailure {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}
