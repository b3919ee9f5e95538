/// User-facing error type shared by the LexiLaw binaries.
///
/// Validation variants describe exactly what was wrong with the input and are
/// raised before any request leaves the process. Failures of the hosted model
/// collapse into one generic variant per operation; the underlying
/// [`GeminiError`](crate::gemini::GeminiError) is logged where it happens and
/// never shown to the user.

#[derive(Debug, thiserror::Error)]
pub enum LexiError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("reference term must not be empty")]
    EmptyReference,

    #[error("at least one non-empty candidate translation is required")]
    NoCandidates,

    #[error("Unable to retrieve definition. Please try again.")]
    Lookup,

    #[error("Unable to analyze terms. Please check your inputs.")]
    Comparison,

    #[error("a {0} request is already in progress")]
    Busy(&'static str),

    #[error("config error: {0}")]
    Config(String),

    #[error("failed to write output: {0}")]
    Output(String),
}

impl LexiError {
    /// True for errors caused by the caller's input rather than the upstream service.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LexiError::EmptyQuery | LexiError::EmptyReference | LexiError::NoCandidates
        )
    }
}
