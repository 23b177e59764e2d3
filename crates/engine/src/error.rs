pub type Result<T> = std::result::Result<T, LoadError>;

/// Why package source could not be turned into a runnable instance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// Neither loading strategy produced an object with an invocable `activate`.
    #[error("no activation function")]
    NoActivation,

    /// Package code raised while its top level was being evaluated.
    ///
    /// Carries the thrown value's message verbatim.
    #[error("module threw during initialization: {0}")]
    Threw(String),

    /// The source is not valid under either module dialect.
    #[error("unsupported module encoding: {0}")]
    UnsupportedEncoding(String),
}

/// A lifecycle routine failed after the package loaded successfully.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActivationError {
    #[error("{hook} threw: {message}")]
    Threw { hook: &'static str, message: String },

    #[error("{hook} rejected: {message}")]
    Rejected { hook: &'static str, message: String },
}
