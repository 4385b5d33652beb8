/// Convenience result type used across sortlast.
pub type CompositeResult<T> = Result<T, CompositeError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum CompositeError {
    /// Invalid user-provided configuration or call arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// A collective operation failed or observed a message it did not expect.
    ///
    /// Divergence between ranks is usually not observable at all (it shows up as a hang); this
    /// variant covers the cases the fabric can actually see.
    #[error("collective error: {0}")]
    Collective(String),

    /// The local render hook failed to produce a frame.
    #[error("render error: {0}")]
    Render(String),

    /// Presenting or writing the composite failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CompositeError {
    /// Build a [`CompositeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`CompositeError::Collective`] value.
    pub fn collective(msg: impl Into<String>) -> Self {
        Self::Collective(msg.into())
    }

    /// Build a [`CompositeError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
