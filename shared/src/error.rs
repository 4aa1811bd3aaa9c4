use thiserror::Error;

/// Failure reported by every repository operation.
///
/// The messages are meant to be shown to the user as-is; the caller decides
/// whether to offer a retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TodoError {
    #[error("{0}")]
    Validation(String),

    #[error("category \"{0}\" already exists")]
    Duplicate(String),

    #[error("{0}")]
    NotFound(String),

    #[error("could not save changes: {0}")]
    Persistence(String),
}

impl TodoError {
    pub fn category_not_found(name: &str) -> Self {
        Self::NotFound(format!("category \"{name}\" does not exist"))
    }
}
