#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A node, literal or top-level shape this backend does not lower.
    #[error("Unsupported construct: {0}")]
    Unsupported(String),

    /// A variable reference with no binding in the active scope chain.
    #[error("Unbound variable: {0}")]
    UnboundVariable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
