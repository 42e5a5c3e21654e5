use std::fmt;

/// Fatal engine errors.
///
/// An unmatched shortcut sub-token and an unmatched top-level token are
/// *not* variants here: the first is a warning routed through
/// [`crate::warn::Warner`], the second is silent by design (the token is
/// simply absent from `matched`).
#[derive(Debug)]
pub enum EngineError {
    /// A single token accumulated more than the configured variant-handler
    /// limit.
    VariantOverflow { raw: String, limit: usize },
    /// A rule or variant handler returned an error. The engine does not
    /// catch handler panics, only handler-reported failures propagated
    /// through a `Result`.
    Handler(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VariantOverflow { raw, limit } => {
                write!(
                    f,
                    "token {raw:?} exceeded the variant handler limit ({limit})"
                )
            }
            Self::Handler(e) => write!(f, "handler error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::VariantOverflow { .. } => None,
            Self::Handler(e) => Some(e.as_ref()),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
