use core::fmt;

use thiserror::Error;

/// Which bound of the sequence derivation was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceBound {
    Count,
    Length,
}

impl fmt::Display for SequenceBound {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SequenceBound::Count => write!(f, "too many sequences"),
            SequenceBound::Length => write!(f, "sequence too long"),
        }
    }
}

/// Reasons a candidate sketch cannot be turned into code.
///
/// None of these abort a batch: the solver logs the failure and moves on to
/// the next candidate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SynthesisFailure {
    #[error("sequence explosion: {0}")]
    SequenceExplosion(SequenceBound),

    #[error("no expression found for type {0}")]
    SearchExhausted(String),

    #[error("unknown signature {0}")]
    UnknownSignature(String),

    #[error("malformed sketch: {0}")]
    MalformedSketch(String),

    #[error("invalid type catalog: {0}")]
    InvalidCatalog(String),
}

impl SynthesisFailure {
    /// Short name of the failure class, used to bucket batch statistics.
    pub fn kind(&self) -> &'static str {
        match self {
            SynthesisFailure::SequenceExplosion(_) => "sequence-explosion",
            SynthesisFailure::SearchExhausted(_) => "search-exhausted",
            SynthesisFailure::UnknownSignature(_) => "unknown-signature",
            SynthesisFailure::MalformedSketch(_) => "malformed-sketch",
            SynthesisFailure::InvalidCatalog(_) => "invalid-catalog",
        }
    }
}

pub type SynthesisResult<T> = Result<T, SynthesisFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_messages() {
        let err = SynthesisFailure::SequenceExplosion(SequenceBound::Length);
        assert_eq!(err.to_string(), "sequence explosion: sequence too long");

        let err = SynthesisFailure::UnknownSignature("Foo.bar()".into());
        assert_eq!(err.to_string(), "unknown signature Foo.bar()");

        let err = SynthesisFailure::SearchExhausted("java.io.Reader".into());
        assert_eq!(err.to_string(), "no expression found for type java.io.Reader");
        assert_eq!(err.kind(), "search-exhausted");
    }
}
