//! Error types for tape construction, evaluation, and host-language adaptation.

use std::fmt;

/// Errors that can occur while building, evaluating, or adapting expressions.
///
/// All variants are fatal: none of them represent a recoverable numeric
/// condition (those propagate as ordinary IEEE float results, per the
/// evaluation semantics documented on [`crate::expr::Expression::evaluate`]).
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CoreError {
    /// A division combinator was called with a literal zero constant
    /// denominator at construction time.
    DivisionByZero,
    /// Evaluation reached an [`crate::operator::OperatorKind::External`]
    /// node. The core has no external function linkage; the host
    /// environment must evaluate these itself.
    ExternalEvaluationUnsupported {
        /// Name of the external function that could not be evaluated.
        name: String,
    },
    /// An append was attempted on a tape whose operator container has
    /// already been extended past this expression's recorded length by
    /// another owner, so the shared suffix can no longer be mutated safely.
    SharedSuffixAppend,
    /// The host-language adapter encountered an expression tag it does not
    /// recognize.
    UnrecognizedHostTag {
        /// The unrecognized tag, as reported by the host expression object.
        tag: String,
    },
    /// A unary-function adapter call referenced a function name the core
    /// does not implement.
    UnsupportedUnaryFunction {
        /// The unsupported function name.
        name: String,
    },
    /// A host-language adapter call supplied the wrong number of operands
    /// for the tag being translated.
    ArityMismatch {
        /// The tag whose arity did not match.
        tag: String,
        /// Number of operands expected.
        expected: usize,
        /// Number of operands actually supplied.
        got: usize,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::DivisionByZero => {
                write!(f, "division by the literal constant zero")
            }
            CoreError::ExternalEvaluationUnsupported { name } => {
                write!(
                    f,
                    "cannot evaluate external operator '{name}': no function linkage in the core"
                )
            }
            CoreError::SharedSuffixAppend => {
                write!(
                    f,
                    "cannot append to a tape whose suffix is shared with another expression"
                )
            }
            CoreError::UnrecognizedHostTag { tag } => {
                write!(f, "unrecognized host expression tag '{tag}'")
            }
            CoreError::UnsupportedUnaryFunction { name } => {
                write!(f, "unsupported unary function '{name}'")
            }
            CoreError::ArityMismatch { tag, expected, got } => {
                write!(
                    f,
                    "tag '{tag}' expected {expected} operand(s), got {got}"
                )
            }
        }
    }
}

impl std::error::Error for CoreError {}

/// Convenience alias for results fallible with [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_the_offending_detail() {
        let err = CoreError::UnrecognizedHostTag {
            tag: "Quux".to_owned(),
        };
        assert!(err.to_string().contains("Quux"));

        let err = CoreError::ArityMismatch {
            tag: "Product".to_owned(),
            expected: 2,
            got: 0,
        };
        let rendered = err.to_string();
        assert!(rendered.contains("Product"));
        assert!(rendered.contains('2'));
    }

    #[test]
    fn core_error_implements_std_error() {
        fn assert_error<E: std::error::Error>() {}
        assert_error::<CoreError>();
    }
}
