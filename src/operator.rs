//! Operator taxonomy: the tagged variants that live on an [`crate::expr::Expression`] tape.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use crate::leaf::{Leaf, Variable};

/// An operand of an [`Operator`]: either a leaf or a reference to an earlier
/// slot on the same tape.
///
/// `Ref` indices are always strictly less than the index of the operator
/// that holds them; this is the tape-monotonicity invariant.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A variable, parameter, or constant leaf.
    Leaf(Leaf),
    /// A reference to an earlier operator slot on the same tape.
    Ref(u32),
}

impl Operand {
    /// Shift a `Ref` operand by `offset`; leaves are untouched.
    ///
    /// Used when splicing one tape's operators onto the end of another's,
    /// where every `Ref` in the spliced-in operators must be rebased to the
    /// destination tape's index space.
    #[must_use]
    pub fn rebased(&self, offset: u32) -> Self {
        match self {
            Operand::Leaf(l) => Operand::Leaf(l.clone()),
            Operand::Ref(i) => Operand::Ref(i + offset),
        }
    }
}

/// The unary transcendental functions the core understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryFn {
    /// `e^x`
    Exp,
    /// Natural logarithm.
    Log,
    /// Base-10 logarithm.
    Log10,
    /// Sine.
    Sin,
    /// Cosine.
    Cos,
    /// Tangent.
    Tan,
    /// Arcsine.
    Asin,
    /// Arccosine.
    Acos,
    /// Arctangent.
    Atan,
}

impl UnaryFn {
    /// Apply the function to a scalar value.
    #[must_use]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            UnaryFn::Exp => x.exp(),
            UnaryFn::Log => x.ln(),
            UnaryFn::Log10 => x.log10(),
            UnaryFn::Sin => x.sin(),
            UnaryFn::Cos => x.cos(),
            UnaryFn::Tan => x.tan(),
            UnaryFn::Asin => x.asin(),
            UnaryFn::Acos => x.acos(),
            UnaryFn::Atan => x.atan(),
        }
    }

    /// Name as accepted by the host-language adapter (see
    /// [`crate::adapter`]) and emitted by the pretty-printer.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            UnaryFn::Exp => "exp",
            UnaryFn::Log => "log",
            UnaryFn::Log10 => "log10",
            UnaryFn::Sin => "sin",
            UnaryFn::Cos => "cos",
            UnaryFn::Tan => "tan",
            UnaryFn::Asin => "asin",
            UnaryFn::Acos => "acos",
            UnaryFn::Atan => "atan",
        }
    }

    /// Parse a function name as accepted by the host-language adapter.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "exp" => UnaryFn::Exp,
            "log" => UnaryFn::Log,
            "log10" => UnaryFn::Log10,
            "sin" => UnaryFn::Sin,
            "cos" => UnaryFn::Cos,
            "tan" => UnaryFn::Tan,
            "asin" => UnaryFn::Asin,
            "acos" => UnaryFn::Acos,
            "atan" => UnaryFn::Atan,
            _ => return None,
        })
    }
}

impl fmt::Display for UnaryFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single linear term: a coefficient sub-expression multiplying a
/// variable.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearTerm {
    /// The variable being scaled.
    pub variable: Arc<Variable>,
    /// The coefficient, itself an operand (a leaf or a prior tape slot).
    pub coefficient: Operand,
}

/// The operator taxonomy. Every non-leaf tape slot holds exactly one of
/// these variants.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorKind {
    /// `a + b`
    Add(Operand, Operand),
    /// `a - b`
    Sub(Operand, Operand),
    /// `a * b`
    Mul(Operand, Operand),
    /// `a / b`
    Div(Operand, Operand),
    /// `a ^ b`
    Pow(Operand, Operand),
    /// `-a`
    Neg(Operand),
    /// A unary transcendental function applied to one operand.
    Unary(UnaryFn, Operand),
    /// An n-ary sum, used instead of nested `Add` to keep wide sums flat.
    Sum(Vec<Operand>),
    /// `constant + sum(coefficient_i * variable_i)`, the structured linear
    /// form produced by Repn generation and consumed directly by the NL
    /// serializer.
    Linear {
        /// The affine constant term.
        constant: Operand,
        /// The linear terms, each `coefficient * variable`.
        terms: Vec<LinearTerm>,
    },
    /// An opaque call to a named external function of arity `args.len()`.
    /// The core does not evaluate these; it only carries them through
    /// analysis and serialization.
    External {
        /// The external function's name.
        name: Arc<str>,
        /// Index into the host environment's external-function table, used
        /// by the NL serializer's `f<index>` token.
        function_index: Option<u32>,
        /// Operands passed to the external function.
        args: Vec<Operand>,
    },
}

impl OperatorKind {
    /// Shift every `Ref` operand reachable from this kind by `offset`,
    /// used when splicing a tape's operators onto the end of another.
    #[must_use]
    pub fn rebased(&self, offset: u32) -> Self {
        match self {
            OperatorKind::Add(a, b) => OperatorKind::Add(a.rebased(offset), b.rebased(offset)),
            OperatorKind::Sub(a, b) => OperatorKind::Sub(a.rebased(offset), b.rebased(offset)),
            OperatorKind::Mul(a, b) => OperatorKind::Mul(a.rebased(offset), b.rebased(offset)),
            OperatorKind::Div(a, b) => OperatorKind::Div(a.rebased(offset), b.rebased(offset)),
            OperatorKind::Pow(a, b) => OperatorKind::Pow(a.rebased(offset), b.rebased(offset)),
            OperatorKind::Neg(a) => OperatorKind::Neg(a.rebased(offset)),
            OperatorKind::Unary(f, a) => OperatorKind::Unary(*f, a.rebased(offset)),
            OperatorKind::Sum(xs) => {
                OperatorKind::Sum(xs.iter().map(|x| x.rebased(offset)).collect())
            }
            OperatorKind::Linear { constant, terms } => OperatorKind::Linear {
                constant: constant.rebased(offset),
                terms: terms
                    .iter()
                    .map(|t| LinearTerm {
                        variable: Arc::clone(&t.variable),
                        coefficient: t.coefficient.rebased(offset),
                    })
                    .collect(),
            },
            OperatorKind::External {
                name,
                function_index,
                args,
            } => OperatorKind::External {
                name: Arc::clone(name),
                function_index: *function_index,
                args: args.iter().map(|a| a.rebased(offset)).collect(),
            },
        }
    }
}

/// One slot on an [`crate::expr::Expression`] tape.
///
/// `index`, `degree`, and `unique_degree` are scratch fields overwritten at
/// the start of each analysis pass; they are not meaningful between passes
/// and must not be read before the corresponding pass has run.
#[derive(Debug, Clone)]
pub struct Operator {
    /// This operator's position on the tape, assigned by the pass that last
    /// visited it.
    pub index: Cell<u32>,
    /// Polynomial degree assigned by [`crate::degree::propagate_degree`].
    /// `3` is the saturating "nonlinear" sentinel.
    pub degree: Cell<u8>,
    /// Unique-degree flag assigned by
    /// [`crate::degree::propagate_unique_degree`].
    pub unique_degree: Cell<bool>,
    /// The operator's shape and operands.
    pub kind: OperatorKind,
}

impl Operator {
    /// Wrap a kind in a fresh slot with scratch fields zeroed.
    #[must_use]
    pub fn new(kind: OperatorKind) -> Self {
        Self {
            index: Cell::new(0),
            degree: Cell::new(0),
            unique_degree: Cell::new(false),
            kind,
        }
    }
}

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operand_rebase_shifts_refs_not_leaves() {
        let r = Operand::Ref(2);
        assert_eq!(r.rebased(5), Operand::Ref(7));
        let l = Operand::Leaf(Leaf::Constant(1.0));
        assert_eq!(l.rebased(5), Operand::Leaf(Leaf::Constant(1.0)));
    }

    #[test]
    fn operator_kind_rebase_is_structural() {
        let kind = OperatorKind::Add(Operand::Ref(0), Operand::Ref(1));
        let rebased = kind.rebased(3);
        assert_eq!(rebased, OperatorKind::Add(Operand::Ref(3), Operand::Ref(4)));
    }

    #[test]
    fn unary_fn_name_round_trips_through_from_name() {
        for f in [
            UnaryFn::Exp,
            UnaryFn::Log,
            UnaryFn::Log10,
            UnaryFn::Sin,
            UnaryFn::Cos,
            UnaryFn::Tan,
            UnaryFn::Asin,
            UnaryFn::Acos,
            UnaryFn::Atan,
        ] {
            assert_eq!(UnaryFn::from_name(f.name()), Some(f));
        }
    }

    #[test]
    fn unary_fn_from_name_rejects_unknown() {
        assert_eq!(UnaryFn::from_name("sqrt"), None);
    }

    #[test]
    fn fresh_operator_has_zeroed_scratch_fields() {
        let op = Operator::new(OperatorKind::Neg(Operand::Leaf(Leaf::Constant(1.0))));
        assert_eq!(op.index.get(), 0);
        assert_eq!(op.degree.get(), 0);
        assert!(!op.unique_degree.get());
    }
}
