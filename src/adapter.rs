//! Host-language glue: translate a foreign expression tree into a [`Node`].
//!
//! Host environments (an AMPL-style modeling layer, a Python binding, …)
//! build their own expression trees with their own tagging scheme. This
//! module defines a single fixed-tag intermediate form, [`HostExpr`], that
//! any such tree can be lowered into, and [`adapt`] walks it into the
//! tape-backed core representation using [`crate::combinators`].

use std::sync::Arc;

use crate::combinators;
use crate::error::{CoreError, CoreResult};
use crate::expr::Node;
use crate::leaf::{Leaf, Parameter, Variable};
use crate::operator::UnaryFn;

/// A host-language expression tree, tagged by shape.
///
/// [`HostExpr::Unknown`] is the escape hatch for tags the core does not
/// recognize; [`adapt`] turns it into [`CoreError::UnrecognizedHostTag`]
/// rather than panicking, so a host environment can report the offending
/// tag back to its own caller.
#[derive(Debug, Clone)]
pub enum HostExpr {
    /// An integer literal.
    IntLiteral(i64),
    /// A floating-point literal.
    FloatLiteral(f64),
    /// A reference to an existing decision variable.
    Variable(Arc<Variable>),
    /// A reference to an existing model parameter.
    Parameter(Arc<Parameter>),
    /// `coefficient * variable`, as produced by a host layer's term
    /// builder rather than a generic product.
    Monomial {
        /// The scaling factor.
        coefficient: Box<HostExpr>,
        /// The scaled variable.
        variable: Arc<Variable>,
    },
    /// An n-ary product.
    Product(Vec<HostExpr>),
    /// Unary negation.
    Negation(Box<HostExpr>),
    /// `numerator / denominator`.
    Division {
        /// The numerator.
        numerator: Box<HostExpr>,
        /// The denominator.
        denominator: Box<HostExpr>,
    },
    /// An n-ary sum.
    Sum(Vec<HostExpr>),
    /// `base ^ exponent`.
    Power {
        /// The base.
        base: Box<HostExpr>,
        /// The exponent.
        exponent: Box<HostExpr>,
    },
    /// A structured `constant + sum(coefficient_i * variable_i)` form.
    Linear {
        /// The affine constant term.
        constant: Box<HostExpr>,
        /// Each `(variable, coefficient)` pair.
        terms: Vec<(Arc<Variable>, HostExpr)>,
    },
    /// A named unary transcendental function call.
    UnaryFunction {
        /// The function's name, as understood by [`UnaryFn::from_name`].
        name: String,
        /// The function's single argument.
        arg: Box<HostExpr>,
    },
    /// A call to an external function opaque to the core.
    External {
        /// The external function's name.
        name: String,
        /// Index into the host environment's external-function table.
        function_index: Option<u32>,
        /// The call's arguments.
        args: Vec<HostExpr>,
    },
    /// A tag this adapter does not recognize.
    Unknown(String),
}

fn adapt_many(nodes: &[HostExpr]) -> CoreResult<Vec<Node>> {
    nodes.iter().map(adapt).collect()
}

/// Lower a host expression tree into a tape-backed [`Node`], folding
/// constants along the way via [`crate::combinators`].
///
/// # Errors
/// Returns [`CoreError::UnrecognizedHostTag`] for [`HostExpr::Unknown`] and
/// [`CoreError::UnsupportedUnaryFunction`] for an unrecognized
/// [`HostExpr::UnaryFunction`] name. Propagates [`CoreError::DivisionByZero`]
/// from [`combinators::div`] when a [`HostExpr::Division`] has a literal
/// zero denominator.
pub fn adapt(expr: &HostExpr) -> CoreResult<Node> {
    match expr {
        HostExpr::IntLiteral(i) => {
            #[expect(
                clippy::cast_precision_loss,
                reason = "host integer literals in optimization models are far below 2^53"
            )]
            let value = *i as f64;
            Ok(Node::Leaf(Leaf::Constant(value)))
        }
        HostExpr::FloatLiteral(f) => Ok(Node::Leaf(Leaf::Constant(*f))),
        HostExpr::Variable(v) => Ok(Node::Leaf(Leaf::Variable(Arc::clone(v)))),
        HostExpr::Parameter(p) => Ok(Node::Leaf(Leaf::Parameter(Arc::clone(p)))),
        HostExpr::Monomial {
            coefficient,
            variable,
        } => {
            let coefficient = adapt(coefficient)?;
            let variable = Node::Leaf(Leaf::Variable(Arc::clone(variable)));
            combinators::mul(coefficient, variable)
        }
        HostExpr::Product(factors) => {
            if factors.is_empty() {
                return Err(CoreError::ArityMismatch {
                    tag: "Product".to_owned(),
                    expected: 1,
                    got: 0,
                });
            }
            let mut factors = adapt_many(factors)?.into_iter();
            let first = factors
                .next()
                .expect("just checked factors is non-empty");
            factors.try_fold(first, combinators::mul)
        }
        HostExpr::Negation(inner) => combinators::neg(adapt(inner)?),
        HostExpr::Division {
            numerator,
            denominator,
        } => combinators::div(adapt(numerator)?, adapt(denominator)?),
        HostExpr::Sum(addends) => combinators::sum(adapt_many(addends)?),
        HostExpr::Power { base, exponent } => {
            combinators::pow(adapt(base)?, adapt(exponent)?)
        }
        HostExpr::Linear { constant, terms } => {
            let constant = adapt(constant)?;
            let terms = terms
                .iter()
                .map(|(v, c)| Ok((Arc::clone(v), adapt(c)?)))
                .collect::<CoreResult<Vec<_>>>()?;
            combinators::linear(constant, terms)
        }
        HostExpr::UnaryFunction { name, arg } => {
            let f = UnaryFn::from_name(name).ok_or_else(|| CoreError::UnsupportedUnaryFunction {
                name: name.clone(),
            })?;
            combinators::unary(f, adapt(arg)?)
        }
        HostExpr::External {
            name,
            function_index,
            args,
        } => combinators::external(name.clone(), *function_index, adapt_many(args)?),
        HostExpr::Unknown(tag) => Err(CoreError::UnrecognizedHostTag { tag: tag.clone() }),
    }
}
