#![forbid(unsafe_code)]
//! A flat, append-only operator tape for algebraic expressions.
//!
//! This crate represents an algebraic expression as a topologically ordered
//! vector of operators (an [`Expression`] "tape") rather than as a tree of
//! heap-allocated nodes. Every operand that is itself an operator refers to
//! a strictly earlier slot on the same tape; leaves (variables, parameters,
//! constants) are stored inline on operands, since they are shared across
//! many expressions and outlive any one of them.
//!
//! # What this crate provides
//! - Arithmetic combinators ([`add`], [`sub`], [`mul`], [`div`], [`pow`],
//!   [`neg`], [`unary`], [`sum`], [`linear`], [`external`]) that assemble
//!   tapes with constant-folding applied eagerly.
//! - Polynomial-degree and unique-degree analysis
//!   ([`Expression::propagate_degree`], [`Expression::propagate_unique_degree`]).
//! - A four-part canonical decomposition ([`Expression::generate_repn`])
//!   splitting an expression into constant, linear, quadratic, and
//!   nonlinear parts.
//! - Single-pass scalar evaluation ([`Expression::evaluate`]).
//! - AMPL `.nl` prefix serialization ([`Expression::write_nl_string`]) and a
//!   fully parenthesized infix pretty-printer (`Display`).
//! - A host-language adapter ([`adapt`]) for lowering a foreign expression
//!   tree into this crate's tape representation.
//!
//! # Example
//! ```
//! use exprtape::{add, mul, pow, Leaf, Node, Variable};
//!
//! let x = Variable::new("x", 3.0, 0);
//! let x_node = Node::Leaf(Leaf::Variable(x));
//! let expr = add(
//!     pow(x_node.clone(), Node::Leaf(Leaf::Constant(2.0))).unwrap(),
//!     mul(Node::Leaf(Leaf::Constant(5.0)), x_node).unwrap(),
//! )
//! .unwrap();
//!
//! assert_eq!(expr.evaluate().unwrap(), 3.0_f64.powi(2) + 5.0 * 3.0);
//! ```

pub mod adapter;
pub mod combinators;
pub mod error;
pub mod expr;
pub mod leaf;
pub mod operator;

#[cfg(test)]
mod tests;

pub use adapter::{adapt, HostExpr};
pub use combinators::{add, div, external, linear, mul, neg, pow, sub, sum, unary};
pub use error::{CoreError, CoreResult};
pub use expr::collect::{identify_external_operators, identify_variables, ExternalCall};
pub use expr::repn::{generate_repns, Repn};
pub use expr::{Expression, Node};
pub use leaf::{create_constants, create_params, create_vars, Leaf, Parameter, Variable};
pub use operator::{LinearTerm, Operand, Operator, OperatorKind, UnaryFn};
