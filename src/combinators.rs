//! Arithmetic combinators that assemble [`Node`]s with constant-folding.
//!
//! Every combinator here implements one row of the fold-identity table: a
//! handful of cheap special cases (`x+0`, `x*1`, both-operand-constant,
//! …) are checked before falling back to [`crate::expr::assemble`], which
//! splices the operand tapes and appends the new operator.

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::expr::{assemble, pair, single, Node};
use crate::leaf::{Leaf, Variable};
use crate::operator::{LinearTerm, OperatorKind, UnaryFn};

fn constant(value: f64) -> Node {
    Node::Leaf(Leaf::Constant(value))
}

/// `a + b`, folding `x+0`, `0+x`, and constant-plus-constant.
pub fn add(a: Node, b: Node) -> CoreResult<Node> {
    if a.is_zero_literal() {
        return Ok(b);
    }
    if b.is_zero_literal() {
        return Ok(a);
    }
    if let (Some(x), Some(y)) = (a.as_literal(), b.as_literal()) {
        return Ok(constant(x + y));
    }
    assemble(vec![a, b], |r| {
        let (x, y) = pair(r);
        OperatorKind::Add(x, y)
    })
}

/// `a - b`, folding `x-0`, `0-x` (via [`neg`]), and constant-minus-constant.
pub fn sub(a: Node, b: Node) -> CoreResult<Node> {
    if b.is_zero_literal() {
        return Ok(a);
    }
    if a.is_zero_literal() {
        return neg(b);
    }
    if let (Some(x), Some(y)) = (a.as_literal(), b.as_literal()) {
        return Ok(constant(x - y));
    }
    assemble(vec![a, b], |r| {
        let (x, y) = pair(r);
        OperatorKind::Sub(x, y)
    })
}

/// `a * b`, folding `x*1`, `1*x`, `x*0`/`0*x` to `0`, and constant products.
pub fn mul(a: Node, b: Node) -> CoreResult<Node> {
    if a.is_one_literal() {
        return Ok(b);
    }
    if b.is_one_literal() {
        return Ok(a);
    }
    if a.is_zero_literal() || b.is_zero_literal() {
        return Ok(constant(0.0));
    }
    if let (Some(x), Some(y)) = (a.as_literal(), b.as_literal()) {
        return Ok(constant(x * y));
    }
    assemble(vec![a, b], |r| {
        let (x, y) = pair(r);
        OperatorKind::Mul(x, y)
    })
}

/// `a / b`, folding `x/1`, `0/x`, and constant quotients.
///
/// # Errors
/// Returns [`CoreError::DivisionByZero`] if `b` is the literal constant
/// zero.
pub fn div(a: Node, b: Node) -> CoreResult<Node> {
    if b.is_zero_literal() {
        return Err(CoreError::DivisionByZero);
    }
    if b.is_one_literal() {
        return Ok(a);
    }
    if a.is_zero_literal() {
        return Ok(constant(0.0));
    }
    if let (Some(x), Some(y)) = (a.as_literal(), b.as_literal()) {
        return Ok(constant(x / y));
    }
    assemble(vec![a, b], |r| {
        let (x, y) = pair(r);
        OperatorKind::Div(x, y)
    })
}

/// `a ^ b`, folding `x^0`, `x^1`, `0^x`, `1^x`, and constant powers.
pub fn pow(a: Node, b: Node) -> CoreResult<Node> {
    if b.is_zero_literal() {
        return Ok(constant(1.0));
    }
    if b.is_one_literal() {
        return Ok(a);
    }
    if a.is_zero_literal() {
        return Ok(constant(0.0));
    }
    if a.is_one_literal() {
        return Ok(constant(1.0));
    }
    if let (Some(x), Some(y)) = (a.as_literal(), b.as_literal()) {
        return Ok(constant(x.powf(y)));
    }
    assemble(vec![a, b], |r| {
        let (x, y) = pair(r);
        OperatorKind::Pow(x, y)
    })
}

/// `-a`, folding a literal constant operand.
pub fn neg(a: Node) -> CoreResult<Node> {
    if let Some(x) = a.as_literal() {
        return Ok(constant(-x));
    }
    assemble(vec![a], |r| OperatorKind::Neg(single(r)))
}

/// Apply a unary transcendental function, folding a literal constant
/// operand.
pub fn unary(f: UnaryFn, a: Node) -> CoreResult<Node> {
    if let Some(x) = a.as_literal() {
        return Ok(constant(f.apply(x)));
    }
    assemble(vec![a], |r| OperatorKind::Unary(f, single(r)))
}

/// An n-ary sum, folding every literal-constant summand into one running
/// constant and collapsing to a single non-constant summand when possible.
pub fn sum(nodes: Vec<Node>) -> CoreResult<Node> {
    let mut constant_acc = 0.0_f64;
    let mut rest: Vec<Node> = Vec::with_capacity(nodes.len());
    for n in nodes {
        if let Some(v) = n.as_literal() {
            constant_acc += v;
        } else {
            rest.push(n);
        }
    }
    match rest.len() {
        0 => Ok(constant(constant_acc)),
        1 if constant_acc == 0.0 => Ok(rest
            .into_iter()
            .next()
            .expect("just checked rest has exactly one element")),
        _ => {
            if constant_acc != 0.0 {
                rest.push(constant(constant_acc));
            }
            assemble(rest, OperatorKind::Sum)
        }
    }
}

/// Build a structured `constant + sum(coefficient_i * variable_i)` node.
///
/// Unlike the other combinators, this does not fold away zero
/// coefficients or a zero constant: `Repn` generation relies on being able
/// to read back the exact terms it assembled.
pub fn linear(constant: Node, terms: Vec<(Arc<Variable>, Node)>) -> CoreResult<Node> {
    let mut operands = Vec::with_capacity(terms.len() + 1);
    operands.push(constant);
    let variables: Vec<Arc<Variable>> = terms.iter().map(|(v, _)| Arc::clone(v)).collect();
    operands.extend(terms.into_iter().map(|(_, c)| c));

    assemble(operands, move |mut refs| {
        let constant = refs.remove(0);
        let terms = variables
            .into_iter()
            .zip(refs)
            .map(|(variable, coefficient)| LinearTerm {
                variable,
                coefficient,
            })
            .collect();
        OperatorKind::Linear { constant, terms }
    })
}

/// Build an opaque call to a named external function.
pub fn external(name: impl Into<Arc<str>>, function_index: Option<u32>, args: Vec<Node>) -> CoreResult<Node> {
    let name = name.into();
    assemble(args, move |refs| OperatorKind::External {
        name,
        function_index,
        args: refs,
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::float_cmp,
    reason = "tests assert exact fold results against literal doubles"
)]
mod tests {
    use super::*;
    use crate::leaf::Variable;

    fn var(name: &str, value: f64) -> Node {
        Node::Leaf(Leaf::Variable(Variable::new(name, value, 0)))
    }

    #[test]
    fn add_zero_identity_returns_same_node() {
        let x = var("x", 3.0);
        let result = add(x.clone(), constant(0.0)).unwrap();
        assert_eq!(result.evaluate().unwrap(), x.evaluate().unwrap());
        assert!(matches!(result, Node::Leaf(Leaf::Variable(_))));
    }

    #[test]
    fn add_both_constants_folds() {
        let result = add(constant(2.0), constant(3.0)).unwrap();
        assert_eq!(result.as_literal(), Some(5.0));
    }

    #[test]
    fn sub_zero_minus_x_negates() {
        let x = var("x", 4.0);
        let result = sub(constant(0.0), x).unwrap();
        assert_eq!(result.evaluate().unwrap(), -4.0);
    }

    #[test]
    fn mul_by_zero_annihilates() {
        let x = var("x", 7.0);
        let result = mul(x, constant(0.0)).unwrap();
        assert_eq!(result.as_literal(), Some(0.0));
    }

    #[test]
    fn mul_by_one_identity() {
        let x = var("x", 7.0);
        let result = mul(x.clone(), constant(1.0)).unwrap();
        assert_eq!(result.evaluate().unwrap(), x.evaluate().unwrap());
    }

    #[test]
    fn div_by_literal_zero_is_fatal() {
        let x = var("x", 1.0);
        assert_eq!(div(x, constant(0.0)).unwrap_err(), CoreError::DivisionByZero);
    }

    #[test]
    fn div_zero_numerator_folds_to_zero() {
        let x = var("x", 5.0);
        let result = div(constant(0.0), x).unwrap();
        assert_eq!(result.as_literal(), Some(0.0));
    }

    #[test]
    fn pow_zero_exponent_is_one() {
        let x = var("x", 9.0);
        let result = pow(x, constant(0.0)).unwrap();
        assert_eq!(result.as_literal(), Some(1.0));
    }

    #[test]
    fn pow_zero_base_is_zero() {
        let x = var("x", 2.0);
        let result = pow(constant(0.0), x).unwrap();
        assert_eq!(result.as_literal(), Some(0.0));
    }

    #[test]
    fn sum_folds_all_constants() {
        let result = sum(vec![constant(1.0), constant(2.0), constant(3.0)]).unwrap();
        assert_eq!(result.as_literal(), Some(6.0));
    }

    #[test]
    fn sum_collapses_single_nonconstant_with_zero_constant() {
        let x = var("x", 8.0);
        let result = sum(vec![x.clone(), constant(0.0)]).unwrap();
        assert_eq!(result.evaluate().unwrap(), x.evaluate().unwrap());
    }

    #[test]
    fn sum_of_thousand_linear_terms_evaluates_correctly() {
        let a = Node::Leaf(Leaf::Parameter(crate::leaf::Parameter::new("a", 2.0)));
        let x = var("x", 3.0);
        let terms: Vec<Node> = (0..1000)
            .map(|_| mul(a.clone(), x.clone()).unwrap())
            .collect();
        let total = sum(terms).unwrap();
        assert_eq!(total.evaluate().unwrap(), 6000.0);
    }

    #[test]
    fn external_is_fatal_to_evaluate() {
        let x = var("x", 1.0);
        let call = external("f", Some(0), vec![x]).unwrap();
        let err = call.evaluate().unwrap_err();
        assert!(matches!(
            err,
            CoreError::ExternalEvaluationUnsupported { .. }
        ));
    }
}
