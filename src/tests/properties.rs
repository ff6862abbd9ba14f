//! `quickcheck`-based property tests for the universal properties in the
//! system specification: fold commutativity and tape monotonicity under
//! randomly generated leaf values and combinator chains.

#![allow(
    clippy::unwrap_used,
    clippy::float_cmp,
    reason = "properties compare freshly folded literals against the same scalar arithmetic"
)]

use quickcheck::{Arbitrary, Gen, TestResult};

use crate::operator::{Operand, OperatorKind};
use crate::{add, div, mul, pow, sub};
use crate::{Leaf, Node, Variable};

fn constant_node(value: f64) -> Node {
    Node::Leaf(Leaf::Constant(value))
}

/// A finite `f64` scaled down from a random `i32`, so every generated value
/// is representable and free of NaN/infinity edge cases that would make
/// equality assertions meaningless.
#[derive(Debug, Clone, Copy)]
struct Finite(f64);

impl Arbitrary for Finite {
    fn arbitrary(g: &mut Gen) -> Self {
        let raw = i32::arbitrary(g);
        Finite(f64::from(raw) / 1000.0)
    }
}

fn operands_of(kind: &OperatorKind) -> Vec<Operand> {
    match kind {
        OperatorKind::Add(a, b)
        | OperatorKind::Sub(a, b)
        | OperatorKind::Mul(a, b)
        | OperatorKind::Div(a, b)
        | OperatorKind::Pow(a, b) => vec![a.clone(), b.clone()],
        OperatorKind::Neg(a) | OperatorKind::Unary(_, a) => vec![a.clone()],
        OperatorKind::Sum(xs) => xs.clone(),
        OperatorKind::Linear { constant, terms } => {
            let mut v = vec![constant.clone()];
            v.extend(terms.iter().map(|t| t.coefficient.clone()));
            v
        }
        OperatorKind::External { args, .. } => args.clone(),
    }
}

fn is_monotonic(expr: &crate::Expression) -> bool {
    expr.with_operators(|ops| {
        ops.iter().enumerate().all(|(i, op)| {
            operands_of(&op.kind)
                .iter()
                .all(|operand| !matches!(operand, Operand::Ref(j) if *j as usize >= i))
        })
    })
}

quickcheck::quickcheck! {
    fn fold_add_matches_scalar_addition(a: Finite, b: Finite) -> bool {
        add(constant_node(a.0), constant_node(b.0)).unwrap().as_literal() == Some(a.0 + b.0)
    }

    fn fold_sub_matches_scalar_subtraction(a: Finite, b: Finite) -> bool {
        sub(constant_node(a.0), constant_node(b.0)).unwrap().as_literal() == Some(a.0 - b.0)
    }

    fn fold_mul_matches_scalar_multiplication(a: Finite, b: Finite) -> bool {
        mul(constant_node(a.0), constant_node(b.0)).unwrap().as_literal() == Some(a.0 * b.0)
    }

    fn fold_div_matches_scalar_division_for_nonzero_denominators(a: Finite, b: Finite) -> TestResult {
        if b.0 == 0.0 {
            return TestResult::discard();
        }
        TestResult::from_bool(
            div(constant_node(a.0), constant_node(b.0)).unwrap().as_literal() == Some(a.0 / b.0),
        )
    }

    fn fold_pow_matches_scalar_powf(a: Finite, b: Finite) -> TestResult {
        if a.0 == 0.0 || a.0 == 1.0 || b.0 == 0.0 || b.0 == 1.0 {
            return TestResult::discard();
        }
        if a.0 < 0.0 && b.0.fract() != 0.0 {
            // NaN != NaN would make the equality check meaningless here.
            return TestResult::discard();
        }
        let expected = a.0.powf(b.0);
        TestResult::from_bool(
            pow(constant_node(a.0), constant_node(b.0)).unwrap().as_literal() == Some(expected),
        )
    }

    fn tape_stays_monotonic_after_random_combinator_chain(ops: Vec<u8>) -> bool {
        let x = Node::Leaf(Leaf::Variable(Variable::new("x", 1.0, 0)));
        let mut acc = x;
        for op in ops.iter().take(30) {
            let c = Node::Leaf(Leaf::Constant(f64::from(*op) + 1.0));
            acc = match op % 3 {
                0 => add(acc, c),
                1 => sub(acc, c),
                _ => mul(acc, c),
            }
            .unwrap();
        }
        match acc {
            Node::Leaf(_) => true,
            Node::Expr(e) => is_monotonic(&e),
        }
    }
}
