//! Polynomial-degree and unique-degree propagation.
//!
//! Both passes walk a tape once, left to right, writing their result into
//! the operator's own `degree` / `unique_degree` scratch [`std::cell::Cell`]
//! fields. Because a tape is topologically ordered, every operand an
//! operator at position `i` refers to has already been visited by the time
//! position `i` is reached, so neither pass needs recursion or a separate
//! value buffer.

use crate::leaf::Leaf;
use crate::operator::{Operand, Operator, OperatorKind};

use super::Expression;

/// Saturating "nonlinear" degree sentinel.
pub const NONLINEAR: u8 = 3;

impl Expression {
    /// Run [`propagate_degree`] over this tape.
    pub fn propagate_degree(&self) {
        self.with_operators(propagate_degree);
    }

    /// Run [`propagate_unique_degree`] over this tape.
    ///
    /// Requires [`Expression::propagate_degree`] to have already run: the
    /// `Add`/`Sub`/`Sum` rule compares operand degrees.
    pub fn propagate_unique_degree(&self) {
        self.with_operators(propagate_unique_degree);
    }
}

fn degree_of(ops: &[Operator], operand: &Operand) -> u8 {
    match operand {
        Operand::Leaf(l) => l.degree(),
        Operand::Ref(i) => ops[*i as usize].degree.get(),
    }
}

/// Degree-0 operands (pure constants/parameters) carry a numeric value the
/// `Pow` rule needs in order to tell an integer exponent from a fractional
/// one. This walks such a (necessarily small, variable-free) subtree
/// directly rather than threading a value buffer through the whole pass.
fn operand_value(ops: &[Operator], operand: &Operand) -> f64 {
    match operand {
        Operand::Leaf(l) => l.value(),
        Operand::Ref(i) => operator_value(ops, &ops[*i as usize]),
    }
}

fn operator_value(ops: &[Operator], op: &Operator) -> f64 {
    match &op.kind {
        OperatorKind::Add(a, b) => operand_value(ops, a) + operand_value(ops, b),
        OperatorKind::Sub(a, b) => operand_value(ops, a) - operand_value(ops, b),
        OperatorKind::Mul(a, b) => operand_value(ops, a) * operand_value(ops, b),
        OperatorKind::Div(a, b) => operand_value(ops, a) / operand_value(ops, b),
        OperatorKind::Pow(a, b) => operand_value(ops, a).powf(operand_value(ops, b)),
        OperatorKind::Neg(a) => -operand_value(ops, a),
        OperatorKind::Unary(f, a) => f.apply(operand_value(ops, a)),
        OperatorKind::Sum(xs) => xs.iter().map(|x| operand_value(ops, x)).sum(),
        OperatorKind::Linear { .. } | OperatorKind::External { .. } => {
            // Never reached: both are always assigned degree >= 1, so a
            // degree-0 caller never descends into one of these.
            0.0
        }
    }
}

fn degree_of_pow(ops: &[Operator], base: &Operand, exponent: &Operand) -> u8 {
    if degree_of(ops, exponent) != 0 {
        return NONLINEAR;
    }
    let value = operand_value(ops, exponent);
    if value.fract() == 0.0 && value >= 0.0 {
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "value.fract() == 0.0 && value >= 0.0 guards a nonnegative integer exponent"
        )]
        let int_exp = value as u32;
        let base_degree = u32::from(degree_of(ops, base));
        u8::try_from(base_degree.saturating_mul(int_exp)).unwrap_or(NONLINEAR).min(NONLINEAR)
    } else {
        NONLINEAR
    }
}

/// Propagate polynomial degree across a tape's operators, per the table in
/// the system specification: `Add`/`Sub` take the max of their operands,
/// `Mul` sums (saturating at [`NONLINEAR`]), `Div` is the numerator's
/// degree unless the denominator is non-constant, `Pow` depends on whether
/// the exponent is a nonnegative integer constant, and transcendental
/// unary functions are degree 0 only when their argument is.
pub fn propagate_degree(ops: &[Operator]) {
    for (i, op) in ops.iter().enumerate() {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "tapes are bounded by realistic model sizes, far below u32::MAX"
        )]
        let idx = i as u32;
        op.index.set(idx);
        let degree = match &op.kind {
            OperatorKind::Add(a, b) | OperatorKind::Sub(a, b) => {
                degree_of(ops, a).max(degree_of(ops, b))
            }
            OperatorKind::Mul(a, b) => (degree_of(ops, a) + degree_of(ops, b)).min(NONLINEAR),
            OperatorKind::Div(a, b) => {
                let denom_degree = degree_of(ops, b);
                if denom_degree == 0 {
                    degree_of(ops, a)
                } else {
                    degree_of(ops, a).max(NONLINEAR.saturating_mul(denom_degree)).min(NONLINEAR)
                }
            }
            OperatorKind::Pow(a, b) => degree_of_pow(ops, a, b),
            OperatorKind::Neg(a) => degree_of(ops, a),
            OperatorKind::Unary(_, a) => {
                if degree_of(ops, a) == 0 {
                    0
                } else {
                    NONLINEAR
                }
            }
            OperatorKind::Sum(xs) => xs.iter().map(|x| degree_of(ops, x)).max().unwrap_or(0),
            OperatorKind::Linear { .. } => 1,
            OperatorKind::External { .. } => NONLINEAR,
        };
        op.degree.set(degree);
    }
}

fn unique_of(ops: &[Operator], operand: &Operand) -> bool {
    match operand {
        Operand::Leaf(_) => true,
        Operand::Ref(i) => ops[*i as usize].unique_degree.get(),
    }
}

/// Propagate the unique-degree flag across a tape's operators: `true` means
/// every summand or factor consolidated at this node already shares the
/// node's own degree, so [`crate::expr::repn`] can promote the whole
/// subtree into a single `Repn` slot instead of recursively decomposing
/// it.
pub fn propagate_unique_degree(ops: &[Operator]) {
    for op in ops {
        let unique = match &op.kind {
            OperatorKind::Add(a, b) | OperatorKind::Sub(a, b) => {
                unique_of(ops, a) && unique_of(ops, b) && degree_of(ops, a) == degree_of(ops, b)
            }
            OperatorKind::Sum(xs) => {
                let mut it = xs.iter();
                match it.next() {
                    None => true,
                    Some(first) => {
                        let first_degree = degree_of(ops, first);
                        unique_of(ops, first)
                            && it.all(|x| unique_of(ops, x) && degree_of(ops, x) == first_degree)
                    }
                }
            }
            OperatorKind::Mul(a, b) | OperatorKind::Div(a, b) | OperatorKind::Pow(a, b) => {
                unique_of(ops, a) && unique_of(ops, b)
            }
            OperatorKind::Neg(a) | OperatorKind::Unary(_, a) => unique_of(ops, a),
            OperatorKind::Linear { constant, .. } => {
                matches!(constant, Operand::Leaf(Leaf::Constant(c)) if *c == 0.0)
            }
            OperatorKind::External { args, .. } => args.iter().all(|a| unique_of(ops, a)),
        };
        op.unique_degree.set(unique);
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    reason = "tests assert exact degree values"
)]
mod tests {
    use crate::combinators::{add, div, mul, pow, sum, unary};
    use crate::expr::Node;
    use crate::leaf::{Leaf, Variable};
    use crate::operator::UnaryFn;

    fn var(name: &str, value: f64) -> Node {
        Node::Leaf(Leaf::Variable(Variable::new(name, value, 0)))
    }

    fn constant(value: f64) -> Node {
        Node::Leaf(Leaf::Constant(value))
    }

    fn degree_of(node: &Node) -> u8 {
        match node {
            Node::Leaf(l) => l.degree(),
            Node::Expr(e) => {
                e.propagate_degree();
                e.with_operators(|ops| ops.last().expect("tape non-empty").degree.get())
            }
        }
    }

    #[test]
    fn quadratic_product_of_two_linear_terms_is_degree_two() {
        let x = var("x", 3.0);
        let y = var("y", 4.0);
        let expr = mul(x, y).unwrap();
        assert_eq!(degree_of(&expr), 2);
    }

    #[test]
    fn division_by_variable_denominator_is_nonlinear() {
        let x = var("x", 1.0);
        let y = var("y", 2.0);
        let expr = div(x, y).unwrap();
        assert_eq!(degree_of(&expr), super::NONLINEAR);
    }

    #[test]
    fn integer_power_multiplies_base_degree() {
        let x = var("x", 2.0);
        let expr = pow(x, constant(3.0)).unwrap();
        assert_eq!(degree_of(&expr), 3.min(super::NONLINEAR));
    }

    #[test]
    fn non_integer_power_is_nonlinear() {
        let x = var("x", 4.0);
        let expr = pow(x, constant(0.5)).unwrap();
        assert_eq!(degree_of(&expr), super::NONLINEAR);
    }

    #[test]
    fn unary_of_constant_argument_is_degree_zero() {
        let expr = unary(UnaryFn::Sin, constant(0.5)).unwrap();
        assert_eq!(degree_of(&expr), 0);
    }

    #[test]
    fn unary_of_variable_argument_is_nonlinear() {
        let x = var("x", 0.5);
        let expr = unary(UnaryFn::Sin, x).unwrap();
        assert_eq!(degree_of(&expr), super::NONLINEAR);
    }

    #[test]
    fn sum_degree_is_max_of_summands() {
        let x = var("x", 1.0);
        let y = var("y", 2.0);
        let expr = sum(vec![x.clone(), mul(x, y).unwrap()]).unwrap();
        assert_eq!(degree_of(&expr), 2);
    }

    #[test]
    fn add_of_same_degree_terms_is_unique() {
        let x = var("x", 1.0);
        let y = var("y", 2.0);
        let expr = add(x, y).unwrap();
        let Node::Expr(e) = expr else { panic!("expected a tape") };
        e.propagate_degree();
        e.propagate_unique_degree();
        e.with_operators(|ops| {
            assert!(ops.last().expect("tape non-empty").unique_degree.get());
        });
    }

    #[test]
    fn sum_of_mixed_degree_terms_is_not_unique() {
        let x = var("x", 1.0);
        let y = var("y", 2.0);
        let expr = add(x.clone(), mul(x, y).unwrap()).unwrap();
        let Node::Expr(e) = expr else { panic!("expected a tape") };
        e.propagate_degree();
        e.propagate_unique_degree();
        e.with_operators(|ops| {
            assert!(!ops.last().expect("tape non-empty").unique_degree.get());
        });
    }
}
