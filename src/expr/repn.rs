//! Four-part canonical decomposition: constant + linear + quadratic + nonlinear.

use std::sync::Arc;

use crate::combinators;
use crate::error::CoreResult;
use crate::leaf::Leaf;
use crate::operator::{Operand, Operator, OperatorKind};

use super::degree::{propagate_degree, propagate_unique_degree, NONLINEAR};
use super::{Expression, Node};

/// A polynomial decomposition of an expression into four additive slots,
/// each of a known degree band.
///
/// `constant + linear + quadratic + nonlinear` evaluates to the same value
/// as the original expression. Unused slots hold the literal constant
/// zero.
#[derive(Debug, Clone)]
pub struct Repn {
    /// The degree-0 part.
    pub constant: Node,
    /// The degree-1 part.
    pub linear: Node,
    /// The degree-2 part.
    pub quadratic: Node,
    /// Everything of degree 3 or higher, or otherwise not cleanly
    /// decomposable (non-constant division, non-integer or non-constant
    /// powers, transcendental functions of a non-constant argument,
    /// external calls).
    pub nonlinear: Node,
}

impl Repn {
    fn zero() -> Self {
        let z = || Node::Leaf(Leaf::Constant(0.0));
        Self {
            constant: z(),
            linear: z(),
            quadratic: z(),
            nonlinear: z(),
        }
    }

    fn from_leaf(l: &Leaf) -> Self {
        let mut r = Self::zero();
        match l {
            Leaf::Variable(_) => r.linear = Node::Leaf(l.clone()),
            Leaf::Parameter(_) | Leaf::Constant(_) => r.constant = Node::Leaf(l.clone()),
        }
        r
    }

    fn from_degree_node(node: Node, degree: u8) -> Self {
        let mut r = Self::zero();
        match degree {
            0 => r.constant = node,
            1 => r.linear = node,
            2 => r.quadratic = node,
            _ => r.nonlinear = node,
        }
        r
    }

    fn nonlinear_only(node: Node) -> Self {
        let mut r = Self::zero();
        r.nonlinear = node;
        r
    }

    fn is_pure_constant(&self) -> bool {
        is_zero_node(&self.linear) && is_zero_node(&self.quadratic) && is_zero_node(&self.nonlinear)
    }

    fn add(self, other: Self) -> CoreResult<Self> {
        Ok(Self {
            constant: combinators::add(self.constant, other.constant)?,
            linear: combinators::add(self.linear, other.linear)?,
            quadratic: combinators::add(self.quadratic, other.quadratic)?,
            nonlinear: combinators::add(self.nonlinear, other.nonlinear)?,
        })
    }

    fn sub(self, other: Self) -> CoreResult<Self> {
        Ok(Self {
            constant: combinators::sub(self.constant, other.constant)?,
            linear: combinators::sub(self.linear, other.linear)?,
            quadratic: combinators::sub(self.quadratic, other.quadratic)?,
            nonlinear: combinators::sub(self.nonlinear, other.nonlinear)?,
        })
    }

    fn neg(self) -> CoreResult<Self> {
        Ok(Self {
            constant: combinators::neg(self.constant)?,
            linear: combinators::neg(self.linear)?,
            quadratic: combinators::neg(self.quadratic)?,
            nonlinear: combinators::neg(self.nonlinear)?,
        })
    }

    fn div_by_constant(self, denom: Node) -> CoreResult<Self> {
        Ok(Self {
            constant: combinators::div(self.constant, denom.clone())?,
            linear: combinators::div(self.linear, denom.clone())?,
            quadratic: combinators::div(self.quadratic, denom.clone())?,
            nonlinear: combinators::div(self.nonlinear, denom)?,
        })
    }

    /// Full polynomial cross-product: every pairwise product of `self` and
    /// `other`'s four slots, bucketed by the sum of the two slots' degree
    /// bands (saturating at [`NONLINEAR`]).
    fn mul(self, other: Self) -> CoreResult<Self> {
        let lhs = [
            (0u8, self.constant),
            (1u8, self.linear),
            (2u8, self.quadratic),
            (NONLINEAR, self.nonlinear),
        ];
        let rhs = [
            (0u8, other.constant),
            (1u8, other.linear),
            (2u8, other.quadratic),
            (NONLINEAR, other.nonlinear),
        ];
        let mut r = Self::zero();
        for (da, a) in &lhs {
            if is_zero_node(a) {
                continue;
            }
            for (db, b) in &rhs {
                if is_zero_node(b) {
                    continue;
                }
                let product = combinators::mul(a.clone(), b.clone())?;
                let slot = (*da + *db).min(NONLINEAR);
                match slot {
                    0 => r.constant = combinators::add(r.constant, product)?,
                    1 => r.linear = combinators::add(r.linear, product)?,
                    2 => r.quadratic = combinators::add(r.quadratic, product)?,
                    _ => r.nonlinear = combinators::add(r.nonlinear, product)?,
                }
            }
        }
        Ok(r)
    }
}

fn is_zero_node(node: &Node) -> bool {
    node.is_zero_literal()
}

fn operand_node(ops: &[Operator], operand: &Operand) -> Node {
    match operand {
        Operand::Leaf(l) => Node::Leaf(l.clone()),
        Operand::Ref(i) => Node::Expr(Expression::subtape_from_prefix(ops, *i)),
    }
}

fn degree_of(ops: &[Operator], operand: &Operand) -> u8 {
    match operand {
        Operand::Leaf(l) => l.degree(),
        Operand::Ref(i) => ops[*i as usize].degree.get(),
    }
}

fn repn_operand(ops: &[Operator], cache: &[Option<Repn>], operand: &Operand) -> Repn {
    match operand {
        Operand::Leaf(l) => Repn::from_leaf(l),
        Operand::Ref(i) => cache[*i as usize]
            .clone()
            .expect("tape is topologically ordered: every operand was visited already"),
    }
}

fn repn_for_slot(ops: &[Operator], cache: &[Option<Repn>], i: usize) -> CoreResult<Repn> {
    let op = &ops[i];
    #[expect(
        clippy::cast_possible_truncation,
        reason = "tapes are bounded by realistic model sizes, far below u32::MAX"
    )]
    let index = i as u32;

    if let OperatorKind::External { .. } = &op.kind {
        return Ok(Repn::nonlinear_only(Node::Expr(
            Expression::subtape_from_prefix(ops, index),
        )));
    }

    if op.unique_degree.get() {
        let node = Node::Expr(Expression::subtape_from_prefix(ops, index));
        return Ok(Repn::from_degree_node(node, op.degree.get()));
    }

    let repn = match &op.kind {
        OperatorKind::Add(a, b) => {
            repn_operand(ops, cache, a).add(repn_operand(ops, cache, b))?
        }
        OperatorKind::Sub(a, b) => {
            repn_operand(ops, cache, a).sub(repn_operand(ops, cache, b))?
        }
        OperatorKind::Sum(xs) => {
            let mut constants = Vec::with_capacity(xs.len());
            let mut linears = Vec::with_capacity(xs.len());
            let mut quadratics = Vec::with_capacity(xs.len());
            let mut nonlinears = Vec::with_capacity(xs.len());
            for x in xs {
                let r = repn_operand(ops, cache, x);
                constants.push(r.constant);
                linears.push(r.linear);
                quadratics.push(r.quadratic);
                nonlinears.push(r.nonlinear);
            }
            Repn {
                constant: combinators::sum(constants)?,
                linear: combinators::sum(linears)?,
                quadratic: combinators::sum(quadratics)?,
                nonlinear: combinators::sum(nonlinears)?,
            }
        }
        OperatorKind::Mul(a, b) => {
            repn_operand(ops, cache, a).mul(repn_operand(ops, cache, b))?
        }
        OperatorKind::Div(a, b) => {
            let denom_degree = degree_of(ops, b);
            if denom_degree == 0 {
                repn_operand(ops, cache, a).div_by_constant(operand_node(ops, b))?
            } else {
                Repn::nonlinear_only(Node::Expr(Expression::subtape_from_prefix(ops, index)))
            }
        }
        OperatorKind::Pow(a, b) => match b {
            Operand::Leaf(Leaf::Constant(e)) if *e == 0.0 => {
                Repn::from_degree_node(Node::Leaf(Leaf::Constant(1.0)), 0)
            }
            Operand::Leaf(Leaf::Constant(e)) if *e == 1.0 => repn_operand(ops, cache, a),
            Operand::Leaf(Leaf::Constant(e)) if *e == 2.0 => {
                let ra = repn_operand(ops, cache, a);
                ra.clone().mul(ra)?
            }
            _ => Repn::nonlinear_only(Node::Expr(Expression::subtape_from_prefix(ops, index))),
        },
        OperatorKind::Neg(a) => repn_operand(ops, cache, a).neg()?,
        OperatorKind::Unary(f, a) => {
            let ra = repn_operand(ops, cache, a);
            if ra.is_pure_constant() {
                let folded = combinators::unary(*f, ra.constant)?;
                Repn::from_degree_node(folded, 0)
            } else {
                Repn::nonlinear_only(Node::Expr(Expression::subtape_from_prefix(ops, index)))
            }
        }
        OperatorKind::Linear { constant, terms } => {
            let const_node = operand_node(ops, constant);
            let linear_terms: Vec<(Arc<_>, Node)> = terms
                .iter()
                .map(|t| (Arc::clone(&t.variable), operand_node(ops, &t.coefficient)))
                .collect();
            let linear_node =
                combinators::linear(Node::Leaf(Leaf::Constant(0.0)), linear_terms)?;
            let mut r = Repn::zero();
            r.constant = const_node;
            r.linear = linear_node;
            r
        }
        // Already handled by the early return above; kept only so the
        // match stays exhaustive against `OperatorKind`.
        OperatorKind::External { .. } => {
            Repn::nonlinear_only(Node::Expr(Expression::subtape_from_prefix(ops, index)))
        }
    };
    Ok(repn)
}

impl Expression {
    /// Decompose this tape into its canonical four-part [`Repn`].
    ///
    /// Runs [`propagate_degree`] and [`propagate_unique_degree`] first, then
    /// a single forward pass building each slot's `Repn` from its
    /// already-computed operands.
    ///
    /// # Errors
    /// Propagates any [`crate::error::CoreError`] raised while folding or
    /// re-assembling a slot's sub-expression (division by a literal zero
    /// cannot occur here: every division this pass performs is by an
    /// already-folded nonzero constant).
    pub fn generate_repn(&self) -> CoreResult<Repn> {
        self.with_operators(|ops| {
            propagate_degree(ops);
            propagate_unique_degree(ops);
            let mut cache: Vec<Option<Repn>> = vec![None; ops.len()];
            for i in 0..ops.len() {
                let r = repn_for_slot(ops, &cache, i)?;
                cache[i] = Some(r);
            }
            Ok(cache
                .into_iter()
                .next_back()
                .flatten()
                .expect("just computed every slot including the last"))
        })
    }
}

impl Node {
    /// Decompose this node into its canonical four-part [`Repn`].
    ///
    /// # Errors
    /// See [`Expression::generate_repn`].
    pub fn generate_repn(&self) -> CoreResult<Repn> {
        match self {
            Node::Leaf(l) => Ok(Repn::from_leaf(l)),
            Node::Expr(e) => e.generate_repn(),
        }
    }
}

/// Batch form of [`Node::generate_repn`], the outward host-glue entry point:
/// decompose every expression in `exprs`, in order.
///
/// # Errors
/// Propagates the first [`crate::error::CoreError`] encountered, if any.
pub fn generate_repns(exprs: &[Node]) -> CoreResult<Vec<Repn>> {
    exprs.iter().map(Node::generate_repn).collect()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::float_cmp,
    reason = "tests assert exact reconstructed values and zeroed slots"
)]
mod tests {
    use super::*;
    use crate::combinators::{add, mul, pow, sum, unary};
    use crate::leaf::{Parameter, Variable};
    use crate::operator::UnaryFn;

    fn var(name: &str, value: f64) -> Node {
        Node::Leaf(Leaf::Variable(Variable::new(name, value, 0)))
    }

    fn constant(value: f64) -> Node {
        Node::Leaf(Leaf::Constant(value))
    }

    fn is_zero(node: &Node) -> bool {
        node.evaluate().unwrap() == 0.0
    }

    #[test]
    fn evaluation_matches_repn_reconstruction() {
        let x = var("x", 3.0);
        let y = var("y", 4.0);
        let expr = add(unary(UnaryFn::Sin, x.clone()).unwrap(), mul(x, y).unwrap()).unwrap();
        let direct = expr.evaluate().unwrap();
        let r = expr.generate_repn().unwrap();
        let reconstructed = add(add(add(r.constant, r.linear).unwrap(), r.quadratic).unwrap(), r.nonlinear)
            .unwrap()
            .evaluate()
            .unwrap();
        assert!((direct - reconstructed).abs() < 1e-12);
    }

    #[test]
    fn thousand_term_linear_sum_decomposes_to_pure_linear() {
        let a = Node::Leaf(Leaf::Parameter(Parameter::new("a", 2.0)));
        let x = var("x", 3.0);
        let terms: Vec<Node> = (0..1000).map(|_| mul(a.clone(), x.clone()).unwrap()).collect();
        let expr = sum(terms).unwrap();
        assert_eq!(expr.evaluate().unwrap(), 6000.0);
        let r = expr.generate_repn().unwrap();
        assert_eq!(r.linear.evaluate().unwrap(), 6000.0);
        assert!(is_zero(&r.quadratic));
        assert!(is_zero(&r.nonlinear));
    }

    #[test]
    fn squared_binomial_expands_into_all_four_slots() {
        let x = var("x", 3.0);
        let expr = pow(add(x, constant(1.0)).unwrap(), constant(2.0)).unwrap();
        let r = expr.generate_repn().unwrap();
        assert_eq!(r.constant.evaluate().unwrap(), 1.0);
        assert_eq!(r.linear.evaluate().unwrap(), 6.0);
        assert_eq!(r.quadratic.evaluate().unwrap(), 9.0);
        assert!(is_zero(&r.nonlinear));
        assert_eq!(expr.evaluate().unwrap(), 16.0);
    }

    #[test]
    fn sin_plus_product_splits_quadratic_and_nonlinear() {
        let x = var("x", 3.0);
        let y = var("y", 4.0);
        let expr = add(unary(UnaryFn::Sin, x.clone()).unwrap(), mul(x, y).unwrap()).unwrap();
        let r = expr.generate_repn().unwrap();
        assert!(is_zero(&r.linear));
        assert_eq!(r.quadratic.evaluate().unwrap(), 12.0);
        assert!((r.nonlinear.evaluate().unwrap() - 3.0_f64.sin()).abs() < 1e-12);
    }

    #[test]
    fn division_by_variable_collapses_entirely_to_nonlinear() {
        let x = var("x", 3.0);
        let y = var("y", 4.0);
        let expr = crate::combinators::div(x, y).unwrap();
        let r = expr.generate_repn().unwrap();
        assert!(is_zero(&r.constant));
        assert!(is_zero(&r.linear));
        assert!(is_zero(&r.quadratic));
        assert!((r.nonlinear.evaluate().unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn division_by_constant_splits_linear_slot() {
        let x = var("x", 3.0);
        let expr = crate::combinators::div(mul(constant(2.0), x).unwrap(), constant(3.0)).unwrap();
        let r = expr.generate_repn().unwrap();
        assert!((r.linear.evaluate().unwrap() - 2.0).abs() < 1e-12);
        assert!(is_zero(&r.quadratic));
        assert!(is_zero(&r.nonlinear));
    }

    #[test]
    fn degree_one_repn_has_zeroed_quadratic_and_nonlinear() {
        let x = var("x", 3.0);
        let y = var("y", 4.0);
        let expr = add(x, y).unwrap();
        let r = expr.generate_repn().unwrap();
        assert!(is_zero(&r.quadratic));
        assert!(is_zero(&r.nonlinear));
    }

    #[test]
    fn pure_leaf_repn_assigns_to_matching_slot() {
        let x = var("x", 5.0);
        let r = x.generate_repn().unwrap();
        assert_eq!(r.linear.evaluate().unwrap(), 5.0);
        assert!(is_zero(&r.constant));

        let c = constant(5.0);
        let r = c.generate_repn().unwrap();
        assert_eq!(r.constant.evaluate().unwrap(), 5.0);
        assert!(is_zero(&r.linear));
    }

    #[test]
    fn generate_repns_batches_in_order() {
        let x = var("x", 3.0);
        let y = var("y", 4.0);
        let exprs = vec![x, mul(y, constant(2.0)).unwrap()];
        let repns = generate_repns(&exprs).unwrap();
        assert_eq!(repns.len(), 2);
        assert_eq!(repns[0].linear.evaluate().unwrap(), 3.0);
        assert_eq!(repns[1].linear.evaluate().unwrap(), 8.0);
    }
}
