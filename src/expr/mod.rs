//! The flat operator tape ([`Expression`]) and the [`Node`] type combinators build.
//!
//! An `Expression` is an append-only, topologically ordered vector of
//! [`Operator`]s: every operand that is itself an operator refers to a
//! strictly earlier position in the same vector. Leaves (variables,
//! parameters, constants) are stored inline on operands rather than as tape
//! slots, since they are shared across many expressions and never analyzed
//! in isolation.
//!
//! Incremental construction reuses operator records across tapes rather
//! than deep-copying them: [`Expression::copy_expr`] aliases the shared
//! container when it is safe to do so, and [`Expression::extend_operators`]
//! / the combinators in [`crate::combinators`] only fall back to appending
//! fresh copies when a container has already been extended past what this
//! expression recorded.

pub mod collect;
pub mod degree;
pub mod display;
pub mod evaluate;
pub mod nl;
pub mod repn;

use std::cell::RefCell;
use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::leaf::Leaf;
use crate::operator::{Operand, Operator};

/// Either a bare leaf or a tape of operators rooted at its last entry.
///
/// This is the type combinators in [`crate::combinators`] accept and
/// return: a freshly declared variable or constant is a `Leaf`, and every
/// arithmetic combination of nodes produces an `Expr`.
#[derive(Debug, Clone)]
pub enum Node {
    /// A variable, parameter, or constant, not yet part of any tape.
    Leaf(Leaf),
    /// A tape of one or more operators; the root is the last entry.
    Expr(Expression),
}

impl Node {
    /// `true` if this node is a leaf carrying exactly the literal value `0`.
    #[must_use]
    pub fn is_zero_literal(&self) -> bool {
        matches!(self, Node::Leaf(l) if l.is_zero())
    }

    /// `true` if this node is a leaf carrying exactly the literal value `1`.
    #[must_use]
    pub fn is_one_literal(&self) -> bool {
        matches!(self, Node::Leaf(l) if l.is_one())
    }

    /// The node's value as a bare numeric literal, if it is one.
    ///
    /// Only [`Leaf::Constant`] qualifies; parameters are never folded,
    /// since they are named model entities whose display identity the
    /// analyzer and serializer must preserve.
    #[must_use]
    pub fn as_literal(&self) -> Option<f64> {
        match self {
            Node::Leaf(Leaf::Constant(c)) => Some(*c),
            _ => None,
        }
    }
}

/// A flat, append-only operator tape.
///
/// Cloning an `Expression` is cheap: it shares the underlying operator
/// container and merely copies the recorded length, which is exactly the
/// aliasing [`Expression::copy_expr`] relies on.
#[derive(Debug, Clone)]
pub struct Expression {
    ops: Arc<RefCell<Vec<Operator>>>,
    len: usize,
}

impl Expression {
    /// Build a standalone tape from a complete, already-topologically-sound
    /// list of operators.
    pub(crate) fn from_raw(ops: Vec<Operator>) -> Self {
        let len = ops.len();
        Self {
            ops: Arc::new(RefCell::new(ops)),
            len,
        }
    }

    /// An empty tape, ready to receive its first operator via
    /// [`Expression::add_operator`].
    pub(crate) fn empty() -> Self {
        Self::from_raw(Vec::new())
    }

    /// Number of operators this expression's logical view covers.
    #[must_use]
    pub fn operator_count(&self) -> usize {
        self.len
    }

    /// Index of the root operator (the last entry in this expression's
    /// logical prefix).
    #[must_use]
    pub fn root_index(&self) -> u32 {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "tapes are bounded by realistic model sizes, far below u32::MAX"
        )]
        let index = (self.len - 1) as u32;
        index
    }

    /// Run `f` against the slice of operators in this expression's logical
    /// prefix, holding the shared container's borrow only for the duration
    /// of the call.
    pub(crate) fn with_operators<R>(&self, f: impl FnOnce(&[Operator]) -> R) -> R {
        let ops = self.ops.borrow();
        f(&ops[..self.len])
    }

    /// Produce a logical copy of this tape.
    ///
    /// If the underlying container has not been extended past this
    /// expression's recorded length, the copy aliases the same container
    /// (O(1)). Otherwise a fresh container holding exactly the recorded
    /// prefix is built (O(n)).
    #[must_use]
    pub fn copy_expr(&self) -> Self {
        let physical_len = self.ops.borrow().len();
        if physical_len == self.len {
            return Self {
                ops: Arc::clone(&self.ops),
                len: self.len,
            };
        }
        let prefix = self.ops.borrow()[..self.len].to_vec();
        Self::from_raw(prefix)
    }

    /// Append one operator, returning its new tape index.
    ///
    /// Fails if the underlying container has been extended past this
    /// expression's recorded length by another owner: appending would
    /// silently graft this expression's new operator onto a suffix that
    /// does not belong to it.
    pub(crate) fn add_operator(&mut self, op: Operator) -> CoreResult<u32> {
        let mut ops = self.ops.borrow_mut();
        if ops.len() != self.len {
            return Err(CoreError::SharedSuffixAppend);
        }
        ops.push(op);
        self.len += 1;
        Ok(self.root_index())
    }

    /// Append another tape's operators onto this one, rebasing every
    /// `Operand::Ref` in the appended operators by this tape's current
    /// length.
    fn extend_operators(&mut self, other: &Self) -> CoreResult<()> {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "tapes are bounded by realistic model sizes, far below u32::MAX"
        )]
        let offset = self.len as u32;
        let appended: Vec<Operator> = other.with_operators(|other_ops| {
            other_ops
                .iter()
                .map(|op| Operator {
                    index: op.index.clone(),
                    degree: op.degree.clone(),
                    unique_degree: op.unique_degree.clone(),
                    kind: op.kind.rebased(offset),
                })
                .collect()
        });
        let mut ops = self.ops.borrow_mut();
        if ops.len() != self.len {
            return Err(CoreError::SharedSuffixAppend);
        }
        ops.extend(appended);
        self.len += other.len;
        Ok(())
    }

    /// Build a standalone tape containing exactly the prefix `[0, root]` of
    /// `ops`, rooted at `root`.
    ///
    /// Every operand a node at or before `root` references is, by the
    /// tape-monotonicity invariant, also at or before `root`, so this
    /// prefix is always self-contained. Used to promote a unique-degree
    /// subtree, an always-nonlinear external call, or a non-constant
    /// division/power/unary operand into its own freestanding [`Node`].
    pub(crate) fn subtape_from_prefix(ops: &[Operator], root: u32) -> Self {
        let prefix: Vec<Operator> = ops[..=root as usize].to_vec();
        Self::from_raw(prefix)
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.ops, &other.ops) && self.len == other.len
    }
}

/// Splice a list of operand nodes onto a single base tape, returning the
/// base (if any operand was a tape) and the operand list to give the final
/// operator being assembled.
///
/// Picks the first `Expr` operand as the base (aliased via
/// [`Expression::copy_expr`]) and appends every other `Expr` operand onto
/// it, except when an operand shares the base's own container (the common
/// case of a caller reusing a cloned [`Node`], e.g. squaring `x` via
/// `mul(x.clone(), x)`), in which case it is referenced in place instead of
/// being duplicated onto the tape.
#[expect(
    clippy::unreachable,
    reason = "both call sites are preceded by an exhaustive match/position check that rules out the other variant"
)]
fn splice(operands: Vec<Node>) -> CoreResult<(Option<Expression>, Vec<Operand>)> {
    if operands.iter().all(|n| matches!(n, Node::Leaf(_))) {
        let refs = operands
            .into_iter()
            .map(|n| match n {
                Node::Leaf(l) => Operand::Leaf(l),
                Node::Expr(_) => {
                    unreachable!("just checked every operand is a Leaf")
                }
            })
            .collect();
        return Ok((None, refs));
    }

    let base_pos = operands
        .iter()
        .position(|n| matches!(n, Node::Expr(_)))
        .expect("checked above that at least one operand is an Expr");

    let mut slots: Vec<Option<Node>> = operands.into_iter().map(Some).collect();
    let base_node = slots[base_pos]
        .take()
        .expect("each slot is populated exactly once before being taken");
    let mut base = match base_node {
        Node::Expr(e) => e.copy_expr(),
        Node::Leaf(_) => unreachable!("base_pos was chosen to point at an Expr"),
    };

    let mut refs: Vec<Operand> = vec![Operand::Leaf(Leaf::Constant(0.0)); slots.len()];
    refs[base_pos] = Operand::Ref(base.root_index());

    for (i, slot) in slots.iter_mut().enumerate() {
        if i == base_pos {
            continue;
        }
        let node = slot
            .take()
            .expect("each slot is populated exactly once before being taken");
        refs[i] = match node {
            Node::Leaf(l) => Operand::Leaf(l),
            Node::Expr(e) => {
                if Arc::ptr_eq(e.ops_arc(), base.ops_arc()) {
                    Operand::Ref(e.root_index())
                } else {
                    #[expect(
                        clippy::cast_possible_truncation,
                        reason = "tapes are bounded by realistic model sizes, far below u32::MAX"
                    )]
                    let offset = base.len as u32;
                    base.extend_operators(&e)?;
                    Operand::Ref(offset + e.root_index())
                }
            }
        };
    }

    Ok((Some(base), refs))
}

impl Expression {
    fn ops_arc(&self) -> &Arc<RefCell<Vec<Operator>>> {
        &self.ops
    }
}

/// Splice `operands` and wrap them in a single operator built by `kind_fn`,
/// returning the resulting tape as a [`Node`].
pub(crate) fn assemble(
    operands: Vec<Node>,
    kind_fn: impl FnOnce(Vec<Operand>) -> crate::operator::OperatorKind,
) -> CoreResult<Node> {
    let (base, refs) = splice(operands)?;
    let mut base = base.unwrap_or_else(Expression::empty);
    base.add_operator(Operator::new(kind_fn(refs)))?;
    Ok(Node::Expr(base))
}

/// Split a two-element operand vector produced by [`assemble`] into its
/// pair; binary combinators always request exactly two operands.
pub(crate) fn pair(operands: Vec<Operand>) -> (Operand, Operand) {
    let mut it = operands.into_iter();
    let a = it
        .next()
        .expect("assemble was called with exactly two operands");
    let b = it
        .next()
        .expect("assemble was called with exactly two operands");
    (a, b)
}

/// Extract the single operand produced by [`assemble`] for a unary
/// combinator.
pub(crate) fn single(operands: Vec<Operand>) -> Operand {
    operands
        .into_iter()
        .next()
        .expect("assemble was called with exactly one operand")
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::float_cmp,
    clippy::cast_possible_truncation,
    clippy::panic,
    reason = "tests assert exact evaluation and tape-shape results"
)]
mod tests {
    use super::*;
    use crate::combinators::{add, mul};
    use crate::leaf::Variable;

    fn var(name: &str, value: f64) -> Node {
        Node::Leaf(Leaf::Variable(Variable::new(name, value, 0)))
    }

    #[test]
    fn tape_monotonicity_holds_after_splicing_two_expressions() {
        let x = var("x", 3.0);
        let y = var("y", 4.0);
        let lhs = add(x, Node::Leaf(Leaf::Constant(1.0))).unwrap();
        let rhs = add(y, Node::Leaf(Leaf::Constant(2.0))).unwrap();
        let combined = mul(lhs, rhs).unwrap();

        let Node::Expr(expr) = combined else {
            panic!("expected a tape, not a bare leaf");
        };
        expr.with_operators(|ops| {
            for (i, op) in ops.iter().enumerate() {
                for operand in operands_of(&op.kind) {
                    if let Operand::Ref(j) = operand {
                        assert!((j as usize) < i, "operand at slot {j} must precede slot {i}");
                    }
                }
            }
        });
    }

    fn operands_of(kind: &crate::operator::OperatorKind) -> Vec<Operand> {
        use crate::operator::OperatorKind;
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

    #[test]
    fn copy_expr_aliases_container_when_not_extended_past_recorded_length() {
        let x = var("x", 1.0);
        let e1 = add(x, Node::Leaf(Leaf::Constant(1.0))).unwrap();
        let Node::Expr(expr) = e1 else { panic!("expected a tape") };
        let copy = expr.copy_expr();
        assert!(Arc::ptr_eq(&expr.ops, &copy.ops));
        assert_eq!(expr.len, copy.len);
    }

    #[test]
    fn squaring_a_shared_node_references_it_in_place_without_duplication() {
        let x = var("x", 5.0);
        let squared = mul(x.clone(), x).unwrap();
        let Node::Expr(expr) = squared else { panic!("expected a tape") };
        // x is a leaf, so squaring it produces a single Mul operator: one
        // tape slot, no duplication of the (nonexistent) operator for x.
        assert_eq!(expr.operator_count(), 1);
    }

    #[test]
    fn root_index_is_last_slot() {
        let x = var("x", 1.0);
        let y = var("y", 2.0);
        let e = add(x, y).unwrap();
        let Node::Expr(expr) = e else { panic!("expected a tape") };
        assert_eq!(expr.root_index(), expr.operator_count() as u32 - 1);
    }
}
