//! Single-pass collectors: variable references and external-function calls.

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::leaf::{Leaf, Variable};
use crate::operator::{Operand, OperatorKind};

use super::{Expression, Node};

/// One external-function call site found while walking an expression.
#[derive(Debug, Clone)]
pub struct ExternalCall {
    /// The external function's name.
    pub name: Arc<str>,
    /// Index into the host environment's external-function table, if
    /// known.
    pub function_index: Option<u32>,
    /// Number of operands the call was made with.
    pub arity: usize,
}

fn push_var(v: &Arc<Variable>, seen: &mut FxHashSet<*const Variable>, out: &mut Vec<Arc<Variable>>) {
    if seen.insert(Arc::as_ptr(v)) {
        out.push(Arc::clone(v));
    }
}

fn collect_operand(operand: &Operand, seen: &mut FxHashSet<*const Variable>, out: &mut Vec<Arc<Variable>>) {
    if let Operand::Leaf(Leaf::Variable(v)) = operand {
        push_var(v, seen, out);
    }
}

fn collect_kind(kind: &OperatorKind, seen: &mut FxHashSet<*const Variable>, out: &mut Vec<Arc<Variable>>) {
    match kind {
        OperatorKind::Add(a, b)
        | OperatorKind::Sub(a, b)
        | OperatorKind::Mul(a, b)
        | OperatorKind::Div(a, b)
        | OperatorKind::Pow(a, b) => {
            collect_operand(a, seen, out);
            collect_operand(b, seen, out);
        }
        OperatorKind::Neg(a) | OperatorKind::Unary(_, a) => collect_operand(a, seen, out),
        OperatorKind::Sum(xs) => {
            for x in xs {
                collect_operand(x, seen, out);
            }
        }
        OperatorKind::External { args, .. } => {
            for a in args {
                collect_operand(a, seen, out);
            }
        }
        OperatorKind::Linear { constant, terms } => {
            collect_operand(constant, seen, out);
            for t in terms {
                push_var(&t.variable, seen, out);
                collect_operand(&t.coefficient, seen, out);
            }
        }
    }
}

/// Every distinct variable referenced anywhere in `node`, in first-seen
/// order, deduplicated by identity rather than by name.
#[must_use]
pub fn identify_variables(node: &Node) -> Vec<Arc<Variable>> {
    match node {
        Node::Leaf(Leaf::Variable(v)) => vec![Arc::clone(v)],
        Node::Leaf(_) => Vec::new(),
        Node::Expr(e) => e.with_operators(|ops| {
            let mut seen = FxHashSet::default();
            let mut out = Vec::new();
            for op in ops {
                collect_kind(&op.kind, &mut seen, &mut out);
            }
            out
        }),
    }
}

fn collect_externals(kind: &OperatorKind, out: &mut Vec<ExternalCall>) {
    if let OperatorKind::External {
        name,
        function_index,
        args,
    } = kind
    {
        out.push(ExternalCall {
            name: Arc::clone(name),
            function_index: *function_index,
            arity: args.len(),
        });
    }
}

/// Every external-function call site anywhere in `node`, in tape order.
#[must_use]
pub fn identify_external_operators(node: &Node) -> Vec<ExternalCall> {
    match node {
        Node::Leaf(_) => Vec::new(),
        Node::Expr(e) => e.with_operators(|ops| {
            let mut out = Vec::new();
            for op in ops {
                collect_externals(&op.kind, &mut out);
            }
            out
        }),
    }
}

impl Expression {
    /// Every distinct variable referenced on this tape; see
    /// [`identify_variables`].
    #[must_use]
    pub fn identify_variables(&self) -> Vec<Arc<Variable>> {
        identify_variables(&Node::Expr(self.clone()))
    }

    /// Every external-function call site on this tape; see
    /// [`identify_external_operators`].
    #[must_use]
    pub fn identify_external_operators(&self) -> Vec<ExternalCall> {
        identify_external_operators(&Node::Expr(self.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert exact collected sets")]
mod tests {
    use super::*;
    use crate::combinators::{add, external, mul};

    fn var(name: &str, value: f64) -> Node {
        Node::Leaf(Leaf::Variable(Variable::new(name, value, 0)))
    }

    #[test]
    fn identify_variables_deduplicates_repeated_references() {
        let x = var("x", 1.0);
        let y = var("y", 2.0);
        let expr = add(mul(x.clone(), x).unwrap(), y).unwrap();
        let found = identify_variables(&expr);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn identify_variables_ignores_parameters_and_constants() {
        let p = Node::Leaf(Leaf::Parameter(crate::leaf::Parameter::new("a", 1.0)));
        let c = Node::Leaf(Leaf::Constant(2.0));
        let expr = add(p, c).unwrap();
        assert!(identify_variables(&expr).is_empty());
    }

    #[test]
    fn identify_variables_sees_through_linear_operator_terms() {
        let v = Variable::new("x", 1.0, 0);
        let expr = crate::combinators::linear(
            Node::Leaf(Leaf::Constant(0.0)),
            vec![(Arc::clone(&v), Node::Leaf(Leaf::Constant(2.0)))],
        )
        .unwrap();
        let found = identify_variables(&expr);
        assert_eq!(found.len(), 1);
        assert!(Arc::ptr_eq(&found[0], &v));
    }

    #[test]
    fn identify_external_operators_finds_every_call_site() {
        let x = var("x", 1.0);
        let y = var("y", 2.0);
        let call_a = external("f", Some(0), vec![x]).unwrap();
        let call_b = external("g", None, vec![y]).unwrap();
        let expr = add(call_a, call_b).unwrap();
        let calls = identify_external_operators(&expr);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name.as_ref(), "f");
        assert_eq!(calls[1].name.as_ref(), "g");
    }

    #[test]
    fn leaf_node_has_no_external_calls() {
        let x = var("x", 1.0);
        assert!(identify_external_operators(&x).is_empty());
    }
}
