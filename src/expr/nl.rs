//! AMPL `.nl` prefix serialization.
//!
//! Tokens are emitted one per line via a non-recursive, stack-based prefix
//! traversal: the root is pushed, popped, its opcode written, and its
//! children pushed in reverse order so the leftmost child is the next one
//! popped.

use std::fmt::Write as _;
use std::sync::Arc;

use crate::leaf::{Leaf, Variable};
use crate::operator::{Operand, Operator, OperatorKind, UnaryFn};

use super::Expression;

/// One item of work for the prefix-traversal stack.
///
/// [`NlTask::LinearTerm`] is synthetic: a `LinearOperator` term's
/// `coefficient * variable` pairing is never materialized as a `Mul`
/// operator on the tape, so the NL writer expands it on demand here
/// instead of via [`Operand`].
enum NlTask {
    Operand(Operand),
    LinearTerm {
        coefficient: Operand,
        variable: Arc<Variable>,
    },
}

fn unary_opcode(f: UnaryFn) -> &'static str {
    match f {
        UnaryFn::Tan => "o38",
        UnaryFn::Sin => "o41",
        UnaryFn::Log10 => "o42",
        UnaryFn::Log => "o43",
        UnaryFn::Exp => "o44",
        UnaryFn::Cos => "o46",
        UnaryFn::Atan => "o49",
        UnaryFn::Asin => "o51",
        UnaryFn::Acos => "o53",
    }
}

fn is_zero_operand(operand: &Operand) -> bool {
    matches!(operand, Operand::Leaf(Leaf::Constant(c)) if *c == 0.0)
}

/// Push an n-ary sum's header (`o0` for two addends, `o54 <n>` otherwise)
/// and queue its addends in traversal order.
fn emit_nary_sum(out: &mut String, stack: &mut Vec<NlTask>, addends: Vec<NlTask>) {
    match addends.len() {
        0 => {
            let _ = writeln!(out, "n0");
        }
        1 => {
            let _ = writeln!(out, "o54");
            let _ = writeln!(out, "1");
            stack.extend(addends);
        }
        2 => {
            let _ = writeln!(out, "o0");
            stack.extend(addends.into_iter().rev());
        }
        n => {
            let _ = writeln!(out, "o54");
            let _ = writeln!(out, "{n}");
            stack.extend(addends.into_iter().rev());
        }
    }
}

fn emit_operator(op: &Operator, out: &mut String, stack: &mut Vec<NlTask>) {
    match &op.kind {
        OperatorKind::Add(a, b) => {
            let _ = writeln!(out, "o0");
            stack.push(NlTask::Operand(b.clone()));
            stack.push(NlTask::Operand(a.clone()));
        }
        OperatorKind::Sub(a, b) => {
            let _ = writeln!(out, "o1");
            stack.push(NlTask::Operand(b.clone()));
            stack.push(NlTask::Operand(a.clone()));
        }
        OperatorKind::Mul(a, b) => {
            let _ = writeln!(out, "o2");
            stack.push(NlTask::Operand(b.clone()));
            stack.push(NlTask::Operand(a.clone()));
        }
        OperatorKind::Div(a, b) => {
            let _ = writeln!(out, "o3");
            stack.push(NlTask::Operand(b.clone()));
            stack.push(NlTask::Operand(a.clone()));
        }
        OperatorKind::Pow(a, b) => {
            let _ = writeln!(out, "o5");
            stack.push(NlTask::Operand(b.clone()));
            stack.push(NlTask::Operand(a.clone()));
        }
        OperatorKind::Neg(a) => {
            let _ = writeln!(out, "o16");
            stack.push(NlTask::Operand(a.clone()));
        }
        OperatorKind::Unary(f, a) => {
            let _ = writeln!(out, "{}", unary_opcode(*f));
            stack.push(NlTask::Operand(a.clone()));
        }
        OperatorKind::Sum(xs) => {
            emit_nary_sum(out, stack, xs.iter().cloned().map(NlTask::Operand).collect());
        }
        OperatorKind::Linear { constant, terms } => {
            let mut addends: Vec<NlTask> = Vec::with_capacity(terms.len() + 1);
            if !is_zero_operand(constant) {
                addends.push(NlTask::Operand(constant.clone()));
            }
            for t in terms {
                addends.push(NlTask::LinearTerm {
                    coefficient: t.coefficient.clone(),
                    variable: Arc::clone(&t.variable),
                });
            }
            emit_nary_sum(out, stack, addends);
        }
        OperatorKind::External {
            function_index,
            args,
            ..
        } => {
            let _ = writeln!(out, "f{} {}", function_index.unwrap_or(0), args.len());
            stack.extend(args.iter().cloned().rev().map(NlTask::Operand));
        }
    }
}

fn emit_task(ops: &[Operator], task: NlTask, out: &mut String, stack: &mut Vec<NlTask>) {
    match task {
        NlTask::Operand(Operand::Leaf(Leaf::Variable(v))) => {
            let _ = writeln!(out, "v{}", v.index());
        }
        NlTask::Operand(Operand::Leaf(Leaf::Parameter(p))) => {
            let _ = writeln!(out, "n{}", p.value());
        }
        NlTask::Operand(Operand::Leaf(Leaf::Constant(c))) => {
            let _ = writeln!(out, "n{c}");
        }
        NlTask::Operand(Operand::Ref(i)) => emit_operator(&ops[i as usize], out, stack),
        NlTask::LinearTerm {
            coefficient,
            variable,
        } => {
            let _ = writeln!(out, "o2");
            stack.push(NlTask::Operand(Operand::Leaf(Leaf::Variable(variable))));
            stack.push(NlTask::Operand(coefficient));
        }
    }
}

impl Expression {
    /// Serialize this tape as AMPL `.nl` prefix opcodes, one token per
    /// line.
    #[must_use]
    pub fn write_nl_string(&self) -> String {
        self.with_operators(|ops| {
            let mut out = String::new();
            let mut stack = vec![NlTask::Operand(Operand::Ref(self.root_index()))];
            while let Some(task) = stack.pop() {
                emit_task(ops, task, &mut out, &mut stack);
            }
            out
        })
    }
}

impl super::Node {
    /// Serialize this node as AMPL `.nl` prefix opcodes, one token per
    /// line.
    #[must_use]
    pub fn write_nl_string(&self) -> String {
        match self {
            super::Node::Leaf(Leaf::Variable(v)) => format!("v{}\n", v.index()),
            super::Node::Leaf(Leaf::Parameter(p)) => format!("n{}\n", p.value()),
            super::Node::Leaf(Leaf::Constant(c)) => format!("n{c}\n"),
            super::Node::Expr(e) => e.write_nl_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert exact opcode token streams")]
mod tests {
    use crate::combinators::{add, mul, unary};
    use crate::leaf::Variable;
    use crate::operator::UnaryFn;
    use crate::Leaf;
    use crate::Node;

    fn var(name: &str, value: f64, index: u32) -> Node {
        Node::Leaf(Leaf::Variable(Variable::new(name, value, index)))
    }

    fn constant(value: f64) -> Node {
        Node::Leaf(Leaf::Constant(value))
    }

    fn lines(s: &str) -> Vec<&str> {
        s.lines().collect()
    }

    #[test]
    fn sum_of_two_products_matches_the_documented_token_stream() {
        let a = var("a", 1.0, 0);
        let b = var("b", 2.0, 1);
        let c = var("c", 3.0, 2);
        let d = var("d", 4.0, 3);
        let expr = mul(add(a, b).unwrap(), add(c, d).unwrap()).unwrap();
        assert_eq!(
            lines(&expr.write_nl_string()),
            vec!["o2", "o0", "v0", "v1", "o0", "v2", "v3"]
        );
    }

    #[test]
    fn exp_plus_scaled_variable_matches_the_documented_token_stream() {
        let x = var("x", 1.0, 0);
        let y = var("y", 2.0, 1);
        let expr = add(unary(UnaryFn::Exp, x).unwrap(), mul(constant(2.0), y).unwrap()).unwrap();
        assert_eq!(
            lines(&expr.write_nl_string()),
            vec!["o0", "o44", "v0", "o2", "n2", "v1"]
        );
    }

    #[test]
    fn wide_sum_emits_o54_header_with_operand_count() {
        let terms: Vec<Node> = (0..5).map(|i| var("x", f64::from(i), i)).collect();
        let expr = crate::combinators::sum(terms).unwrap();
        let out = expr.write_nl_string();
        let mut it = out.lines();
        assert_eq!(it.next(), Some("o54"));
        assert_eq!(it.next(), Some("5"));
    }

    #[test]
    fn parameter_renders_as_numeric_literal_not_a_variable_token() {
        let p = Node::Leaf(Leaf::Parameter(crate::leaf::Parameter::new("a", 7.0)));
        assert_eq!(p.write_nl_string(), "n7\n");
    }

    #[test]
    fn linear_operator_folds_nonzero_constant_into_the_sum_header() {
        let v = Variable::new("x", 3.0, 0);
        let expr = crate::combinators::linear(constant(5.0), vec![(v, constant(2.0))]).unwrap();
        let out = expr.write_nl_string();
        let mut it = out.lines();
        // constant(5) and one term => two addends => plain o0 header.
        assert_eq!(it.next(), Some("o0"));
        assert_eq!(it.next(), Some("n5"));
        assert_eq!(it.next(), Some("o2"));
        assert_eq!(it.next(), Some("n2"));
        assert_eq!(it.next(), Some("v0"));
    }

    #[test]
    fn linear_operator_skips_header_constant_when_it_is_exactly_zero() {
        let v = Variable::new("x", 3.0, 0);
        let expr = crate::combinators::linear(constant(0.0), vec![(v, constant(2.0))]).unwrap();
        let out = expr.write_nl_string();
        let mut it = out.lines();
        // zero constant folded away, single term => one addend => o54/1 header.
        assert_eq!(it.next(), Some("o54"));
        assert_eq!(it.next(), Some("1"));
        assert_eq!(it.next(), Some("o2"));
        assert_eq!(it.next(), Some("n2"));
        assert_eq!(it.next(), Some("v0"));
    }
}
