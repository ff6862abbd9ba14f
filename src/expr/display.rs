//! Infix pretty-printing.
//!
//! Every compound sub-expression is fully parenthesized; there is no
//! precedence-aware omission of parentheses; this is a diagnostic
//! rendering, not a re-parsable one.

use std::fmt;

use crate::operator::{Operand, Operator, OperatorKind};

use super::{Expression, Node};

fn operand_str(strs: &[String], operand: &Operand) -> String {
    match operand {
        Operand::Leaf(l) => l.to_string(),
        Operand::Ref(i) => strs[*i as usize].clone(),
    }
}

fn render(strs: &[String], kind: &OperatorKind) -> String {
    match kind {
        OperatorKind::Add(a, b) => format!("({} + {})", operand_str(strs, a), operand_str(strs, b)),
        OperatorKind::Sub(a, b) => format!("({} - {})", operand_str(strs, a), operand_str(strs, b)),
        OperatorKind::Mul(a, b) => format!("({} * {})", operand_str(strs, a), operand_str(strs, b)),
        OperatorKind::Div(a, b) => format!("({} / {})", operand_str(strs, a), operand_str(strs, b)),
        OperatorKind::Pow(a, b) => format!("({} ^ {})", operand_str(strs, a), operand_str(strs, b)),
        OperatorKind::Neg(a) => format!("(-{})", operand_str(strs, a)),
        OperatorKind::Unary(f, a) => format!("{}({})", f, operand_str(strs, a)),
        OperatorKind::Sum(xs) => {
            let body = xs
                .iter()
                .map(|x| operand_str(strs, x))
                .collect::<Vec<_>>()
                .join(" + ");
            format!("({body})")
        }
        OperatorKind::Linear { constant, terms } => {
            let mut parts = vec![operand_str(strs, constant)];
            parts.extend(terms.iter().map(|t| {
                format!("{}*{}", operand_str(strs, &t.coefficient), t.variable)
            }));
            format!("({})", parts.join(" + "))
        }
        OperatorKind::External { name, args, .. } => {
            let body = args
                .iter()
                .map(|a| operand_str(strs, a))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{name}({body})")
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_operators(|ops: &[Operator]| {
            let mut strs: Vec<String> = Vec::with_capacity(ops.len());
            for op in ops {
                strs.push(render(&strs, &op.kind));
            }
            write!(
                f,
                "{}",
                strs.last()
                    .expect("a tape always has at least one operator")
            )
        })
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Leaf(l) => write!(f, "{l}"),
            Node::Expr(e) => write!(f, "{e}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests assert exact rendered strings")]
mod tests {
    use crate::combinators::{add, mul};
    use crate::leaf::{Leaf, Variable};
    use crate::Node;

    fn var(name: &str, value: f64) -> Node {
        Node::Leaf(Leaf::Variable(Variable::new(name, value, 0)))
    }

    #[test]
    fn every_compound_subexpression_is_parenthesized() {
        let x = var("x", 1.0);
        let y = var("y", 2.0);
        let z = var("z", 3.0);
        let expr = mul(add(x, y).unwrap(), z).unwrap();
        assert_eq!(expr.to_string(), "((x + y) * z)");
    }

    #[test]
    fn leaf_renders_its_name_with_no_parentheses() {
        let x = var("x", 1.0);
        assert_eq!(x.to_string(), "x");
    }
}
