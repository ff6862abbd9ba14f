//! Single-pass tape evaluation.

use crate::error::{CoreError, CoreResult};
use crate::operator::{Operand, Operator, OperatorKind};

use super::{Expression, Node};

impl Node {
    /// Evaluate this node to a scalar, reading variables and parameters at
    /// their current values.
    ///
    /// # Errors
    /// Returns [`CoreError::ExternalEvaluationUnsupported`] if the node
    /// (or any sub-expression it references) contains an
    /// [`OperatorKind::External`] operator: the core has no function
    /// linkage to evaluate those itself.
    pub fn evaluate(&self) -> CoreResult<f64> {
        match self {
            Node::Leaf(l) => Ok(l.value()),
            Node::Expr(e) => e.evaluate(),
        }
    }
}

impl Expression {
    /// Evaluate this tape to a scalar by walking operators in tape order
    /// and writing each result to a dense buffer indexed by tape position.
    ///
    /// # Errors
    /// See [`Node::evaluate`].
    pub fn evaluate(&self) -> CoreResult<f64> {
        self.with_operators(|ops| {
            let mut values = vec![0.0_f64; ops.len()];
            for (i, op) in ops.iter().enumerate() {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "tapes are bounded by realistic model sizes, far below u32::MAX"
                )]
                let idx = i as u32;
                op.index.set(idx);
                values[i] = eval_operator(op, &values)?;
            }
            Ok(*values
                .last()
                .expect("a tape always has at least one operator"))
        })
    }
}

fn resolve(values: &[f64], operand: &Operand) -> f64 {
    match operand {
        Operand::Leaf(l) => l.value(),
        Operand::Ref(i) => values[*i as usize],
    }
}

fn eval_operator(op: &Operator, values: &[f64]) -> CoreResult<f64> {
    Ok(match &op.kind {
        OperatorKind::Add(a, b) => resolve(values, a) + resolve(values, b),
        OperatorKind::Sub(a, b) => resolve(values, a) - resolve(values, b),
        OperatorKind::Mul(a, b) => resolve(values, a) * resolve(values, b),
        OperatorKind::Div(a, b) => resolve(values, a) / resolve(values, b),
        OperatorKind::Pow(a, b) => resolve(values, a).powf(resolve(values, b)),
        OperatorKind::Neg(a) => -resolve(values, a),
        OperatorKind::Unary(f, a) => f.apply(resolve(values, a)),
        OperatorKind::Sum(xs) => xs.iter().map(|x| resolve(values, x)).sum(),
        OperatorKind::Linear { constant, terms } => {
            let mut acc = resolve(values, constant);
            for term in terms {
                acc += resolve(values, &term.coefficient) * term.variable.value();
            }
            acc
        }
        OperatorKind::External { name, .. } => {
            return Err(CoreError::ExternalEvaluationUnsupported {
                name: name.as_ref().to_owned(),
            });
        }
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::float_cmp,
    reason = "tests assert exact evaluation results"
)]
mod tests {
    use crate::combinators::{add, div, mul, pow, sum, unary};
    use crate::leaf::{Leaf, Parameter, Variable};
    use crate::operator::UnaryFn;
    use crate::expr::Node;

    fn var(name: &str, value: f64) -> Node {
        Node::Leaf(Leaf::Variable(Variable::new(name, value, 0)))
    }

    fn constant(value: f64) -> Node {
        Node::Leaf(Leaf::Constant(value))
    }

    #[test]
    fn root_value_resolves_operator_chain() {
        let x = var("x", 3.0);
        let expr = add(pow(x.clone(), constant(2.0)).unwrap(), mul(constant(5.0), x).unwrap()).unwrap();
        assert_eq!(expr.evaluate().unwrap(), 9.0 + 15.0);
    }

    #[test]
    fn sin_plus_product_matches_scalar_math() {
        let x = var("x", 3.0);
        let y = var("y", 4.0);
        let expr = add(unary(UnaryFn::Sin, x.clone()).unwrap(), mul(x, y).unwrap()).unwrap();
        let expected = 3.0_f64.sin() + 3.0 * 4.0;
        assert!((expr.evaluate().unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn division_by_nonconstant_zero_propagates_ieee_infinity() {
        let x = var("x", 1.0);
        let y = var("y", 0.0);
        let expr = div(x, y).unwrap();
        assert!(expr.evaluate().unwrap().is_infinite());
    }

    #[test]
    fn external_operator_evaluation_is_fatal() {
        let x = var("x", 1.0);
        let call = crate::combinators::external("f", None, vec![x]).unwrap();
        assert!(call.evaluate().is_err());
    }

    #[test]
    fn parameter_reads_current_value_like_a_constant() {
        let p = Parameter::new("a", 2.0);
        let x = var("x", 3.0);
        let expr = mul(Node::Leaf(Leaf::Parameter(p)), x).unwrap();
        assert_eq!(expr.evaluate().unwrap(), 6.0);
    }

    #[test]
    fn sum_of_many_terms_matches_naive_accumulation() {
        let terms: Vec<Node> = (1..=10).map(|i| constant(f64::from(i))).collect();
        let expr = sum(terms).unwrap();
        assert_eq!(expr.evaluate().unwrap(), 55.0);
    }
}
