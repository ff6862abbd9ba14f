//! Seeded random fuzzing of the evaluation/`Repn`-reconstruction property
//! (§8, "Evaluation == Repn reconstruction") over large, randomly shaped
//! expressions, mirroring the teacher's own `StdRng`-seeded fuzz harness.

#![allow(
    clippy::unwrap_used,
    clippy::cast_precision_loss,
    clippy::float_cmp,
    reason = "fuzz harness builds and asserts on randomly generated expressions"
)]

use std::sync::Arc;

use rand::{rngs::StdRng, RngExt, SeedableRng};

use crate::{add, mul, sum, unary};
use crate::{Leaf, Node, UnaryFn, Variable};

fn random_std_rng_with_seed() -> (StdRng, u64) {
    let seed: u64 = rand::random();
    (StdRng::seed_from_u64(seed), seed)
}

const UNARY_FNS: [UnaryFn; 4] = [UnaryFn::Sin, UnaryFn::Cos, UnaryFn::Exp, UnaryFn::Atan];

/// Build a sum of `num_terms` random products, each a short chain of
/// variables (drawn from `num_vars` distinct names) and small integer
/// coefficients, occasionally wrapped in a unary transcendental.
///
/// Mirrors the teacher's `generate_massive_poly`, adapted to this core's
/// tape-backed combinators instead of the teacher's tree-building `Expr`
/// smart constructors.
fn generate_massive_poly(rng: &mut StdRng, num_terms: usize, num_vars: usize) -> (Node, Vec<Arc<Variable>>) {
    let vars: Vec<Arc<Variable>> = (0..num_vars)
        .map(|i| Variable::new(format!("x{i}"), f64::from(i as i32 + 1), i as u32))
        .collect();

    let mut terms = Vec::with_capacity(num_terms);
    for _ in 0..num_terms {
        let num_factors = rng.random_range(1..=4);
        let coeff = rng.random_range(-10..=10);
        let mut factors: Vec<Node> = Vec::with_capacity(num_factors + 1);
        if coeff != 0 {
            factors.push(Node::Leaf(Leaf::Constant(f64::from(coeff))));
        }
        for _ in 0..num_factors {
            let v = &vars[rng.random_range(0..num_vars)];
            factors.push(Node::Leaf(Leaf::Variable(Arc::clone(v))));
        }
        if factors.is_empty() {
            factors.push(Node::Leaf(Leaf::Constant(1.0)));
        }
        let mut product = factors
            .into_iter()
            .reduce(|a, b| mul(a, b).expect("mul never fails on leaf/tape operands"))
            .expect("at least one factor was pushed above");
        if rng.random_bool(0.2) {
            let f = UNARY_FNS[rng.random_range(0..UNARY_FNS.len())];
            product = unary(f, product).expect("unary never fails on a non-literal operand");
        }
        terms.push(product);
    }
    (sum(terms).expect("sum never fails on leaf/tape operands"), vars)
}

fn reconstruct(r: &crate::Repn) -> f64 {
    add(
        add(add(r.constant.clone(), r.linear.clone()).unwrap(), r.quadratic.clone()).unwrap(),
        r.nonlinear.clone(),
    )
    .unwrap()
    .evaluate()
    .unwrap()
}

#[test]
fn fuzz_evaluate_matches_repn_reconstruction_on_massive_polynomials() {
    for _ in 0..200 {
        let (mut rng, seed) = random_std_rng_with_seed();

        let cases = [(50, 4), (300, 8)];
        for (num_terms, num_vars) in cases {
            let (expr, _vars) = generate_massive_poly(&mut rng, num_terms, num_vars);

            let direct = expr.evaluate().expect("fuzz-built expressions never call external()");
            let r = expr
                .generate_repn()
                .expect("fuzz-built expressions contain no division by a literal zero");
            let reconstructed = reconstruct(&r);

            let tolerance = 1e-6 * (num_terms as f64).max(1.0);
            let diff = (direct - reconstructed).abs();
            assert!(
                diff <= tolerance,
                "seed {seed}: terms={num_terms} vars={num_vars} direct={direct} reconstructed={reconstructed} diff={diff}"
            );
        }
    }
}

#[test]
fn fuzz_repn_constant_slot_is_invariant_under_variable_perturbation() {
    for _ in 0..100 {
        let (mut rng, seed) = random_std_rng_with_seed();
        let (expr, vars) = generate_massive_poly(&mut rng, 100, 6);
        let r = expr
            .generate_repn()
            .expect("fuzz-built expressions contain no division by a literal zero");

        // The constant slot is degree 0 by construction, so it must not
        // move when the model's variables do.
        let before = r.constant.evaluate().expect("constant slot is always evaluable");
        for v in &vars {
            let bump: i32 = rng.random_range(1..=100);
            v.set_value(v.value() + f64::from(bump));
        }
        let after = r.constant.evaluate().expect("constant slot is always evaluable");
        assert_eq!(before, after, "seed {seed}: constant slot must be variable-independent");
    }
}
