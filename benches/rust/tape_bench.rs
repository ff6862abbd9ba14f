//! Tape construction, evaluation, and `Repn` generation benchmarks.
//!
//! Revives the 1000-term `a*x` summation scenario from the original
//! implementation's commented-out benchmark harness, comparing the cost of
//! a single [`exprtape::Node::evaluate`] pass against a full
//! [`exprtape::Node::generate_repn`] decomposition.

use criterion::{criterion_group, criterion_main, Criterion};
use exprtape::{add, mul, pow, unary, Leaf, Node, Parameter, UnaryFn, Variable};
use std::hint::black_box;

fn build_linear_sum(n: usize) -> Node {
    let a = Node::Leaf(Leaf::Parameter(Parameter::new("a", 2.0)));
    let x = Node::Leaf(Leaf::Variable(Variable::new("x", 3.0, 0)));
    let mut acc = Node::Leaf(Leaf::Constant(0.0));
    for _ in 0..n {
        acc = add(acc, mul(a.clone(), x.clone()).expect("fold never fails here"))
            .expect("fold never fails here");
    }
    acc
}

fn build_mixed_nonlinear_sum(n: usize) -> Node {
    let x = Node::Leaf(Leaf::Variable(Variable::new("x", 3.0, 0)));
    let y = Node::Leaf(Leaf::Variable(Variable::new("y", 4.0, 1)));
    let mut acc = Node::Leaf(Leaf::Constant(0.0));
    for i in 0..n {
        let term = if i % 2 == 0 {
            mul(x.clone(), y.clone()).expect("fold never fails here")
        } else {
            unary(UnaryFn::Sin, x.clone()).expect("fold never fails here")
        };
        acc = add(acc, term).expect("fold never fails here");
    }
    acc
}

fn bench_tape_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("tape_construction");

    group.bench_function("linear_sum_1000", |b| {
        b.iter(|| black_box(build_linear_sum(black_box(1000))));
    });

    group.bench_function("binomial_square", |b| {
        let x = Node::Leaf(Leaf::Variable(Variable::new("x", 3.0, 0)));
        b.iter(|| {
            black_box(
                pow(
                    add(black_box(x.clone()), Node::Leaf(Leaf::Constant(1.0))).unwrap(),
                    Node::Leaf(Leaf::Constant(2.0)),
                )
                .unwrap(),
            )
        });
    });

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let linear = build_linear_sum(1000);
    let nonlinear = build_mixed_nonlinear_sum(1000);

    group.bench_function("linear_sum_1000", |b| {
        b.iter(|| black_box(&linear).evaluate().unwrap());
    });

    group.bench_function("mixed_nonlinear_sum_1000", |b| {
        b.iter(|| black_box(&nonlinear).evaluate().unwrap());
    });

    group.finish();
}

fn bench_generate_repn(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_repn");
    let linear = build_linear_sum(1000);
    let nonlinear = build_mixed_nonlinear_sum(1000);

    group.bench_function("linear_sum_1000", |b| {
        b.iter(|| black_box(&linear).generate_repn().unwrap());
    });

    group.bench_function("mixed_nonlinear_sum_1000", |b| {
        b.iter(|| black_box(&nonlinear).generate_repn().unwrap());
    });

    group.finish();
}

fn bench_nl_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("nl_serialization");
    let linear = build_linear_sum(1000);

    group.bench_function("linear_sum_1000", |b| {
        b.iter(|| black_box(&linear).write_nl_string());
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_tape_construction,
    bench_evaluate,
    bench_generate_repn,
    bench_nl_serialization,
);
criterion_main!(benches);
