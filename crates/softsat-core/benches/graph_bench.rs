//! Benchmarks for clause parsing and propagation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use softsat_core::{minimize, seed_values, ComputationGraph, DescentConfig};

/// Random 3-literal disjunctions over `variables` variables.
fn random_clauses(variables: usize, count: usize, seed: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            (0..3)
                .map(|_| {
                    let var = rng.gen_range(0..variables);
                    if rng.gen_bool(0.5) {
                        format!("~${}", var)
                    } else {
                        format!("${}", var)
                    }
                })
                .collect::<Vec<_>>()
                .join(" v ")
        })
        .collect()
}

/// A single clause chaining every variable through alternating operators.
fn chain_clause(variables: usize) -> String {
    (0..variables)
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .chunks(2)
        .map(|pair| pair.join(" ^ "))
        .collect::<Vec<_>>()
        .join(" v ")
}

fn bench_parse(c: &mut Criterion) {
    let clauses = random_clauses(50, 200, 1);

    c.bench_function("parse_200_clauses", |b| {
        b.iter(|| ComputationGraph::new(50, black_box(&clauses)).unwrap())
    });

    let chain = [chain_clause(100)];
    c.bench_function("parse_chain_100", |b| {
        b.iter(|| ComputationGraph::new(100, black_box(&chain)).unwrap())
    });
}

fn bench_forward(c: &mut Criterion) {
    let mut graph = ComputationGraph::new(50, random_clauses(50, 200, 2)).unwrap();
    let values = seed_values(50, 1.0, &mut StdRng::seed_from_u64(3));

    c.bench_function("forward_200_clauses", |b| {
        b.iter(|| {
            let cost = graph.forward(black_box(&values)).unwrap();
            graph.reset().unwrap();
            cost
        })
    });
}

fn bench_backward(c: &mut Criterion) {
    let mut graph = ComputationGraph::new(50, random_clauses(50, 200, 4)).unwrap();
    let values = seed_values(50, 1.0, &mut StdRng::seed_from_u64(5));

    c.bench_function("forward_backward_200_clauses", |b| {
        b.iter(|| {
            graph.forward(black_box(&values)).unwrap();
            graph.backward().unwrap()
        })
    });
}

fn bench_descent(c: &mut Criterion) {
    let mut graph = ComputationGraph::new(20, random_clauses(20, 60, 6)).unwrap();
    let config = DescentConfig::new(0.1, 100, 0.1);

    c.bench_function("descent_100_iterations", |b| {
        b.iter(|| {
            let mut values = vec![0.0; 20];
            minimize(&mut graph, &mut values, black_box(&config)).unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_forward,
    bench_backward,
    bench_descent,
);

criterion_main!(benches);
