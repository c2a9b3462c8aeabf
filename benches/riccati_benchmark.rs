use criterion::{criterion_group, criterion_main, Criterion};

use nalgebra::{DMatrix, DVector};
extern crate lqcontrol;
use lqcontrol::control::{ControlLaw, LinearSystem, LqSolver, LqrProblem, LqtProblem, TimeGrid};

fn double_integrator() -> LinearSystem {
    LinearSystem::new(
        DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 0.0]),
        DMatrix::from_row_slice(2, 1, &[0.0, 1.0]),
        DMatrix::from_row_slice(1, 2, &[1.0, 0.0]),
        DMatrix::zeros(1, 1),
    )
    .unwrap()
}

fn lqr(b: &mut Criterion) {
    let sys = double_integrator();
    let grid = TimeGrid::new(0.0, 2.0, 0.02).unwrap();
    let law = ControlLaw::Lqr(LqrProblem {
        q: DMatrix::identity(2, 2),
        r: DMatrix::identity(1, 1),
        terminal: DMatrix::identity(2, 2),
        target: Some(DVector::from_element(1, 1.0)),
    });
    let x0 = DVector::zeros(2);
    let solver = LqSolver::default();

    b.bench_function("lqr", |b| b.iter(|| solver.solve(&sys, &law, &grid, &x0)));
}

fn lqt(b: &mut Criterion) {
    let sys = double_integrator();
    let grid = TimeGrid::new(0.0, 2.0, 0.02).unwrap();
    let law = ControlLaw::Lqt(LqtProblem {
        q: DMatrix::from_element(1, 1, 10.0),
        r: DMatrix::identity(1, 1),
        terminal: DMatrix::from_element(1, 1, 5.0),
        reference: Box::new(|t: f64| DVector::from_element(1, t.sin())),
    });
    let x0 = DVector::zeros(2);
    let solver = LqSolver::default();

    b.bench_function("lqt", |b| b.iter(|| solver.solve(&sys, &law, &grid, &x0)));
}

criterion_group!(benches, lqr, lqt);
criterion_main!(benches);
