use std::error::Error;

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

extern crate lqcontrol;
use lqcontrol::control::{
    ControlLaw, ControlType, LinearSystem, LqSolver, LqrProblem, LqtProblem, TimeGrid,
};

#[derive(Serialize)]
struct Row {
    t: f64,
    position: f64,
    velocity: f64,
    reference: f64,
}

/// Run a lightly damped second-order plant under the law picked on the
/// command line (`lqt` follows a sine, `lqr` regulates to the origin) and
/// dump the closed-loop trajectory to CSV.
fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let selector: ControlType = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "lqt".to_owned())
        .parse()?;

    let sys = LinearSystem::new(
        DMatrix::from_row_slice(2, 2, &[0.0, 1.0, -1.0, -0.2]),
        DMatrix::from_row_slice(2, 1, &[0.0, 1.0]),
        DMatrix::from_row_slice(1, 2, &[1.0, 0.0]),
        DMatrix::zeros(1, 1),
    )?;
    let reference = |t: f64| DVector::from_element(1, (0.5 * t).sin());

    let (law, x0) = match selector {
        ControlType::Lqt => (
            ControlLaw::Lqt(LqtProblem {
                q: DMatrix::from_element(1, 1, 50.0),
                r: DMatrix::identity(1, 1),
                terminal: DMatrix::from_element(1, 1, 10.0),
                reference: Box::new(reference),
            }),
            DVector::zeros(2),
        ),
        ControlType::Lqr => (
            ControlLaw::Lqr(LqrProblem {
                q: DMatrix::identity(2, 2) * 10.0,
                r: DMatrix::identity(1, 1),
                terminal: DMatrix::identity(2, 2),
                target: None,
            }),
            DVector::from_column_slice(&[1.0, 0.0]),
        ),
    };

    let grid = TimeGrid::new(0.0, 20.0, 0.05)?;
    let traj = LqSolver::default().solve(&sys, &law, &grid, &x0)?;

    let path = format!("{selector}_trajectory.csv");
    let mut wtr = csv::Writer::from_path(&path)?;
    for (&t, x) in traj.time.iter().zip(&traj.states) {
        wtr.serialize(Row {
            t,
            position: x[0],
            velocity: x[1],
            reference: match selector {
                ControlType::Lqt => reference(t)[0],
                ControlType::Lqr => 0.0,
            },
        })?;
    }
    wtr.flush()?;
    println!("trajectory written to {path}");
    Ok(())
}
