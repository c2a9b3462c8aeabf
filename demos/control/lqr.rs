use std::error::Error;

use nalgebra::{DMatrix, DVector};
use plotters::prelude::*;

extern crate lqcontrol;
use lqcontrol::control::{ControlLaw, LinearSystem, LqSolver, LqrProblem, TimeGrid};

/// Steer a double integrator from rest to position 1 with minimum energy,
/// then plot the closed-loop position and velocity.
fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let sys = LinearSystem::new(
        DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 0.0]),
        DMatrix::from_row_slice(2, 1, &[0.0, 1.0]),
        DMatrix::from_row_slice(1, 2, &[1.0, 0.0]),
        DMatrix::zeros(1, 1),
    )?;

    let tf = 2.0;
    let grid = TimeGrid::new(0.0, tf, 0.02)?;
    let law = ControlLaw::Lqr(LqrProblem {
        q: DMatrix::zeros(2, 2),
        r: DMatrix::identity(1, 1),
        terminal: DMatrix::zeros(2, 2),
        target: Some(DVector::from_element(1, 1.0)),
    });

    let traj = LqSolver::default().solve(&sys, &law, &grid, &DVector::zeros(2))?;
    println!(
        "final state: position {:.4}, velocity {:.4}",
        traj.states.last().unwrap()[0],
        traj.states.last().unwrap()[1]
    );

    std::fs::create_dir_all("./img")?;
    let root = SVGBackend::new("./img/lqr.svg", (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("double integrator, terminal-constrained LQR", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..tf, -0.2..1.6)?;
    chart.configure_mesh().x_desc("t").y_desc("state").draw()?;

    chart
        .draw_series(LineSeries::new(
            traj.time.iter().zip(&traj.states).map(|(&t, x)| (t, x[0])),
            &RED,
        ))?
        .label("position")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
    chart
        .draw_series(LineSeries::new(
            traj.time.iter().zip(&traj.states).map(|(&t, x)| (t, x[1])),
            &BLUE,
        ))?
        .label("velocity")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart.configure_series_labels().border_style(&BLACK).draw()?;
    root.present()?;
    println!("plot written to ./img/lqr.svg");
    Ok(())
}
