mod costate;
mod error;
mod gain;
mod grid;
mod riccati;
mod sampled;
mod solver;
mod system;

pub use costate::{solve_regulator_costate, solve_terminal_correction, solve_tracker_costate};
pub use error::ControlError;
pub use gain::FeedbackGain;
pub use grid::TimeGrid;
pub use riccati::solve_riccati;
pub use sampled::{SampledMatrixFunction, SampledVectorFunction};
pub use solver::{LqSolver, Trajectory};
pub use system::{
    ControlLaw, ControlType, LinearSystem, LqrProblem, LqtProblem, ReferenceSignal,
};
