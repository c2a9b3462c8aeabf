mod backward;
mod rk45;

pub use backward::integrate_backward;
pub use rk45::Rk45;
