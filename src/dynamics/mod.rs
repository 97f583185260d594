use pyo3::exceptions::PyValueError;
use pyo3::PyErr;
use thiserror::Error;

pub mod maths;
pub mod physics;

/// Everything that can go wrong while building or driving a simulation.
///
/// Infinite impact times are not errors; they are ordinary values meaning
/// "no future collision". The variants here are contract violations caught
/// at the entry point that received them.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DynamicsError {
    #[error("{0} must be finite")]
    NonFiniteInput(&'static str),
    #[error("radius must be finite and non-negative, got {0}")]
    InvalidRadius(f64),
    #[error("mass must be positive or infinite, got {0}")]
    InvalidMass(f64),
    #[error("no ball with index {0}")]
    NoSuchBall(usize),
    #[error("degenerate obstacle geometry: {0}")]
    DegenerateObstacle(&'static str),
    #[error("cannot evolve backwards from {current} to {requested}")]
    TimeReversal { current: f64, requested: f64 },
    #[error("coincident centres leave the contact normal undefined")]
    IntersectingParticles,
}

impl From<DynamicsError> for PyErr {
    fn from(err: DynamicsError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
