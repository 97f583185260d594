use pyo3::prelude::*;

pub mod dynamics;
pub mod obstacles;
pub mod simulation;

/// A Python module implemented in Rust.
#[pymodule]
fn billiards(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<simulation::Simulation>()?;
    m.add_class::<obstacles::Disk>()?;
    m.add_class::<obstacles::InfiniteWall>()?;
    m.add_class::<obstacles::LineSegment>()?;
    Ok(())
}
