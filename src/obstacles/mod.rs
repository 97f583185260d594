use std::fmt;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::dynamics::maths::FloatVec;

mod disk;
mod segment;
mod wall;

pub use disk::Disk;
pub use segment::LineSegment;
pub use wall::{Exterior, InfiniteWall};

/// Which part of an obstacle's surface a ball is due to touch.
///
/// An obstacle produces a `Contact` while solving `time_of_impact` and gets
/// it back in `collide`, so the response never has to re-derive which face
/// or end-cap was hit. The hint carries the geometry the reflection needs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Contact {
    /// A flat piece of surface with the given outward unit normal.
    Flat { normal: FloatVec },
    /// A circular piece of surface; the contact normal runs from `centre`
    /// through the ball's centre.
    Round { centre: FloatVec },
}

impl Contact {
    /// Reflect `vel` off the surface, with the ball centred at `pos`.
    pub fn deflect(&self, pos: FloatVec, vel: FloatVec) -> FloatVec {
        let normal = match self {
            Contact::Flat { normal } => *normal,
            Contact::Round { centre } => {
                let offset = pos - *centre;
                if offset.dot(&offset) == 0.0 {
                    // A zero-radius ball dead on a point cap: head-on reversal.
                    return -vel;
                }
                offset.normalize()
            }
        };
        vel - 2.0 * vel.dot(&normal) * normal
    }
}

/// The first future contact between a ball and an obstacle. `time` is
/// measured from the instant the query was made.
#[derive(Clone, Copy, Debug)]
pub struct Impact {
    pub time: f64,
    pub contact: Contact,
}

/// A static body that balls bounce off.
///
/// Obstacles are immutable value objects with an exterior side; collisions
/// are registered only for balls approaching from the outside, and a ball
/// that starts strictly inside an obstacle never collides with it. Placing
/// a `Disk` around a ball therefore does not confine it; confinement is
/// built from obstacles whose exteriors face the playing region.
pub trait Obstacle: fmt::Debug + Send + Sync {
    /// The smallest time at which a ball of radius `radius`, starting at
    /// `pos` with velocity `vel`, touches the obstacle's outside surface.
    /// `None` when the ball never reaches it.
    fn time_of_impact(&self, pos: FloatVec, vel: FloatVec, radius: f64) -> Option<Impact>;

    /// The ball's velocity after the impact described by `contact`. `pos`
    /// is the ball centre at the moment of contact; the caller advances the
    /// ball there first.
    fn collide(&self, pos: FloatVec, vel: FloatVec, radius: f64, contact: Contact) -> FloatVec {
        let _ = radius;
        contact.deflect(pos, vel)
    }
}

#[pymethods]
impl Disk {
    #[new]
    fn py_new(centre: (f64, f64), radius: f64) -> PyResult<Self> {
        Ok(Self::new(centre.into(), radius)?)
    }

    #[getter(centre)]
    fn py_get_centre(&self) -> (f64, f64) {
        self.centre().into()
    }

    #[getter(radius)]
    fn py_get_radius(&self) -> f64 {
        self.radius()
    }
}

#[pymethods]
impl InfiniteWall {
    #[new]
    fn py_new(start: (f64, f64), end: (f64, f64), exterior: &str) -> PyResult<Self> {
        let exterior = match exterior {
            side if side.eq_ignore_ascii_case("left") => Exterior::Left,
            side if side.eq_ignore_ascii_case("right") => Exterior::Right,
            other => {
                return Err(PyValueError::new_err(format!(
                    "exterior must be \"left\" or \"right\", got {other:?}"
                )))
            }
        };
        Ok(Self::new(start.into(), end.into(), exterior)?)
    }

    #[getter(start)]
    fn py_get_start(&self) -> (f64, f64) {
        self.start().into()
    }

    #[getter(end)]
    fn py_get_end(&self) -> (f64, f64) {
        self.end().into()
    }

    #[getter(exterior)]
    fn py_get_exterior(&self) -> &'static str {
        match self.exterior() {
            Exterior::Left => "left",
            Exterior::Right => "right",
        }
    }
}

#[pymethods]
impl LineSegment {
    #[new]
    fn py_new(start: (f64, f64), end: (f64, f64)) -> PyResult<Self> {
        Ok(Self::new(start.into(), end.into())?)
    }

    #[getter(start)]
    fn py_get_start(&self) -> (f64, f64) {
        self.start().into()
    }

    #[getter(end)]
    fn py_get_end(&self) -> (f64, f64) {
        self.end().into()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flat_contact_reflects_normal_component() {
        let contact = Contact::Flat {
            normal: FloatVec::new(0.0, 1.0),
        };
        let out = contact.deflect(FloatVec::origin(), FloatVec::new(3.0, -2.0));
        assert_eq!(out, FloatVec::new(3.0, 2.0));
    }

    #[test]
    fn round_contact_reflects_through_centre() {
        let contact = Contact::Round {
            centre: FloatVec::origin(),
        };
        // Ball sits straight above the centre, falling onto it.
        let out = contact.deflect(FloatVec::new(0.0, 2.0), FloatVec::new(1.0, -1.0));
        assert_eq!(out, FloatVec::new(1.0, 1.0));
    }

    #[test]
    fn round_contact_on_its_own_centre_reverses() {
        let contact = Contact::Round {
            centre: FloatVec::new(1.0, 1.0),
        };
        let out = contact.deflect(FloatVec::new(1.0, 1.0), FloatVec::new(2.0, 0.0));
        assert_eq!(out, FloatVec::new(-2.0, 0.0));
    }
}
