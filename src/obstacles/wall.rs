use pyo3::prelude::*;

use crate::dynamics::maths::FloatVec;
use crate::dynamics::DynamicsError;

use super::{Contact, Impact, Obstacle};

/// Which half-plane of an [`InfiniteWall`] is the outside, looking along
/// the wall from its start point to its end point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exterior {
    Left,
    Right,
}

/// The infinite line through two points, solid on one side.
///
/// Balls collide with the wall only while on its exterior side and moving
/// towards it; a ball on or behind the line is inside the wall and passes
/// through freely.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct InfiniteWall {
    start: FloatVec,
    end: FloatVec,
    exterior: Exterior,
    // Unit normal pointing into the exterior half-plane.
    normal: FloatVec,
}

impl InfiniteWall {
    pub fn new(start: FloatVec, end: FloatVec, exterior: Exterior) -> Result<Self, DynamicsError> {
        if !start.is_finite() || !end.is_finite() {
            return Err(DynamicsError::NonFiniteInput("wall geometry"));
        }
        let along = end - start;
        if along.dot(&along) == 0.0 {
            return Err(DynamicsError::DegenerateObstacle(
                "wall endpoints coincide",
            ));
        }
        let left = along.normalize().anti_clockwise_perpendicular();
        let normal = match exterior {
            Exterior::Left => left,
            Exterior::Right => -left,
        };
        Ok(InfiniteWall {
            start,
            end,
            exterior,
            normal,
        })
    }

    pub fn start(&self) -> FloatVec {
        self.start
    }

    pub fn end(&self) -> FloatVec {
        self.end
    }

    pub fn exterior(&self) -> Exterior {
        self.exterior
    }

    pub fn normal(&self) -> FloatVec {
        self.normal
    }
}

impl Obstacle for InfiniteWall {
    fn time_of_impact(&self, pos: FloatVec, vel: FloatVec, radius: f64) -> Option<Impact> {
        let closing = vel.dot(&self.normal);
        if closing >= 0.0 {
            // Moving away from the wall, or parallel to it.
            return None;
        }
        let distance = (pos - self.start).dot(&self.normal);
        if distance <= 0.0 {
            // Centre on or behind the line: the ball is inside the wall.
            return None;
        }
        let clearance = distance - radius;
        let time = if clearance < 0.0 {
            // Overlapping the face while approaching: the collision is
            // already due, as for an overlapping ball pair.
            0.0
        } else {
            clearance / -closing
        };
        Some(Impact {
            time,
            contact: Contact::Flat {
                normal: self.normal,
            },
        })
    }
}
