use pyo3::prelude::*;

use crate::dynamics::maths::FloatVec;
use crate::dynamics::physics::ball_point_toi;
use crate::dynamics::DynamicsError;

use super::{Contact, Impact, Obstacle};

/// A finite line segment, solid from both sides, with point end-caps.
///
/// The impact solve delegates to an interior-line test plus a ball-point
/// test at each endpoint; the contact hint records which of the three
/// surfaces was hit so the response picks the right normal.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct LineSegment {
    start: FloatVec,
    end: FloatVec,
    // Unit direction from start to end, and the segment length.
    along: FloatVec,
    length: f64,
}

impl LineSegment {
    pub fn new(start: FloatVec, end: FloatVec) -> Result<Self, DynamicsError> {
        if !start.is_finite() || !end.is_finite() {
            return Err(DynamicsError::NonFiniteInput("segment geometry"));
        }
        let span = end - start;
        let length = span.magnitude();
        if length == 0.0 {
            return Err(DynamicsError::DegenerateObstacle(
                "segment endpoints coincide",
            ));
        }
        Ok(LineSegment {
            start,
            end,
            along: span / length,
            length,
        })
    }

    pub fn start(&self) -> FloatVec {
        self.start
    }

    pub fn end(&self) -> FloatVec {
        self.end
    }

    fn face_impact(&self, pos: FloatVec, vel: FloatVec, radius: f64) -> Option<Impact> {
        let left = self.along.anti_clockwise_perpendicular();
        let offset = (pos - self.start).dot(&left);
        if offset == 0.0 {
            // Centre exactly on the carrier line; only the caps can apply.
            return None;
        }
        // Face the side the ball is currently on.
        let normal = if offset > 0.0 { left } else { -left };
        let closing = vel.dot(&normal);
        if closing >= 0.0 {
            return None;
        }
        let clearance = offset.abs() - radius;
        let time = if clearance < 0.0 {
            // Overlapping the face while approaching: the collision is
            // already due, as for an overlapping ball pair.
            0.0
        } else {
            clearance / -closing
        };
        let reach = (pos + time * vel - self.start).dot(&self.along);
        if (0.0..=self.length).contains(&reach) {
            Some(Impact {
                time,
                contact: Contact::Flat { normal },
            })
        } else {
            None
        }
    }
}

impl Obstacle for LineSegment {
    fn time_of_impact(&self, pos: FloatVec, vel: FloatVec, radius: f64) -> Option<Impact> {
        let mut best = self.face_impact(pos, vel, radius);
        for cap in [self.start, self.end] {
            let time = ball_point_toi(pos, vel, radius, cap);
            if time.is_finite() && best.map_or(true, |impact| time < impact.time) {
                best = Some(Impact {
                    time,
                    contact: Contact::Round { centre: cap },
                });
            }
        }
        best
    }
}
