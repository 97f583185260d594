use pyo3::prelude::*;

use crate::dynamics::maths::FloatVec;
use crate::dynamics::physics::ball_ball_toi;
use crate::dynamics::DynamicsError;

use super::{Contact, Impact, Obstacle};

/// A static circular obstacle. The exterior is everything at or beyond its
/// radius, so balls bounce off its rim from the outside.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct Disk {
    centre: FloatVec,
    radius: f64,
}

impl Disk {
    pub fn new(centre: FloatVec, radius: f64) -> Result<Disk, DynamicsError> {
        if !centre.is_finite() || !radius.is_finite() {
            return Err(DynamicsError::NonFiniteInput("disk geometry"));
        }
        if radius <= 0.0 {
            return Err(DynamicsError::DegenerateObstacle(
                "a disk obstacle needs a positive radius",
            ));
        }
        Ok(Disk { centre, radius })
    }

    pub fn centre(&self) -> FloatVec {
        self.centre
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }
}

impl Obstacle for Disk {
    fn time_of_impact(&self, pos: FloatVec, vel: FloatVec, radius: f64) -> Option<Impact> {
        let offset = pos - self.centre;
        if offset.dot(&offset) < self.radius * self.radius {
            // The ball centre is strictly inside the disk; it is on the
            // wrong side of the surface and never hits it from outside.
            return None;
        }

        let time = ball_ball_toi(self.centre - pos, -vel, self.radius + radius);
        if time.is_finite() {
            Some(Impact {
                time,
                contact: Contact::Round {
                    centre: self.centre,
                },
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dynamics::maths::approx_eq_f64;

    fn unit_disk() -> Disk {
        Disk::new(FloatVec::origin(), 1.0).unwrap()
    }

    #[test]
    fn rejects_degenerate_radius() {
        assert!(Disk::new(FloatVec::origin(), 0.0).is_err());
        assert!(Disk::new(FloatVec::origin(), -1.0).is_err());
        assert!(Disk::new(FloatVec::origin(), f64::NAN).is_err());
    }

    #[test]
    fn head_on_approach() {
        let disk = unit_disk();
        let impact = disk
            .time_of_impact(FloatVec::new(4.0, 0.0), FloatVec::new(-1.0, 0.0), 0.5)
            .unwrap();
        // Surfaces meet when the centres are 1.5 apart.
        assert!(approx_eq_f64(impact.time, 2.5, 1));
        assert_eq!(
            impact.contact,
            Contact::Round {
                centre: FloatVec::origin()
            }
        );
    }

    #[test]
    fn receding_ball_never_hits() {
        let disk = unit_disk();
        assert!(disk
            .time_of_impact(FloatVec::new(4.0, 0.0), FloatVec::new(1.0, 0.0), 0.5)
            .is_none());
    }

    #[test]
    fn ball_inside_the_disk_never_hits() {
        let disk = unit_disk();
        assert!(disk
            .time_of_impact(FloatVec::new(0.5, 0.0), FloatVec::new(-1.0, 0.0), 0.1)
            .is_none());
    }

    #[test]
    fn overlapping_ball_collides_immediately() {
        let disk = unit_disk();
        // Centre outside the disk but inside the contact ring.
        let impact = disk
            .time_of_impact(FloatVec::new(1.2, 0.0), FloatVec::new(-1.0, 0.0), 0.5)
            .unwrap();
        assert_eq!(impact.time, 0.0);
    }

    #[test]
    fn collide_reflects_off_the_rim() {
        let disk = unit_disk();
        let impact = disk
            .time_of_impact(FloatVec::new(4.0, 0.0), FloatVec::new(-1.0, 0.0), 0.5)
            .unwrap();
        let contact_pos = FloatVec::new(4.0, 0.0) + impact.time * FloatVec::new(-1.0, 0.0);
        let out = disk.collide(contact_pos, FloatVec::new(-1.0, 0.0), 0.5, impact.contact);
        assert_eq!(out, FloatVec::new(1.0, 0.0));
    }
}
