use crate::dynamics::maths::FloatVec;
use crate::dynamics::DynamicsError;

/// Dense structure-of-arrays storage for the per-ball kinematic state.
///
/// A ball's position is stored as the pair `(initial_time, initial_position)`
/// sampled at the last instant its velocity changed; the position at any
/// later time is reconstructed as `p0 + (t - t0) * v`. Nothing here is
/// rewritten while a ball flies freely, which is what makes interrupted and
/// resumed evolution bitwise identical to a single run.
#[derive(Clone, Debug, Default)]
pub struct BallStore {
    initial_time: Vec<f64>,
    initial_position: Vec<FloatVec>,
    velocity: Vec<FloatVec>,
    mass: Vec<f64>,
    radius: Vec<f64>,
}

impl BallStore {
    pub fn len(&self) -> usize {
        self.initial_time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.initial_time.is_empty()
    }

    /// Append a ball whose trajectory starts at `time`, returning its index.
    pub fn push(
        &mut self,
        time: f64,
        position: FloatVec,
        velocity: FloatVec,
        radius: f64,
        mass: f64,
    ) -> Result<usize, DynamicsError> {
        if !position.is_finite() {
            return Err(DynamicsError::NonFiniteInput("position"));
        }
        if !velocity.is_finite() {
            return Err(DynamicsError::NonFiniteInput("velocity"));
        }
        if !radius.is_finite() || radius < 0.0 {
            return Err(DynamicsError::InvalidRadius(radius));
        }
        if !(mass > 0.0) {
            // Catches zero, negatives and NaN; +inf is a legal mass.
            return Err(DynamicsError::InvalidMass(mass));
        }

        self.initial_time.push(time);
        self.initial_position.push(position);
        self.velocity.push(velocity);
        self.mass.push(mass);
        self.radius.push(radius);
        Ok(self.len() - 1)
    }

    pub fn check_index(&self, index: usize) -> Result<(), DynamicsError> {
        if index < self.len() {
            Ok(())
        } else {
            Err(DynamicsError::NoSuchBall(index))
        }
    }

    /// The ball's centre at simulation time `time`.
    pub fn position_at(&self, index: usize, time: f64) -> FloatVec {
        self.initial_position[index] + (time - self.initial_time[index]) * self.velocity[index]
    }

    /// Rewrite the stored trajectory so it restarts at `time` from the
    /// position the ball holds there. Called exactly when a ball's velocity
    /// is about to change.
    pub fn rebase(&mut self, index: usize, time: f64) {
        let position = self.position_at(index, time);
        self.initial_position[index] = position;
        self.initial_time[index] = time;
    }

    pub fn set_initial(&mut self, index: usize, time: f64, position: FloatVec) {
        self.initial_time[index] = time;
        self.initial_position[index] = position;
    }

    pub fn set_velocity(&mut self, index: usize, velocity: FloatVec) {
        self.velocity[index] = velocity;
    }

    pub fn set_radius(&mut self, index: usize, radius: f64) {
        self.radius[index] = radius;
    }

    pub fn set_mass(&mut self, index: usize, mass: f64) {
        self.mass[index] = mass;
    }

    pub fn initial_time(&self) -> &[f64] {
        &self.initial_time
    }

    pub fn initial_position(&self) -> &[FloatVec] {
        &self.initial_position
    }

    pub fn velocity(&self) -> &[FloatVec] {
        &self.velocity
    }

    pub fn mass(&self) -> &[f64] {
        &self.mass
    }

    pub fn radius(&self) -> &[f64] {
        &self.radius
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn push_assigns_dense_indices() {
        let mut balls = BallStore::default();
        let a = balls
            .push(0.0, FloatVec::origin(), FloatVec::origin(), 0.0, 1.0)
            .unwrap();
        let b = balls
            .push(0.0, FloatVec::new(1.0, 0.0), FloatVec::origin(), 0.5, 2.0)
            .unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(balls.len(), 2);
    }

    #[test]
    fn push_validates_every_field() {
        let mut balls = BallStore::default();
        let origin = FloatVec::origin();
        assert_eq!(
            balls.push(0.0, FloatVec::new(f64::NAN, 0.0), origin, 0.0, 1.0),
            Err(DynamicsError::NonFiniteInput("position"))
        );
        assert_eq!(
            balls.push(0.0, origin, FloatVec::new(f64::INFINITY, 0.0), 0.0, 1.0),
            Err(DynamicsError::NonFiniteInput("velocity"))
        );
        assert_eq!(
            balls.push(0.0, origin, origin, -1.0, 1.0),
            Err(DynamicsError::InvalidRadius(-1.0))
        );
        assert_eq!(
            balls.push(0.0, origin, origin, 0.0, 0.0),
            Err(DynamicsError::InvalidMass(0.0))
        );
        assert_eq!(
            balls.push(0.0, origin, origin, 0.0, -2.0),
            Err(DynamicsError::InvalidMass(-2.0))
        );
        // Infinite mass is allowed.
        assert!(balls.push(0.0, origin, origin, 0.0, f64::INFINITY).is_ok());
    }

    #[test]
    fn position_extrapolates_from_the_initial_state() {
        let mut balls = BallStore::default();
        balls
            .push(2.0, FloatVec::new(1.0, 1.0), FloatVec::new(3.0, -1.0), 0.0, 1.0)
            .unwrap();
        assert_eq!(balls.position_at(0, 4.0), FloatVec::new(7.0, -1.0));
    }

    #[test]
    fn rebase_is_invisible_to_the_trajectory() {
        let mut balls = BallStore::default();
        balls
            .push(0.0, FloatVec::new(0.5, 0.0), FloatVec::new(0.25, 0.125), 0.0, 1.0)
            .unwrap();
        let later = balls.position_at(0, 8.0);
        balls.rebase(0, 4.0);
        assert_eq!(balls.initial_time()[0], 4.0);
        // Powers of two keep the arithmetic exact, so this holds bitwise.
        assert_eq!(balls.position_at(0, 8.0), later);
    }

    #[test]
    fn index_checks() {
        let mut balls = BallStore::default();
        assert_eq!(balls.check_index(0), Err(DynamicsError::NoSuchBall(0)));
        balls
            .push(0.0, FloatVec::origin(), FloatVec::origin(), 0.0, 1.0)
            .unwrap();
        assert!(balls.check_index(0).is_ok());
        assert_eq!(balls.check_index(1), Err(DynamicsError::NoSuchBall(1)));
    }
}
