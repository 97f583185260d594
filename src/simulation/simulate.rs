use std::sync::Arc;

use fnv::FnvHashMap;
use itertools::Itertools;
use log::debug;
use pyo3::prelude::*;

use crate::dynamics::maths::FloatVec;
use crate::dynamics::physics::elastic_collision;
use crate::dynamics::DynamicsError;
use crate::obstacles::Obstacle;

use super::balls::BallStore;
use super::schedule::{Collision, CollisionPartner, ToiTables};

/// What one participating ball saw of a resolved collision. Handed to the
/// ball callbacks registered for an `evolve` call.
#[derive(Clone, Copy, Debug)]
pub struct CollisionRecord {
    pub time: f64,
    pub ball: usize,
    /// The ball's centre at the moment of impact.
    pub position: FloatVec,
    pub old_velocity: FloatVec,
    pub new_velocity: FloatVec,
    pub partner: CollisionPartner,
}

pub type TimeCallback<'a> = Box<dyn FnMut(f64) + 'a>;
pub type BallCallback<'a> = Box<dyn FnMut(&CollisionRecord) + 'a>;

/// Observer hooks for one `evolve` call. For every resolved event the time
/// callback fires first, then the callbacks of participating balls in
/// ascending ball order. Callbacks see snapshots; edits go through the edit
/// API between `evolve` calls, followed by `recompute_toi`.
#[derive(Default)]
pub struct EvolveCallbacks<'a> {
    pub time_callback: Option<TimeCallback<'a>>,
    pub ball_callbacks: FnvHashMap<usize, BallCallback<'a>>,
}

/// A deterministic event-driven billiard table.
///
/// Balls fly in straight lines between perfectly elastic collisions with
/// each other and with the static obstacles registered at construction.
/// Evolution jumps from collision to collision, so fast balls cannot tunnel
/// and collision-free stretches are resolved in closed form.
#[pyclass]
pub struct Simulation {
    time: f64,
    balls: BallStore,
    obstacles: Vec<Arc<dyn Obstacle>>,
    tables: ToiTables,
    ball_ball_count: u64,
    ball_obstacle_count: u64,
    // Python-side identities of the obstacles, kept by the pyo3 surface so
    // queries can hand back the very objects the caller registered.
    pub(crate) obstacle_handles: Vec<PyObject>,
}

impl Simulation {
    pub fn new(obstacles: Vec<Arc<dyn Obstacle>>) -> Simulation {
        Simulation {
            time: 0.0,
            balls: BallStore::default(),
            obstacles,
            tables: ToiTables::default(),
            ball_ball_count: 0,
            ball_obstacle_count: 0,
            obstacle_handles: Vec::new(),
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn balls(&self) -> &BallStore {
        &self.balls
    }

    pub fn obstacles(&self) -> &[Arc<dyn Obstacle>] {
        &self.obstacles
    }

    /// Ball-ball collisions resolved over the simulation's lifetime.
    pub fn ball_ball_collisions(&self) -> u64 {
        self.ball_ball_count
    }

    /// Ball-obstacle collisions resolved over the simulation's lifetime.
    pub fn ball_obstacle_collisions(&self) -> u64 {
        self.ball_obstacle_count
    }

    /// Add a ball whose trajectory starts at the current time, growing and
    /// filling the collision caches. Returns the ball's index.
    pub fn add_ball(
        &mut self,
        position: FloatVec,
        velocity: FloatVec,
        radius: f64,
        mass: f64,
    ) -> Result<usize, DynamicsError> {
        let index = self
            .balls
            .push(self.time, position, velocity, radius, mass)?;
        self.tables.add_ball(&self.balls, &self.obstacles, self.time);
        debug!(
            "added ball {index} at ({}, {}) with radius {radius} and mass {mass}",
            position.x, position.y
        );
        Ok(index)
    }

    /// The ball's centre at the current time.
    pub fn position(&self, index: usize) -> Result<FloatVec, DynamicsError> {
        self.balls.check_index(index)?;
        Ok(self.balls.position_at(index, self.time))
    }

    /// All ball centres at the current time.
    pub fn positions(&self) -> Vec<FloatVec> {
        (0..self.balls.len())
            .map(|index| self.balls.position_at(index, self.time))
            .collect()
    }

    /// Teleport a ball to `position`, restarting its stored trajectory at
    /// the current time. Follow up with [`Simulation::recompute_toi`].
    pub fn set_position(&mut self, index: usize, position: FloatVec) -> Result<(), DynamicsError> {
        self.balls.check_index(index)?;
        if !position.is_finite() {
            return Err(DynamicsError::NonFiniteInput("position"));
        }
        self.balls.set_initial(index, self.time, position);
        Ok(())
    }

    /// Change a ball's velocity. The stored trajectory is rebased to the
    /// current time first, so the ball's past is left untouched. Follow up
    /// with [`Simulation::recompute_toi`].
    pub fn set_velocity(&mut self, index: usize, velocity: FloatVec) -> Result<(), DynamicsError> {
        self.balls.check_index(index)?;
        if !velocity.is_finite() {
            return Err(DynamicsError::NonFiniteInput("velocity"));
        }
        self.balls.rebase(index, self.time);
        self.balls.set_velocity(index, velocity);
        Ok(())
    }

    /// Change a ball's radius. Follow up with [`Simulation::recompute_toi`];
    /// any overlap the new radius creates is the caller's to resolve.
    pub fn set_radius(&mut self, index: usize, radius: f64) -> Result<(), DynamicsError> {
        self.balls.check_index(index)?;
        if !radius.is_finite() || radius < 0.0 {
            return Err(DynamicsError::InvalidRadius(radius));
        }
        self.balls.set_radius(index, radius);
        Ok(())
    }

    /// Change a ball's mass. Masses do not enter impact times, but a repair
    /// via [`Simulation::recompute_toi`] keeps the edit contract uniform.
    pub fn set_mass(&mut self, index: usize, mass: f64) -> Result<(), DynamicsError> {
        self.balls.check_index(index)?;
        if !(mass > 0.0) {
            return Err(DynamicsError::InvalidMass(mass));
        }
        self.balls.set_mass(index, mass);
        Ok(())
    }

    /// Repair the collision caches for the given balls after out-of-band
    /// edits. Duplicate indices are tolerated.
    pub fn recompute_toi(&mut self, indices: &[usize]) -> Result<(), DynamicsError> {
        for &index in indices {
            self.balls.check_index(index)?;
        }
        let distinct: Vec<usize> = indices.iter().copied().unique().collect();
        self.tables
            .repair(&distinct, &self.balls, &self.obstacles, self.time);
        Ok(())
    }

    /// The earliest scheduled ball-ball collision as `(time, pair)`; an
    /// infinite time with no pair means no such collision is due.
    pub fn next_ball_ball_collision(&self) -> (f64, Option<(usize, usize)>) {
        match self.tables.next_ball_ball() {
            Some(Collision {
                time,
                ball,
                partner: CollisionPartner::Ball(other),
            }) => (time, Some((ball, other))),
            _ => (f64::INFINITY, None),
        }
    }

    /// The earliest scheduled ball-obstacle collision as
    /// `(time, (ball, obstacle index))`.
    pub fn next_ball_obstacle_collision(&self) -> (f64, Option<(usize, usize)>) {
        match self.tables.next_ball_obstacle() {
            Some(Collision {
                time,
                ball,
                partner: CollisionPartner::Obstacle(obstacle),
            }) => (time, Some((ball, obstacle))),
            _ => (f64::INFINITY, None),
        }
    }

    /// The global next event, if any is scheduled.
    pub fn next_collision(&self) -> Option<Collision> {
        self.tables.next_collision()
    }

    /// Advance the simulation until `end_time`, resolving every collision
    /// due on the way. Returns how many ball-ball and ball-obstacle
    /// collisions this call resolved.
    pub fn evolve(&mut self, end_time: f64) -> Result<(u64, u64), DynamicsError> {
        self.evolve_with(end_time, &mut EvolveCallbacks::default())
    }

    /// [`Simulation::evolve`] with observer hooks.
    pub fn evolve_with(
        &mut self,
        end_time: f64,
        callbacks: &mut EvolveCallbacks<'_>,
    ) -> Result<(u64, u64), DynamicsError> {
        if !end_time.is_finite() {
            return Err(DynamicsError::NonFiniteInput("end_time"));
        }
        if end_time < self.time {
            return Err(DynamicsError::TimeReversal {
                current: self.time,
                requested: end_time,
            });
        }

        let mut resolved = (0, 0);
        loop {
            let event = match self.tables.next_collision() {
                Some(event) if event.time <= end_time => event,
                // Nothing due before `end_time`: the clock jumps there and
                // every ball keeps its stored trajectory untouched.
                _ => break,
            };
            self.time = event.time;
            match event.partner {
                CollisionPartner::Ball(second) => {
                    self.resolve_ball_ball(event.ball, second, callbacks)?;
                    resolved.0 += 1;
                }
                CollisionPartner::Obstacle(obstacle) => {
                    self.resolve_ball_obstacle(event.ball, obstacle, callbacks);
                    resolved.1 += 1;
                }
            }
        }
        self.time = end_time;
        Ok(resolved)
    }

    fn resolve_ball_ball(
        &mut self,
        first: usize,
        second: usize,
        callbacks: &mut EvolveCallbacks<'_>,
    ) -> Result<(), DynamicsError> {
        let time = self.time;
        self.balls.rebase(first, time);
        self.balls.rebase(second, time);

        let offset =
            self.balls.initial_position()[second] - self.balls.initial_position()[first];
        let distance_squared = offset.dot(&offset);
        if distance_squared == 0.0 {
            return Err(DynamicsError::IntersectingParticles);
        }
        let normal = offset / distance_squared.sqrt();

        let old_first = self.balls.velocity()[first];
        let old_second = self.balls.velocity()[second];
        let (new_first, new_second) = elastic_collision(
            self.balls.mass()[first],
            self.balls.mass()[second],
            old_first,
            old_second,
            normal,
        );
        self.balls.set_velocity(first, new_first);
        self.balls.set_velocity(second, new_second);
        self.ball_ball_count += 1;
        debug!("ball-ball collision of {first} and {second} at t = {time}");

        let mut records = [
            CollisionRecord {
                time,
                ball: first,
                position: self.balls.initial_position()[first],
                old_velocity: old_first,
                new_velocity: new_first,
                partner: CollisionPartner::Ball(second),
            },
            CollisionRecord {
                time,
                ball: second,
                position: self.balls.initial_position()[second],
                old_velocity: old_second,
                new_velocity: new_second,
                partner: CollisionPartner::Ball(first),
            },
        ];
        records.sort_by_key(|record| record.ball);
        Self::notify(callbacks, time, &records);

        self.tables
            .repair(&[first, second], &self.balls, &self.obstacles, time);
        Ok(())
    }

    fn resolve_ball_obstacle(
        &mut self,
        ball: usize,
        obstacle: usize,
        callbacks: &mut EvolveCallbacks<'_>,
    ) {
        let time = self.time;
        self.balls.rebase(ball, time);

        let position = self.balls.initial_position()[ball];
        let old_velocity = self.balls.velocity()[ball];
        let contact = self.tables.contact(ball, obstacle);
        let new_velocity = self.obstacles[obstacle].collide(
            position,
            old_velocity,
            self.balls.radius()[ball],
            contact,
        );
        self.balls.set_velocity(ball, new_velocity);
        self.ball_obstacle_count += 1;
        debug!("ball-obstacle collision of {ball} and obstacle {obstacle} at t = {time}");

        let records = [CollisionRecord {
            time,
            ball,
            position,
            old_velocity,
            new_velocity,
            partner: CollisionPartner::Obstacle(obstacle),
        }];
        Self::notify(callbacks, time, &records);

        self.tables
            .repair(&[ball], &self.balls, &self.obstacles, time);
    }

    fn notify(callbacks: &mut EvolveCallbacks<'_>, time: f64, records: &[CollisionRecord]) {
        if let Some(time_callback) = callbacks.time_callback.as_mut() {
            time_callback(time);
        }
        for record in records {
            if let Some(ball_callback) = callbacks.ball_callbacks.get_mut(&record.ball) {
                ball_callback(record);
            }
        }
    }
}
