use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use pyo3::{exceptions::PyValueError, prelude::*};

use crate::obstacles::{Disk, InfiniteWall, LineSegment, Obstacle};

pub mod balls;
pub mod schedule;
pub mod simulate;

pub use balls::BallStore;
pub use schedule::{Collision, CollisionPartner};
pub use simulate::{
    BallCallback, CollisionRecord, EvolveCallbacks, Simulation, TimeCallback,
};

#[pymethods]
impl Simulation {
    #[new]
    #[pyo3(signature = (obstacles=None))]
    fn py_new(py: Python, obstacles: Option<Vec<PyObject>>) -> PyResult<Self> {
        let handles = obstacles.unwrap_or_default();
        let mut shapes: Vec<Arc<dyn Obstacle>> = Vec::with_capacity(handles.len());
        for handle in handles.iter() {
            if let Ok(disk) = handle.extract::<Disk>(py) {
                shapes.push(Arc::new(disk));
            } else if let Ok(wall) = handle.extract::<InfiniteWall>(py) {
                shapes.push(Arc::new(wall));
            } else if let Ok(segment) = handle.extract::<LineSegment>(py) {
                shapes.push(Arc::new(segment));
            } else {
                return Err(PyValueError::new_err(
                    "obstacles must be Disk, InfiniteWall or LineSegment instances",
                ));
            }
        }
        let mut simulation = Simulation::new(shapes);
        simulation.obstacle_handles = handles;
        Ok(simulation)
    }

    #[getter(time)]
    fn py_get_time(&self) -> f64 {
        self.time()
    }

    #[getter(obstacles)]
    fn py_get_obstacles(&self, py: Python) -> Vec<PyObject> {
        self.obstacle_handles
            .iter()
            .map(|handle| handle.clone_ref(py))
            .collect()
    }

    #[getter(balls_initial_time)]
    fn py_get_balls_initial_time(&self) -> Vec<f64> {
        self.balls().initial_time().to_vec()
    }

    #[getter(balls_initial_position)]
    fn py_get_balls_initial_position(&self) -> Vec<(f64, f64)> {
        self.balls()
            .initial_position()
            .iter()
            .map(|&position| position.into())
            .collect()
    }

    #[getter(balls_velocity)]
    fn py_get_balls_velocity(&self) -> Vec<(f64, f64)> {
        self.balls()
            .velocity()
            .iter()
            .map(|&velocity| velocity.into())
            .collect()
    }

    #[getter(balls_mass)]
    fn py_get_balls_mass(&self) -> Vec<f64> {
        self.balls().mass().to_vec()
    }

    #[getter(balls_radius)]
    fn py_get_balls_radius(&self) -> Vec<f64> {
        self.balls().radius().to_vec()
    }

    /// The materialised ball centres at the current time.
    #[getter(balls_position)]
    fn py_get_balls_position(&self) -> Vec<(f64, f64)> {
        self.positions()
            .into_iter()
            .map(|position| position.into())
            .collect()
    }

    #[getter(num_ball_ball_collisions)]
    fn py_get_num_ball_ball_collisions(&self) -> u64 {
        self.ball_ball_collisions()
    }

    #[getter(num_ball_obstacle_collisions)]
    fn py_get_num_ball_obstacle_collisions(&self) -> u64 {
        self.ball_obstacle_collisions()
    }

    #[pyo3(name = "add_ball", signature = (pos, vel, radius=0.0, mass=1.0))]
    fn py_add_ball(
        &mut self,
        pos: (f64, f64),
        vel: (f64, f64),
        radius: f64,
        mass: f64,
    ) -> PyResult<usize> {
        Ok(self.add_ball(pos.into(), vel.into(), radius, mass)?)
    }

    #[pyo3(name = "position")]
    fn py_position(&self, index: usize) -> PyResult<(f64, f64)> {
        Ok(self.position(index)?.into())
    }

    #[pyo3(name = "set_position")]
    fn py_set_position(&mut self, index: usize, pos: (f64, f64)) -> PyResult<()> {
        Ok(self.set_position(index, pos.into())?)
    }

    #[pyo3(name = "set_velocity")]
    fn py_set_velocity(&mut self, index: usize, vel: (f64, f64)) -> PyResult<()> {
        Ok(self.set_velocity(index, vel.into())?)
    }

    #[pyo3(name = "set_radius")]
    fn py_set_radius(&mut self, index: usize, radius: f64) -> PyResult<()> {
        Ok(self.set_radius(index, radius)?)
    }

    #[pyo3(name = "set_mass")]
    fn py_set_mass(&mut self, index: usize, mass: f64) -> PyResult<()> {
        Ok(self.set_mass(index, mass)?)
    }

    #[pyo3(name = "recompute_toi")]
    fn py_recompute_toi(&mut self, indices: Vec<usize>) -> PyResult<()> {
        Ok(self.recompute_toi(&indices)?)
    }

    /// `(time, i, j)`; no scheduled collision reads `(inf, -1, 0)`.
    #[getter(next_ball_ball_collision)]
    fn py_get_next_ball_ball_collision(&self) -> (f64, i64, i64) {
        match self.next_ball_ball_collision() {
            (time, Some((ball, other))) => (time, ball as i64, other as i64),
            (time, None) => (time, -1, 0),
        }
    }

    /// `(time, i, obstacle)`; no scheduled collision reads `(inf, -1, None)`.
    #[getter(next_ball_obstacle_collision)]
    fn py_get_next_ball_obstacle_collision(&self, py: Python) -> (f64, i64, Option<PyObject>) {
        match self.next_ball_obstacle_collision() {
            (time, Some((ball, obstacle))) => (
                time,
                ball as i64,
                self.obstacle_handles
                    .get(obstacle)
                    .map(|handle| handle.clone_ref(py)),
            ),
            (time, None) => (time, -1, None),
        }
    }

    /// `(time, i, partner)` with the partner a ball index, an obstacle, or
    /// `None` when nothing is scheduled.
    #[getter(next_collision)]
    fn py_get_next_collision(&self, py: Python) -> (f64, i64, Option<PyObject>) {
        match self.next_collision() {
            Some(Collision {
                time,
                ball,
                partner: CollisionPartner::Ball(other),
            }) => (time, ball as i64, Some(other.into_py(py))),
            Some(Collision {
                time,
                ball,
                partner: CollisionPartner::Obstacle(obstacle),
            }) => (
                time,
                ball as i64,
                self.obstacle_handles
                    .get(obstacle)
                    .map(|handle| handle.clone_ref(py)),
            ),
            None => (f64::INFINITY, -1, None),
        }
    }

    #[pyo3(name = "evolve", signature = (end_time, time_callback=None, ball_callbacks=None))]
    fn py_evolve(
        &mut self,
        py: Python,
        end_time: f64,
        time_callback: Option<PyObject>,
        ball_callbacks: Option<HashMap<usize, PyObject>>,
    ) -> PyResult<(u64, u64)> {
        // The first exception raised inside a callback is parked here and
        // re-raised once the evolution loop has unwound.
        let failure: RefCell<Option<PyErr>> = RefCell::new(None);
        let handles: Vec<PyObject> = self
            .obstacle_handles
            .iter()
            .map(|handle| handle.clone_ref(py))
            .collect();

        let mut hooks = EvolveCallbacks::default();
        if let Some(callback) = time_callback.as_ref() {
            let failure = &failure;
            hooks.time_callback = Some(Box::new(move |time: f64| {
                if failure.borrow().is_some() {
                    return;
                }
                if let Err(err) = callback.call1(py, (time,)) {
                    failure.replace(Some(err));
                }
            }));
        }
        if let Some(callbacks) = ball_callbacks.as_ref() {
            for (&index, callback) in callbacks {
                let failure = &failure;
                let handles = &handles;
                hooks.ball_callbacks.insert(
                    index,
                    Box::new(move |record: &CollisionRecord| {
                        if failure.borrow().is_some() {
                            return;
                        }
                        let partner: PyObject = match record.partner {
                            CollisionPartner::Ball(other) => other.into_py(py),
                            CollisionPartner::Obstacle(obstacle) => match handles.get(obstacle) {
                                Some(handle) => handle.clone_ref(py),
                                None => py.None(),
                            },
                        };
                        let args = (
                            record.time,
                            (record.position.x, record.position.y),
                            (record.old_velocity.x, record.old_velocity.y),
                            (record.new_velocity.x, record.new_velocity.y),
                            partner,
                        );
                        if let Err(err) = callback.call1(py, args) {
                            failure.replace(Some(err));
                        }
                    }),
                );
            }
        }

        let resolved = self.evolve_with(end_time, &mut hooks);
        drop(hooks);
        if let Some(err) = failure.into_inner() {
            return Err(err);
        }
        Ok(resolved?)
    }
}
