use std::sync::Arc;

use log::trace;

use crate::dynamics::physics::ball_ball_toi;
use crate::obstacles::{Contact, Obstacle};

use super::balls::BallStore;

/// The other party of a scheduled or resolved collision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollisionPartner {
    Ball(usize),
    Obstacle(usize),
}

/// A concrete next collision: when, which ball, against what.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collision {
    pub time: f64,
    pub ball: usize,
    pub partner: CollisionPartner,
}

/// Cached minimum of one table row.
#[derive(Clone, Copy, Debug)]
struct RowMin {
    time: f64,
    partner: usize,
}

impl RowMin {
    const NONE: RowMin = RowMin {
        time: f64::INFINITY,
        partner: usize::MAX,
    };
}

/// The engine's two collision caches.
///
/// For every ball the tables hold the absolute time of its next contact
/// with every other ball (`bb`, kept mirror-symmetric) and with every
/// obstacle (`bo`, with the contact hint the obstacle produced), plus a
/// cached per-row minimum so the global next event is found by scanning N
/// row minima instead of N^2 entries. `f64::INFINITY` marks "no future
/// impact" and takes part in the ordinary min-reductions.
///
/// Rows are recomputed only when a ball is inserted, participates in a
/// collision, or is explicitly repaired after an edit. Advancing the clock
/// never touches the tables; that is what keeps split evolution bitwise
/// identical to one-shot evolution.
#[derive(Debug, Default)]
pub(crate) struct ToiTables {
    bb_time: Vec<Vec<f64>>,
    bb_min: Vec<RowMin>,
    bo_time: Vec<Vec<f64>>,
    bo_contact: Vec<Vec<Option<Contact>>>,
    bo_min: Vec<RowMin>,
}

impl ToiTables {
    /// Absolute impact time of the pair `{i, j}`, both balls taken at their
    /// positions at `time`.
    fn pair_time(balls: &BallStore, time: f64, i: usize, j: usize) -> f64 {
        let dpos = balls.position_at(j, time) - balls.position_at(i, time);
        let dvel = balls.velocity()[j] - balls.velocity()[i];
        let radius_sum = balls.radius()[i] + balls.radius()[j];
        time + ball_ball_toi(dpos, dvel, radius_sum)
    }

    fn obstacle_impact(
        balls: &BallStore,
        obstacles: &[Arc<dyn Obstacle>],
        time: f64,
        i: usize,
        k: usize,
    ) -> (f64, Option<Contact>) {
        let pos = balls.position_at(i, time);
        let vel = balls.velocity()[i];
        match obstacles[k].time_of_impact(pos, vel, balls.radius()[i]) {
            Some(impact) => (time + impact.time, Some(impact.contact)),
            None => (f64::INFINITY, None),
        }
    }

    fn scan_row(row: &[f64]) -> RowMin {
        let mut best = RowMin::NONE;
        for (partner, &time) in row.iter().enumerate() {
            if time < best.time {
                best = RowMin { time, partner };
            }
        }
        best
    }

    /// Grow the tables for a freshly pushed ball and fill its rows.
    pub fn add_ball(
        &mut self,
        balls: &BallStore,
        obstacles: &[Arc<dyn Obstacle>],
        time: f64,
    ) {
        let index = balls.len() - 1;
        debug_assert_eq!(self.bb_time.len(), index);

        for row in self.bb_time.iter_mut() {
            row.push(f64::INFINITY);
        }
        self.bb_time.push(vec![f64::INFINITY; index + 1]);
        self.bb_min.push(RowMin::NONE);
        self.bo_time.push(vec![f64::INFINITY; obstacles.len()]);
        self.bo_contact.push(vec![None; obstacles.len()]);
        self.bo_min.push(RowMin::NONE);

        self.repair(&[index], balls, obstacles, time);
    }

    /// Recompute the rows of `participants` against every ball and obstacle,
    /// mirroring pair entries, and refresh the cached minimum of any other
    /// row that referenced a participant.
    pub fn repair(
        &mut self,
        participants: &[usize],
        balls: &BallStore,
        obstacles: &[Arc<dyn Obstacle>],
        time: f64,
    ) {
        let count = balls.len();
        for &i in participants {
            let mut best = RowMin::NONE;
            for j in 0..count {
                let pair = if i == j {
                    f64::INFINITY
                } else {
                    Self::pair_time(balls, time, i, j)
                };
                self.bb_time[i][j] = pair;
                if pair < best.time {
                    best = RowMin {
                        time: pair,
                        partner: j,
                    };
                }
                if i != j {
                    self.bb_time[j][i] = pair;
                    // An improved partner minimum is adopted on the spot; a
                    // minimum gone stale is rescanned below instead.
                    if pair < self.bb_min[j].time {
                        self.bb_min[j] = RowMin {
                            time: pair,
                            partner: i,
                        };
                    }
                }
            }
            self.bb_min[i] = best;

            let mut best = RowMin::NONE;
            for k in 0..obstacles.len() {
                let (impact, contact) = Self::obstacle_impact(balls, obstacles, time, i, k);
                self.bo_time[i][k] = impact;
                self.bo_contact[i][k] = contact;
                if impact < best.time {
                    best = RowMin {
                        time: impact,
                        partner: k,
                    };
                }
            }
            self.bo_min[i] = best;
            trace!(
                "repaired toi row {i}: next ball at {}, next obstacle at {}",
                self.bb_min[i].time,
                self.bo_min[i].time
            );
        }

        for j in 0..count {
            if participants.contains(&j) {
                continue;
            }
            if participants.contains(&self.bb_min[j].partner) {
                self.bb_min[j] = Self::scan_row(&self.bb_time[j]);
            }
        }
    }

    /// The earliest scheduled ball-ball collision. Ties resolve to the pair
    /// with the smallest `(min(i, j), max(i, j))`: the row scan runs in
    /// ascending ball order and only strictly earlier times displace the
    /// incumbent, and within a row the smaller partner wins the same way.
    pub fn next_ball_ball(&self) -> Option<Collision> {
        let mut best: Option<Collision> = None;
        for (ball, row) in self.bb_min.iter().enumerate() {
            if row.time < best.map_or(f64::INFINITY, |event| event.time) {
                best = Some(Collision {
                    time: row.time,
                    ball,
                    partner: CollisionPartner::Ball(row.partner),
                });
            }
        }
        best
    }

    /// The earliest scheduled ball-obstacle collision; ties resolve to the
    /// smallest `(ball, obstacle)` pair.
    pub fn next_ball_obstacle(&self) -> Option<Collision> {
        let mut best: Option<Collision> = None;
        for (ball, row) in self.bo_min.iter().enumerate() {
            if row.time < best.map_or(f64::INFINITY, |event| event.time) {
                best = Some(Collision {
                    time: row.time,
                    ball,
                    partner: CollisionPartner::Obstacle(row.partner),
                });
            }
        }
        best
    }

    /// The global next event; ball-ball collisions precede ball-obstacle
    /// collisions scheduled for the same instant.
    pub fn next_collision(&self) -> Option<Collision> {
        match (self.next_ball_ball(), self.next_ball_obstacle()) {
            (Some(pair), Some(obstacle)) => {
                if pair.time <= obstacle.time {
                    Some(pair)
                } else {
                    Some(obstacle)
                }
            }
            (Some(pair), None) => Some(pair),
            (None, other) => other,
        }
    }

    /// The cached contact hint for a scheduled ball-obstacle collision.
    pub fn contact(&self, ball: usize, obstacle: usize) -> Contact {
        self.bo_contact[ball][obstacle]
            .expect("a scheduled ball-obstacle collision lost its contact hint")
    }
}
