use crate::dynamics::maths::FloatVec;

/// Time until two balls first touch, measured from the instant at which
/// `dpos` and `dvel` were sampled.
///
/// `dpos` is the offset from the first centre to the second, `dvel` the
/// relative velocity of the second with respect to the first, and
/// `radius_sum` the contact distance. Returns `f64::INFINITY` when the pair
/// never meets; already-overlapping balls that are still approaching collide
/// immediately at time zero.
pub fn ball_ball_toi(dpos: FloatVec, dvel: FloatVec, radius_sum: f64) -> f64 {
    let speed_squared = dvel.dot(&dvel);
    if speed_squared == 0.0 {
        // Relatively stationary pairs keep their distance forever.
        return f64::INFINITY;
    }

    let approach = dpos.dot(&dvel);
    if approach >= 0.0 {
        // Separating, or moving perpendicular to the line of centres.
        return f64::INFINITY;
    }

    let gap = dpos.dot(&dpos) - radius_sum * radius_sum;
    let discriminant = approach * approach - speed_squared * gap;
    if discriminant < 0.0 {
        // Closest approach stays wider than the contact distance.
        return f64::INFINITY;
    }
    if gap < 0.0 {
        // Overlapping and approaching: the collision is already due.
        return 0.0;
    }

    // The textbook root (-b - sqrt(D)) / a cancels catastrophically for
    // grazing impacts; with `approach < 0` this equivalent form is stable.
    let toi = gap / (-approach + discriminant.sqrt());
    if toi < 0.0 {
        f64::INFINITY
    } else {
        toi
    }
}

/// Time until a ball of radius `radius` first touches the fixed point
/// `point`, or `f64::INFINITY`.
pub fn ball_point_toi(pos: FloatVec, vel: FloatVec, radius: f64, point: FloatVec) -> f64 {
    ball_ball_toi(point - pos, -vel, radius)
}

/// Post-impact velocities of two touching balls, with `normal` the unit
/// vector from the first centre to the second.
///
/// Conserves momentum and kinetic energy along the line of centres. An
/// infinite-mass ball absorbs no momentum and reflects its partner; two
/// infinite masses pass the contact unchanged. Massless balls are tracers:
/// they bounce off their partner without disturbing it, and two massless
/// balls treat each other as equals.
pub fn elastic_collision(
    mass1: f64,
    mass2: f64,
    vel1: FloatVec,
    vel2: FloatVec,
    normal: FloatVec,
) -> (FloatVec, FloatVec) {
    if mass1.is_infinite() && mass2.is_infinite() {
        return (vel1, vel2);
    }

    let relative = (vel2 - vel1).dot(&normal);
    let (gain1, gain2) = if mass1.is_infinite() {
        (0.0, 2.0)
    } else if mass2.is_infinite() {
        (2.0, 0.0)
    } else if mass1 == 0.0 && mass2 == 0.0 {
        (1.0, 1.0)
    } else {
        let total = mass1 + mass2;
        (2.0 * mass2 / total, 2.0 * mass1 / total)
    };

    (
        vel1 + gain1 * relative * normal,
        vel2 - gain2 * relative * normal,
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dynamics::maths::approx_eq_f64;

    const INF: f64 = f64::INFINITY;

    fn head_on(gap_x: f64, speed: f64, radius_sum: f64) -> f64 {
        ball_ball_toi(
            FloatVec::new(gap_x, 0.0),
            FloatVec::new(-speed, 0.0),
            radius_sum,
        )
    }

    #[test]
    fn head_on_impact() {
        // Centres 1 apart, closing at 1, touching at 0.2: meet after 0.8.
        assert!((head_on(1.0, 1.0, 0.2) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn separating_pair_never_meets() {
        assert_eq!(head_on(1.0, -1.0, 0.2), INF);
    }

    #[test]
    fn stationary_pair_never_meets() {
        assert_eq!(
            ball_ball_toi(FloatVec::new(3.0, 0.0), FloatVec::origin(), 1.0),
            INF
        );
    }

    #[test]
    fn wide_miss_never_meets() {
        // Passing lane is 2 off-axis, contact distance only 0.5.
        let toi = ball_ball_toi(FloatVec::new(10.0, 2.0), FloatVec::new(-1.0, 0.0), 0.5);
        assert_eq!(toi, INF);
    }

    #[test]
    fn overlap_collides_immediately() {
        assert_eq!(head_on(0.5, 1.0, 0.6), 0.0);
    }

    #[test]
    fn overlap_separating_is_ignored() {
        assert_eq!(head_on(0.5, -1.0, 0.6), INF);
    }

    #[test]
    fn grazing_impact_is_finite_and_accurate() {
        // Contact distance 1, offset lane 1 - 1e-9: an almost tangent pass.
        let offset = 1.0 - 1e-9;
        let toi = ball_ball_toi(FloatVec::new(100.0, offset), FloatVec::new(-1.0, 0.0), 1.0);
        assert!(toi.is_finite());
        let expected = 100.0 - (1.0 - offset * offset).sqrt();
        assert!((toi - expected).abs() < 1e-6);
    }

    #[test]
    fn point_impact_matches_zero_radius_partner() {
        let toi = ball_point_toi(
            FloatVec::origin(),
            FloatVec::new(1.0, 0.0),
            0.25,
            FloatVec::new(2.0, 0.0),
        );
        assert!(approx_eq_f64(toi, 1.75, 1));
    }

    #[test]
    fn equal_masses_swap_normal_components() {
        let normal = FloatVec::new(1.0, 0.0);
        let (v1, v2) = elastic_collision(
            1.0,
            1.0,
            FloatVec::new(2.0, 1.0),
            FloatVec::new(-1.0, -3.0),
            normal,
        );
        assert_eq!(v1, FloatVec::new(-1.0, 1.0));
        assert_eq!(v2, FloatVec::new(2.0, -3.0));
    }

    #[test]
    fn unequal_masses_conserve_momentum_and_energy() {
        let normal = FloatVec::new(1.0, 0.0);
        let (m1, m2) = (1.0, 2.0);
        let (u1, u2) = (FloatVec::new(4.0, 0.0), FloatVec::new(-1.0, 0.0));
        let (v1, v2) = elastic_collision(m1, m2, u1, u2, normal);

        let momentum_before = m1 * u1.x + m2 * u2.x;
        let momentum_after = m1 * v1.x + m2 * v2.x;
        assert!((momentum_before - momentum_after).abs() < 1e-12);

        let energy_before = m1 * u1.dot(&u1) + m2 * u2.dot(&u2);
        let energy_after = m1 * v1.dot(&v1) + m2 * v2.dot(&v2);
        assert!((energy_before - energy_after).abs() < 1e-12);
    }

    #[test]
    fn infinite_mass_reflects_partner() {
        let normal = FloatVec::new(1.0, 0.0);
        let (v1, v2) = elastic_collision(
            f64::INFINITY,
            1.0,
            FloatVec::origin(),
            FloatVec::new(-3.0, 2.0),
            normal,
        );
        assert_eq!(v1, FloatVec::origin());
        assert_eq!(v2, FloatVec::new(3.0, 2.0));
    }

    #[test]
    fn two_infinite_masses_pass_unchanged() {
        let normal = FloatVec::new(1.0, 0.0);
        let (u1, u2) = (FloatVec::new(1.0, 0.0), FloatVec::new(-1.0, 0.0));
        let (v1, v2) = elastic_collision(f64::INFINITY, f64::INFINITY, u1, u2, normal);
        assert_eq!(v1, u1);
        assert_eq!(v2, u2);
    }

    #[test]
    fn massless_tracer_bounces_without_disturbing() {
        let normal = FloatVec::new(1.0, 0.0);
        let (v1, v2) = elastic_collision(
            0.0,
            1.0,
            FloatVec::new(2.0, 0.0),
            FloatVec::origin(),
            normal,
        );
        // The tracer reflects as if off an immovable body.
        assert_eq!(v1, FloatVec::new(-2.0, 0.0));
        assert_eq!(v2, FloatVec::origin());
    }
}
