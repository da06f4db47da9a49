//! Unit conversions for spring parameters
//!
//! Springs are solved in raw tension/friction, but designers usually speak
//! in Origami values or in bounciness and speed. These closed-form
//! mappings must stay exact so existing animation curves keep their shape.

/// Convert an Origami tension value to raw spring tension
pub fn tension_from_origami(value: f64) -> f64 {
    (value - 30.0) * 3.62 + 194.0
}

/// Convert raw spring tension back to an Origami tension value
pub fn origami_from_tension(tension: f64) -> f64 {
    (tension - 194.0) / 3.62 + 30.0
}

/// Convert an Origami friction value to raw spring friction
pub fn friction_from_origami(value: f64) -> f64 {
    (value - 8.0) * 3.0 + 25.0
}

/// Convert raw spring friction back to an Origami friction value
pub fn origami_from_friction(friction: f64) -> f64 {
    (friction - 25.0) / 3.0 + 8.0
}

/// Map `value` from one range onto another
pub fn map_value_in_range(
    value: f64,
    from_low: f64,
    from_high: f64,
    to_low: f64,
    to_high: f64,
) -> f64 {
    let from_range_size = from_high - from_low;
    let to_range_size = to_high - to_low;
    let value_scale = (value - from_low) / from_range_size;
    to_low + (value_scale * to_range_size)
}

/// Converts bounciness and speed into Origami tension and friction
///
/// The resulting `bouncy_tension` / `bouncy_friction` are Origami values,
/// not raw spring parameters. See
/// [`SpringConfig::from_bounciness_and_speed`](crate::SpringConfig::from_bounciness_and_speed).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BouncyConversion {
    pub bounciness: f64,
    pub speed: f64,
    pub bouncy_tension: f64,
    pub bouncy_friction: f64,
}

impl BouncyConversion {
    pub fn new(bounciness: f64, speed: f64) -> Self {
        let b = project_normal(normalize(bounciness / 1.7, 0.0, 20.0), 0.0, 0.8);
        let s = normalize(speed / 1.7, 0.0, 2.0);
        let bouncy_tension = project_normal(s, 0.5, 200.0);
        let bouncy_friction =
            quadratic_out_interpolation(b, b3_nobounce(bouncy_tension), 0.01);

        Self {
            bounciness,
            speed,
            bouncy_tension,
            bouncy_friction,
        }
    }
}

fn normalize(value: f64, start: f64, end: f64) -> f64 {
    (value - start) / (end - start)
}

fn project_normal(n: f64, start: f64, end: f64) -> f64 {
    start + (n * (end - start))
}

fn linear_interpolation(t: f64, start: f64, end: f64) -> f64 {
    t * end + (1.0 - t) * start
}

fn quadratic_out_interpolation(t: f64, start: f64, end: f64) -> f64 {
    linear_interpolation(2.0 * t - t * t, start, end)
}

fn b3_friction1(x: f64) -> f64 {
    (0.0007 * x.powf(3.0)) - (0.031 * x.powf(2.0)) + 0.64 * x + 1.28
}

fn b3_friction2(x: f64) -> f64 {
    (0.000044 * x.powf(3.0)) - (0.006 * x.powf(2.0)) + 0.36 * x + 2.0
}

fn b3_friction3(x: f64) -> f64 {
    (0.00000045 * x.powf(3.0)) - (0.000332 * x.powf(2.0)) + 0.1078 * x + 5.84
}

/// Friction that just avoids oscillation at the given Origami tension
fn b3_nobounce(tension: f64) -> f64 {
    if tension <= 18.0 {
        b3_friction1(tension)
    } else if tension <= 44.0 {
        b3_friction2(tension)
    } else {
        b3_friction3(tension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_origami_round_trip() {
        assert!(approx(tension_from_origami(40.0), 230.2));
        assert!(approx(friction_from_origami(7.0), 22.0));
        assert!(approx(origami_from_tension(230.2), 40.0));
        assert!(approx(origami_from_friction(22.0), 7.0));
    }

    #[test]
    fn test_nobounce_segments() {
        assert!(approx(b3_nobounce(10.0), 0.7 - 3.1 + 6.4 + 1.28));
        assert!(approx(b3_nobounce(18.0), b3_friction1(18.0)));
        assert!(approx(b3_nobounce(30.0), 1.188 - 5.4 + 10.8 + 2.0));
        assert!(approx(b3_nobounce(44.0), b3_friction2(44.0)));
        assert!(approx(b3_nobounce(100.0), 0.45 - 3.32 + 10.78 + 5.84));
    }

    #[test]
    fn test_bouncy_conversion_zero_bounce() {
        // Zero bounciness sits exactly on the no-bounce friction curve
        let conversion = BouncyConversion::new(0.0, 1.7);
        assert!(approx(conversion.bouncy_tension, 0.5 + 0.5 * 199.5));
        assert!(approx(
            conversion.bouncy_friction,
            b3_nobounce(conversion.bouncy_tension)
        ));
    }

    #[test]
    fn test_bouncy_conversion_blends_toward_floor() {
        let calm = BouncyConversion::new(0.0, 12.0);
        let bouncy = BouncyConversion::new(10.0, 12.0);
        assert_eq!(calm.bouncy_tension, bouncy.bouncy_tension);
        assert!(bouncy.bouncy_friction < calm.bouncy_friction);
        assert!(bouncy.bouncy_friction > 0.01);
    }

    #[test]
    fn test_map_value_in_range() {
        assert!(approx(map_value_in_range(5.0, 0.0, 10.0, 0.0, 100.0), 50.0));
        assert!(approx(map_value_in_range(0.25, 0.0, 1.0, 1.0, -1.0), 0.5));
    }
}
