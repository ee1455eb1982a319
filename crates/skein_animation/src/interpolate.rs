//! Interpolation helpers for animated values

/// Trait for values that can be linearly interpolated
pub trait Interpolate: Clone {
    /// Linearly interpolate between self and other by factor t (0.0 to 1.0)
    fn lerp(&self, other: &Self, t: f32) -> Self;

    /// Check if two values are approximately equal
    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool;
}

impl Interpolate for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        (self - other).abs() < epsilon
    }
}

impl Interpolate for f64 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * f64::from(t)
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        (self - other).abs() < f64::from(epsilon)
    }
}

/// Points, control handles
impl Interpolate for (f32, f32) {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        (self.0.lerp(&other.0, t), self.1.lerp(&other.1, t))
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.0.approx_eq(&other.0, epsilon) && self.1.approx_eq(&other.1, epsilon)
    }
}

/// RGBA colors
impl Interpolate for [f32; 4] {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        std::array::from_fn(|i| self[i].lerp(&other[i], t))
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.iter()
            .zip(other.iter())
            .all(|(a, b)| a.approx_eq(b, epsilon))
    }
}

/// Map `t` in 0..=1 onto `from..=to`
pub fn mix<T: Interpolate>(t: f32, from: T, to: T) -> T {
    from.lerp(&to, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_scalar() {
        assert_eq!(mix(0.0, 0.0f32, 400.0), 0.0);
        assert_eq!(mix(0.25, 0.0f32, 400.0), 100.0);
        assert_eq!(mix(1.0, 0.0f32, 400.0), 400.0);
    }

    #[test]
    fn test_mix_point_and_color() {
        let p = mix(0.5, (0.0f32, 10.0f32), (10.0, 20.0));
        assert!(p.approx_eq(&(5.0, 15.0), 1e-6));

        let c = mix(0.5, [0.0f32, 0.0, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]);
        assert!(c.approx_eq(&[0.5, 0.5, 0.5, 1.0], 1e-6));
    }
}
