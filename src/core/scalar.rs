//! Skalar-Abstraktion der Gleisgeometrie.
//!
//! Klothoiden und Ketten sind generisch über den Gleitkomma-Typ. Standard ist
//! `f32` (wie die restliche Engine), Tests können `f64` einsetzen.
//! Jeder Skalar bringt seinen passenden glam-Vektortyp mit (`Vec2` / `DVec2`).

use glam::{DVec2, Vec2};
use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Gleitkomma-Skalar mit zugeordnetem 2D-Vektortyp.
pub trait Real:
    Copy
    + Debug
    + Default
    + PartialEq
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + 'static
{
    /// Passender glam-Vektor (`Vec2` für `f32`, `DVec2` für `f64`)
    type Vec2: Copy
        + Debug
        + Default
        + PartialEq
        + Add<Output = Self::Vec2>
        + Sub<Output = Self::Vec2>
        + Neg<Output = Self::Vec2>
        + Mul<Self, Output = Self::Vec2>
        + Div<Self, Output = Self::Vec2>
        + AddAssign
        + SubAssign;

    const ZERO: Self;
    const ONE: Self;
    const TWO: Self;
    const PI: Self;
    const TAU: Self;

    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;

    fn sqrt(self) -> Self;
    fn abs(self) -> Self;
    fn sin_cos(self) -> (Self, Self);
    fn atan2(self, x: Self) -> Self;
    fn is_finite(self) -> bool;

    fn vec2(x: Self, y: Self) -> Self::Vec2;
    fn vec2_x(v: Self::Vec2) -> Self;
    fn vec2_y(v: Self::Vec2) -> Self;

    /// Konvertiert in den `f32`-Vektor der Engine.
    fn to_engine(v: Self::Vec2) -> Vec2;
    /// Konvertiert aus dem `f32`-Vektor der Engine.
    fn from_engine(v: Vec2) -> Self::Vec2;
}

macro_rules! impl_real {
    ($scalar:ty, $vec:ty, $pi:expr, $tau:expr, $to_engine:expr, $from_engine:expr) => {
        impl Real for $scalar {
            type Vec2 = $vec;

            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;
            const TWO: Self = 2.0;
            const PI: Self = $pi;
            const TAU: Self = $tau;

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $scalar
            }
            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }
            #[inline]
            fn sqrt(self) -> Self {
                <$scalar>::sqrt(self)
            }
            #[inline]
            fn abs(self) -> Self {
                <$scalar>::abs(self)
            }
            #[inline]
            fn sin_cos(self) -> (Self, Self) {
                <$scalar>::sin_cos(self)
            }
            #[inline]
            fn atan2(self, x: Self) -> Self {
                <$scalar>::atan2(self, x)
            }
            #[inline]
            fn is_finite(self) -> bool {
                <$scalar>::is_finite(self)
            }
            #[inline]
            fn vec2(x: Self, y: Self) -> Self::Vec2 {
                <$vec>::new(x, y)
            }
            #[inline]
            fn vec2_x(v: Self::Vec2) -> Self {
                v.x
            }
            #[inline]
            fn vec2_y(v: Self::Vec2) -> Self {
                v.y
            }
            #[inline]
            fn to_engine(v: Self::Vec2) -> Vec2 {
                $to_engine(v)
            }
            #[inline]
            fn from_engine(v: Vec2) -> Self::Vec2 {
                $from_engine(v)
            }
        }
    };
}

impl_real!(
    f32,
    Vec2,
    std::f32::consts::PI,
    std::f32::consts::TAU,
    |v: Vec2| v,
    |v: Vec2| v
);
impl_real!(
    f64,
    DVec2,
    std::f64::consts::PI,
    std::f64::consts::TAU,
    |v: DVec2| v.as_vec2(),
    |v: Vec2| v.as_dvec2()
);

/// Skalarprodukt zweier Vektoren.
#[inline]
pub fn dot<T: Real>(a: T::Vec2, b: T::Vec2) -> T {
    T::vec2_x(a) * T::vec2_x(b) + T::vec2_y(a) * T::vec2_y(b)
}

/// Quadrierte Länge eines Vektors.
#[inline]
pub fn length_squared<T: Real>(v: T::Vec2) -> T {
    dot::<T>(v, v)
}

/// Einheitsvektor in Richtung `angle` (Radiant, CCW ab +x).
#[inline]
pub fn unit<T: Real>(angle: T) -> T::Vec2 {
    let (sin, cos) = angle.sin_cos();
    T::vec2(cos, sin)
}

/// Linke Normale zur Richtung `angle`.
#[inline]
pub fn left_normal<T: Real>(angle: T) -> T::Vec2 {
    let (sin, cos) = angle.sin_cos();
    T::vec2(-sin, cos)
}

/// Rotiert `v` um `angle` (CCW).
#[inline]
pub fn rotate<T: Real>(v: T::Vec2, angle: T) -> T::Vec2 {
    let (sin, cos) = angle.sin_cos();
    let x = T::vec2_x(v);
    let y = T::vec2_y(v);
    T::vec2(cos * x - sin * y, sin * x + cos * y)
}

/// Richtungswinkel eines Vektors.
#[inline]
pub fn angle_of<T: Real>(v: T::Vec2) -> T {
    T::vec2_y(v).atan2(T::vec2_x(v))
}

/// Faltet einen Winkel in `[0, 2π)`.
pub fn wrap_positive<T: Real>(mut angle: T) -> T {
    if !angle.is_finite() {
        return angle;
    }
    while angle < T::ZERO {
        angle += T::TAU;
    }
    while angle >= T::TAU {
        angle -= T::TAU;
    }
    angle
}

/// Faltet einen Winkel in `[-π, π]`.
pub fn wrap_signed<T: Real>(mut angle: T) -> T {
    if !angle.is_finite() {
        return angle;
    }
    while angle < -T::PI {
        angle += T::TAU;
    }
    while angle > T::PI {
        angle -= T::TAU;
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn wrap_positive_folds_into_full_turn() {
        assert_abs_diff_eq!(wrap_positive(-0.5f64), std::f64::consts::TAU - 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_positive(7.0f64), 7.0 - std::f64::consts::TAU, epsilon = 1e-12);
        assert_eq!(wrap_positive(0.0f64), 0.0);
    }

    #[test]
    fn wrap_signed_folds_into_half_turns() {
        let wrapped = wrap_signed(3.5f64);
        assert_abs_diff_eq!(wrapped, 3.5 - std::f64::consts::TAU, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_signed(-4.0f64), -4.0 + std::f64::consts::TAU, epsilon = 1e-12);
    }

    #[test]
    fn rotate_quarter_turn() {
        let v = rotate::<f64>(DVec2::new(1.0, 0.0), std::f64::consts::FRAC_PI_2);
        assert_abs_diff_eq!(v.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn left_normal_is_perpendicular() {
        let angle = 0.7f32;
        assert_abs_diff_eq!(dot::<f32>(unit(angle), left_normal(angle)), 0.0, epsilon = 1e-6);
    }
}
