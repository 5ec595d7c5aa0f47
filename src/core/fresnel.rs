//! Fresnel-Integrale als abgebrochene Potenzreihe.
//!
//! `C(x) = ∫₀ˣ cos(t²) dt`, `S(x) = ∫₀ˣ sin(t²) dt`. Die Anzahl der Reihenglieder
//! richtet sich nach `|x|` in Stufen von 0.2 (maximal zehn Glieder inklusive
//! des nullten). Genau genug für Gleisgeometrie, nicht für beliebige Präzision.

use super::scalar::Real;

/// Höchster Reihenindex, der berücksichtigt wird.
pub const MAX_SERIES_TERM: u32 = 9;

/// Schritte pro Einheit von `|x|` für die Gliedauswahl (Bucket-Breite 0.2).
const TERM_BUCKETS_PER_UNIT: f64 = 5.0;

/// Potenz per binärer Exponentiation.
fn power<T: Real>(x: T, exponent: u32) -> T {
    let mut result = T::ONE;
    let mut base = x;
    let mut e = exponent;
    while e > 0 {
        if e & 1 == 1 {
            result = result * base;
        }
        base = base * base;
        e >>= 1;
    }
    result
}

fn factorial(n: u32) -> f64 {
    (2..=n).fold(1.0, |acc, k| acc * k as f64)
}

/// Reihenglied `n` für (C, S).
fn series_term<T: Real>(n: u32, x: T) -> (T, T) {
    let sign = if n & 1 == 1 { -1.0 } else { 1.0 };

    let c_power = 4 * n + 1;
    let c_divisor = factorial(2 * n) * c_power as f64;
    let s_power = 4 * n + 3;
    let s_divisor = factorial(2 * n + 1) * s_power as f64;

    (
        power(x, c_power) * T::from_f64(sign / c_divisor),
        power(x, s_power) * T::from_f64(sign / s_divisor),
    )
}

/// Anzahl zusätzlicher Reihenglieder für das Argument `x`.
fn top_term<T: Real>(x: T) -> u32 {
    let bucket = (x.abs().to_f64() * TERM_BUCKETS_PER_UNIT).floor();
    if !bucket.is_finite() || bucket >= MAX_SERIES_TERM as f64 {
        MAX_SERIES_TERM
    } else {
        bucket.max(0.0) as u32
    }
}

/// Berechnet `(C(x), S(x))`.
pub fn fresnel<T: Real>(x: T) -> T::Vec2 {
    let mut c = T::ZERO;
    let mut s = T::ZERO;
    for n in 0..=top_term(x) {
        let (dc, ds) = series_term(n, x);
        c += dc;
        s += ds;
    }
    T::vec2(c, s)
}

/// Tangentendrehung, die zur Fresnel-Auswertung an `x` gehört.
#[inline]
pub fn fresnel_direction<T: Real>(x: T) -> T {
    x * x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn fresnel_at_zero_is_origin() {
        let v = fresnel(0.0f64);
        assert_eq!(v.x, 0.0);
        assert_eq!(v.y, 0.0);
    }

    #[test]
    fn fresnel_is_odd() {
        let pos = fresnel(0.8f64);
        let neg = fresnel(-0.8f64);
        assert_abs_diff_eq!(pos.x, -neg.x, epsilon = 1e-12);
        assert_abs_diff_eq!(pos.y, -neg.y, epsilon = 1e-12);
    }

    #[test]
    fn fresnel_matches_reference_values() {
        // Referenz aus numerischer Integration von cos(t²) / sin(t²)
        let v = fresnel(1.0f64);
        assert_abs_diff_eq!(v.x, 0.904_524_237_900_272, epsilon = 1e-6);
        assert_abs_diff_eq!(v.y, 0.310_268_301_723_381, epsilon = 1e-6);

        let v = fresnel(0.5f64);
        assert_abs_diff_eq!(v.x, 0.496_884_029_2, epsilon = 1e-6);
        assert_abs_diff_eq!(v.y, 0.041_481_024_3, epsilon = 1e-6);
    }

    #[test]
    fn small_arguments_use_fewer_terms() {
        assert_eq!(top_term(0.1f32), 0);
        assert_eq!(top_term(0.45f32), 2);
        assert_eq!(top_term(-1.1f32), 5);
        assert_eq!(top_term(40.0f32), MAX_SERIES_TERM);
    }

    #[test]
    fn binary_power_matches_powi() {
        for e in 0..20 {
            assert_abs_diff_eq!(power(1.3f64, e), 1.3f64.powi(e as i32), epsilon = 1e-9);
        }
    }

    #[test]
    fn direction_is_square() {
        assert_eq!(fresnel_direction(3.0f32), 9.0);
        assert_eq!(fresnel_direction(-0.5f64), 0.25);
    }
}
