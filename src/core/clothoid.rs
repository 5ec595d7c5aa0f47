//! Klothoide (Euler-Spirale): Krümmung linear über der Bogenlänge.

use super::fresnel::{fresnel, fresnel_direction};
use super::scalar::{left_normal, rotate, Real};

/// Ein einzelnes Kurvenstück mit linear veränderlicher Krümmung.
///
/// Richtung in Radiant CCW ab +x, Krümmung vorzeichenbehaftet (links positiv),
/// Krümmungsrate als Änderung der Krümmung pro Längeneinheit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Clothoid<T: Real = f32> {
    start_position: T::Vec2,
    start_direction: T,
    start_curvature: T,
    curvature_rate: T,
    /// `sign(rate) · sqrt(|rate|)`, wird von `set_curvature_rate` gepflegt
    curvature_rate_sqrt: T,
    length: T,
}

impl<T: Real> Clothoid<T> {
    /// Erstellt eine Klothoide mit vollständigem Parametersatz.
    pub fn new(
        start_position: T::Vec2,
        start_direction: T,
        start_curvature: T,
        curvature_rate: T,
        length: T,
    ) -> Self {
        let mut clothoid = Self {
            start_position,
            start_direction,
            start_curvature,
            curvature_rate: T::ZERO,
            curvature_rate_sqrt: T::ZERO,
            length,
        };
        clothoid.set_curvature_rate(curvature_rate);
        clothoid
    }

    /// Kurvenstück ohne Länge und Krümmungsänderung an der gegebenen Pose.
    pub fn at_pose(start_position: T::Vec2, start_direction: T, start_curvature: T) -> Self {
        Self::new(start_position, start_direction, start_curvature, T::ZERO, T::ZERO)
    }

    // ── Setter ──────────────────────────────────────────────────────

    pub fn set_start_position(&mut self, position: T::Vec2) {
        self.start_position = position;
    }

    pub fn set_start_direction(&mut self, direction: T) {
        self.start_direction = direction;
    }

    pub fn set_start_curvature(&mut self, curvature: T) {
        self.start_curvature = curvature;
    }

    /// Setzt die Krümmungsrate und aktualisiert die vorzeichenbehaftete Wurzel.
    pub fn set_curvature_rate(&mut self, rate: T) {
        self.curvature_rate = rate;
        self.curvature_rate_sqrt = if rate >= T::ZERO {
            rate.sqrt()
        } else {
            -(-rate).sqrt()
        };
    }

    pub fn set_length(&mut self, length: T) {
        self.length = length;
    }

    // ── Getter ──────────────────────────────────────────────────────

    pub fn start_position(&self) -> T::Vec2 {
        self.start_position
    }

    pub fn start_direction(&self) -> T {
        self.start_direction
    }

    pub fn start_curvature(&self) -> T {
        self.start_curvature
    }

    pub fn curvature_rate(&self) -> T {
        self.curvature_rate
    }

    pub fn curvature_rate_sqrt(&self) -> T {
        self.curvature_rate_sqrt
    }

    pub fn length(&self) -> T {
        self.length
    }

    // ── Auswertung ──────────────────────────────────────────────────

    /// Krümmung nach `length`.
    pub fn curvature_at(&self, length: T) -> T {
        self.start_curvature + self.curvature_rate * length
    }

    /// Richtungsänderung gegenüber dem Start nach `length`.
    pub fn direction_change_at(&self, length: T) -> T {
        length * (self.start_curvature + self.curvature_rate * length / T::TWO)
    }

    /// Richtung nach `length`.
    pub fn direction_at(&self, length: T) -> T {
        self.start_direction + self.direction_change_at(length)
    }

    /// Bogenlänge bis zur Krümmung `curvature`, `None` bei Krümmungsrate 0.
    pub fn length_at_curvature(&self, curvature: T) -> Option<T> {
        if self.curvature_rate == T::ZERO {
            return None;
        }
        Some((curvature - self.start_curvature) / self.curvature_rate)
    }

    /// 2D-Position nach `length`.
    pub fn position_at(&self, length: T) -> T::Vec2 {
        let (fres, fres_rotation) = if self.curvature_rate != T::ZERO {
            // sqrt(|rate| / 2), vorzeichenbehaftet
            let scale = self.curvature_rate_sqrt / T::TWO.sqrt();
            // Abstand vom Nullkrümmungspunkt der Spirale bis zum Start
            let offset = self.start_curvature / self.curvature_rate;
            let fres_offset = fresnel(offset * scale);
            let mut fres = (fresnel((length + offset) * scale) - fres_offset) / scale;
            let mut rotation = fresnel_direction(offset * scale);
            if self.curvature_rate < T::ZERO {
                fres = T::vec2(T::vec2_x(fres), -T::vec2_y(fres));
                rotation = -rotation;
            }
            (fres, rotation)
        } else if self.start_curvature != T::ZERO {
            let radius = T::ONE / self.start_curvature;
            let abs_radius = radius.abs();
            let (sin, cos) = (length / abs_radius).sin_cos();
            (T::vec2(sin * abs_radius, radius - cos * radius), T::ZERO)
        } else {
            (T::vec2(length, T::ZERO), T::ZERO)
        };

        self.start_position + rotate::<T>(fres, self.start_direction - fres_rotation)
    }

    pub fn end_position(&self) -> T::Vec2 {
        self.position_at(self.length)
    }

    pub fn end_direction(&self) -> T {
        self.direction_at(self.length)
    }

    pub fn end_curvature(&self) -> T {
        self.curvature_at(self.length)
    }

    pub fn end_direction_change(&self) -> T {
        self.direction_change_at(self.length)
    }

    /// Folgestück: startet exakt an der Endpose, ohne Länge und Krümmungsrate.
    pub fn next_clothoid(&self) -> Self {
        Self::at_pose(self.end_position(), self.end_direction(), self.end_curvature())
    }

    /// Mittelpunkt des Krümmungskreises am Start, `None` bei Krümmung 0.
    pub fn circle_at_start(&self) -> Option<T::Vec2> {
        if self.start_curvature == T::ZERO {
            return None;
        }
        Some(self.start_position + left_normal(self.start_direction) / self.start_curvature)
    }

    // ── Parallelkurven ──────────────────────────────────────────────

    /// Krümmung einer um `offset` nach links versetzten Parallelkurve.
    pub fn parallel_curvature_at(&self, length: T, offset: T) -> T {
        parallel_curvature(self.curvature_at(length), offset)
    }

    /// Näherung der Länge einer Parallelkurve über die mittlere Krümmung.
    pub fn parallel_length(&self, offset: T) -> T {
        let average = (self.start_curvature + self.end_curvature()) / T::TWO;
        self.length * (T::ONE - offset * average)
    }

    /// Position auf der Parallelkurve zur Mittellinienlänge `length`.
    pub fn parallel_position_at(&self, length: T, offset: T) -> T::Vec2 {
        self.position_at(length) + left_normal(self.direction_at(length)) * offset
    }

    /// Mittellinienlänge zu einer Länge entlang der Parallelkurve (linear skaliert).
    pub fn length_at_parallel_length(&self, parallel_length: T, offset: T) -> T {
        let total = self.parallel_length(offset);
        if total == T::ZERO {
            return T::ZERO;
        }
        parallel_length * self.length / total
    }
}

/// Krümmung `1 / (1/k − offset)` einer Parallelkurve, 0 bleibt 0.
pub fn parallel_curvature<T: Real>(curvature: T, offset: T) -> T {
    if curvature == T::ZERO {
        return T::ZERO;
    }
    T::ONE / (T::ONE / curvature - offset)
}
