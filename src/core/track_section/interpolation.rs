//! Löser für die Klothoiden-Trasse zwischen zwei Endposen.
//!
//! Die Trasse folgt immer derselben Schablone aus bis zu sieben Elementen:
//!
//! ```text
//! T1 (Übergang) → C1 (Bogen) → T2 (Übergang → 0) → S (Gerade)
//!   → T3 (Übergang 0 →) → C2 (Bogen) → T4 (Übergang → Ende)
//! ```
//!
//! Für jede der vier Vorzeichenkombinationen (linker/rechter Bogen an beiden
//! Enden) wird die Geradenlänge aus dem Abstand der Bogenmittelpunkte bestimmt.
//! Dreht ein Bogen mehr als eine volle Umdrehung, wird er durch ein direktes
//! Klothoidenpaar ersetzt (Newton-Iteration). Gewinnt die kürzeste Lösung.
//!
//! Die Endpose wird bereits umgedreht übergeben (Blick vom Ende in den Abschnitt).

use serde::{Deserialize, Serialize};

use crate::core::clothoid::Clothoid;
use crate::core::clothoid_chain::ClothoidChain;
use crate::core::scalar::{angle_of, dot, left_normal, length_squared, unit, wrap_positive, wrap_signed, Real};

// ── Standardwerte ──────────────────────────────────────────────────

/// Krümmungsrate der Übergangsbögen (rad/m²).
pub const DEFAULT_TRANSITION_CURVATURE_RATE: f32 = 1.0 / 30.0 / 10.0;
/// Krümmung der festen Bögen C1/C2 (rad/m).
pub const DEFAULT_ARC_CURVATURE: f32 = 1.0 / 30.0;
/// Obergrenze für die Krümmungsrate eines Entschleifungs-Paares.
pub const DEFAULT_MAX_UNLOOP_CURVATURE_RATE: f32 = 1.0 / 15.0;
/// Iterationsgrenze der Newton-Suche.
pub const DEFAULT_NEWTON_MAX_ITERATIONS: u32 = 32;
/// Konvergenzschwelle der Newton-Suche (Abstand zur Ziellinie).
pub const DEFAULT_NEWTON_TOLERANCE: f32 = 0.00001;
/// Toleranz für die Erkennung einer reinen Geraden (Seitenversatz und Winkel).
pub const DEFAULT_ALIGNMENT_TOLERANCE: f32 = 0.0001;

/// Parameter des Trassen-Lösers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Krümmungsrate der Übergangsbögen
    pub transition_curvature_rate: f32,
    /// Krümmung der festen Bögen
    pub arc_curvature: f32,
    /// Maximale Krümmungsrate, die eine Entschleifung verwenden darf
    pub max_unloop_curvature_rate: f32,
    /// Schleifen am Startbogen auflösen
    pub unloop_start: bool,
    /// Schleifen am Endbogen auflösen
    pub unloop_end: bool,
    pub newton_max_iterations: u32,
    pub newton_tolerance: f32,
    /// Toleranz für den Geraden-Kandidaten
    pub alignment_tolerance: f32,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            transition_curvature_rate: DEFAULT_TRANSITION_CURVATURE_RATE,
            arc_curvature: DEFAULT_ARC_CURVATURE,
            max_unloop_curvature_rate: DEFAULT_MAX_UNLOOP_CURVATURE_RATE,
            unloop_start: true,
            unloop_end: true,
            newton_max_iterations: DEFAULT_NEWTON_MAX_ITERATIONS,
            newton_tolerance: DEFAULT_NEWTON_TOLERANCE,
            alignment_tolerance: DEFAULT_ALIGNMENT_TOLERANCE,
        }
    }
}

impl SolverOptions {
    /// Ersetzt nicht positive oder nicht endliche Werte durch die Standardwerte.
    ///
    /// Eine Rate oder Bogenkrümmung von 0 würde jede gekrümmte Trasse
    /// unlösbar machen.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        let fields = [
            ("transition_curvature_rate", &mut self.transition_curvature_rate, defaults.transition_curvature_rate),
            ("arc_curvature", &mut self.arc_curvature, defaults.arc_curvature),
            (
                "max_unloop_curvature_rate",
                &mut self.max_unloop_curvature_rate,
                defaults.max_unloop_curvature_rate,
            ),
            ("newton_tolerance", &mut self.newton_tolerance, defaults.newton_tolerance),
            ("alignment_tolerance", &mut self.alignment_tolerance, defaults.alignment_tolerance),
        ];
        for (name, value, default) in fields {
            if !(value.is_finite() && *value > 0.0) {
                log::warn!("Solver-Option {name} = {value} ungültig, verwende {default}");
                *value = default;
            }
        }
        if self.newton_max_iterations == 0 {
            log::warn!(
                "Solver-Option newton_max_iterations = 0 ungültig, verwende {}",
                defaults.newton_max_iterations
            );
            self.newton_max_iterations = defaults.newton_max_iterations;
        }
        self
    }
}

/// Optionen im Skalar-Typ des Lösers.
#[derive(Debug, Clone, Copy)]
struct Limits<T: Real> {
    rate: T,
    arc: T,
    max_unloop_rate: T,
    unloop_start: bool,
    unloop_end: bool,
    max_iterations: u32,
    tolerance: T,
    alignment: T,
}

impl<T: Real> Limits<T> {
    fn from_options(options: &SolverOptions) -> Self {
        Self {
            rate: T::from_f64(options.transition_curvature_rate as f64),
            arc: T::from_f64(options.arc_curvature as f64),
            max_unloop_rate: T::from_f64(options.max_unloop_curvature_rate as f64),
            unloop_start: options.unloop_start,
            unloop_end: options.unloop_end,
            max_iterations: options.newton_max_iterations,
            tolerance: T::from_f64(options.newton_tolerance as f64),
            alignment: T::from_f64(options.alignment_tolerance as f64),
        }
    }
}

// ── Datentypen ─────────────────────────────────────────────────────

/// Pose an einem Abschnittsende.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointPose<T: Real = f32> {
    pub position: T::Vec2,
    pub direction: T,
    pub curvature: T,
}

impl<T: Real> EndpointPose<T> {
    pub fn new(position: T::Vec2, direction: T, curvature: T) -> Self {
        Self {
            position,
            direction,
            curvature,
        }
    }

    /// Dieselbe Stelle in Gegenrichtung.
    pub fn reversed(&self) -> Self {
        Self {
            position: self.position,
            direction: self.direction + T::PI,
            curvature: -self.curvature,
        }
    }
}

/// Übergangsbogen: Krümmungsrate und Länge.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transition<T: Real = f32> {
    pub rate: T,
    pub length: T,
}

/// Längen und Raten aller sieben Schablonen-Elemente.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SectionParams<T: Real = f32> {
    pub t1: Transition<T>,
    pub c1: T,
    pub t2: Transition<T>,
    pub straight: T,
    pub t3: Transition<T>,
    pub c2: T,
    pub t4: Transition<T>,
}

impl<T: Real> SectionParams<T> {
    /// Nur eine Gerade der Länge `length`.
    pub fn straight_only(length: T) -> Self {
        Self {
            straight: length,
            ..Self::default()
        }
    }

    pub fn total_length(&self) -> T {
        self.t1.length + self.c1 + self.t2.length + self.straight + self.t3.length + self.c2 + self.t4.length
    }

    /// (Krümmungsrate, Länge) in Schablonen-Reihenfolge.
    pub fn primitives(&self) -> [(T, T); 7] {
        [
            (self.t1.rate, self.t1.length),
            (T::ZERO, self.c1),
            (self.t2.rate, self.t2.length),
            (T::ZERO, self.straight),
            (self.t3.rate, self.t3.length),
            (T::ZERO, self.c2),
            (self.t4.rate, self.t4.length),
        ]
    }
}

/// Welche Lösung gewonnen hat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolutionKind<T: Real = f32> {
    /// Start und Ende liegen auf einer gemeinsamen Geraden
    Straight,
    /// Schablone mit Bogenrichtungen (±1, links positiv)
    Template { direction1: T, direction2: T },
}

/// Ergebnis von [`solve_section`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionSolution<T: Real = f32> {
    pub params: SectionParams<T>,
    pub kind: SolutionKind<T>,
}

impl<T: Real> SectionSolution<T> {
    pub fn length(&self) -> T {
        self.params.total_length()
    }
}

/// Aus einer Krümmungsrate abgeleitete Längen eines gegenläufigen Klothoidenpaares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpliedLengths<T: Real = f32> {
    /// Rate des zweiten Klothoids (immer `-rate_ac`)
    pub rate_cb: T,
    pub length_ac: T,
    pub length_cb: T,
}

/// Ergebnis von [`interpolate_clothoid_pair`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClothoidPair<T: Real = f32> {
    pub rate1: T,
    pub length1: T,
    pub rate2: T,
    pub length2: T,
    /// Tatsächlicher Endpunkt des Paares
    pub end_position: T::Vec2,
    /// Fehlende Gerade bis zum Zielpunkt (negativ: Ziel wurde überfahren)
    pub extra_straight: T,
}

// ── Klothoidenpaar ─────────────────────────────────────────────────

/// Längen zweier gegenläufiger Klothoide für eine gewählte Krümmungsrate.
///
/// Löst die quadratische Gleichung zwischen Richtungsänderung und Länge.
/// `None` ohne reelle Lösung oder bei negativen Längen.
pub fn implied_from_curvature_rate<T: Real>(
    direction_delta: T,
    curvature_a: T,
    curvature_b: T,
    rate_ac: T,
) -> Option<ImpliedLengths<T>> {
    if rate_ac == T::ZERO || !rate_ac.is_finite() {
        return None;
    }
    let a = rate_ac;
    let half_b = curvature_a;
    let c = -direction_delta + (curvature_a * curvature_a - curvature_b * curvature_b) / (rate_ac * T::TWO);
    let discriminant = half_b * half_b - a * c;
    if discriminant < T::ZERO {
        return None;
    }
    let root = discriminant.sqrt();
    let mut length_ac = (-half_b - root) / a;
    let mut length_cb = length_ac + (curvature_a - curvature_b) / rate_ac;
    if length_ac < T::ZERO || length_cb < T::ZERO {
        length_ac = (-half_b + root) / a;
        length_cb = length_ac + (curvature_a - curvature_b) / rate_ac;
    }
    if length_ac < T::ZERO || length_cb < T::ZERO {
        return None;
    }
    Some(ImpliedLengths {
        rate_cb: -rate_ac,
        length_ac,
        length_cb,
    })
}

/// Sucht ein gegenläufiges Klothoidenpaar ab dem Ursprung, das auf der Geraden
/// durch `position_b` mit Richtung `direction_b` endet.
///
/// Newton-Raphson über die Krümmungsrate mit Differenzenquotient. Nur
/// `curvature_b == 0` wird unterstützt, alles andere liefert `None`.
pub fn interpolate_clothoid_pair<T: Real>(
    direction_a: T,
    curvature_a: T,
    position_b: T::Vec2,
    direction_b: T,
    curvature_b: T,
    options: &SolverOptions,
) -> Option<ClothoidPair<T>> {
    pair_with_limits(
        direction_a,
        curvature_a,
        position_b,
        direction_b,
        curvature_b,
        &Limits::from_options(options),
    )
}

fn pair_with_limits<T: Real>(
    direction_a: T,
    curvature_a: T,
    position_b: T::Vec2,
    direction_b: T,
    curvature_b: T,
    limits: &Limits<T>,
) -> Option<ClothoidPair<T>> {
    // Endkrümmung ungleich 0 ist nicht umgesetzt
    if curvature_b != T::ZERO {
        return None;
    }

    let direction_delta = wrap_signed(direction_b - direction_a);

    let mut rate = direction_delta / length_squared::<T>(position_b) * T::from_f64(4.0);
    let step_limit = limits.rate / T::from_f64(100.0);
    if rate < -limits.rate {
        rate = -step_limit;
    } else if rate > limits.rate {
        rate = step_limit;
    }

    let tangent = unit(direction_b);
    let perpendicular = left_normal(direction_b);
    let origin = T::vec2(T::ZERO, T::ZERO);

    let evaluate = |rate_ac: T| -> Option<(ImpliedLengths<T>, T::Vec2, T)> {
        let implied = implied_from_curvature_rate(direction_delta, curvature_a, curvature_b, rate_ac)?;
        let first = Clothoid::new(origin, direction_a, curvature_a, rate_ac, implied.length_ac);
        let mut second = first.next_clothoid();
        second.set_curvature_rate(implied.rate_cb);
        second.set_length(implied.length_cb);
        let end = second.end_position();
        Some((implied, end, dot::<T>(end - position_b, perpendicular)))
    };

    for _ in 0..limits.max_iterations {
        if rate == T::ZERO || !rate.is_finite() {
            return None;
        }
        let delta = rate / T::from_f64(100.0);
        let (implied, end, distance) = evaluate(rate)?;
        let (_, _, distance_delta) = evaluate(rate + delta)?;

        if distance.abs() < limits.tolerance {
            return Some(ClothoidPair {
                rate1: rate,
                length1: implied.length_ac,
                rate2: implied.rate_cb,
                length2: implied.length_cb,
                end_position: end,
                extra_straight: dot::<T>(position_b - end, tangent),
            });
        }

        rate -= delta * distance / (distance_delta - distance);
    }
    None
}

// ── Schablonen-Löser ───────────────────────────────────────────────

/// Vorberechnete Übergänge einer Bogenrichtung.
#[derive(Debug, Clone, Copy)]
struct Lobe<T: Real> {
    t1: Transition<T>,
    t2: Transition<T>,
    t3: Transition<T>,
    t4: Transition<T>,
    turn_t1: T,
    turn_t2: T,
    turn_t3: T,
    turn_t4: T,
    /// Beginn von C1 (relativ zum Start)
    after_t1: Clothoid<T>,
    /// Beginn der Geraden, relativ zu C1-Ende
    after_t2: Clothoid<T>,
    /// Beginn von C2 rückwärts vom Ende aus (relativ zum Ende)
    after_t4_rev: Clothoid<T>,
    /// Beginn der Geraden rückwärts, relativ zu C2-Anfang
    after_t3_rev: Clothoid<T>,
}

fn sign<T: Real>(index: usize) -> T {
    if index == 1 {
        T::ONE
    } else {
        -T::ONE
    }
}

/// Richtungsänderung bis zum Nullkrümmungspunkt, falls dieser im Bogen liegt.
fn straightening_turn<T: Real>(clothoid: &Clothoid<T>) -> T {
    match clothoid.length_at_curvature(T::ZERO) {
        Some(length) if length > T::ZERO && length < clothoid.length() => {
            clothoid.direction_change_at(length)
        }
        _ => T::ZERO,
    }
}

fn build_lobe<T: Real>(
    index: usize,
    start: &EndpointPose<T>,
    end_rev: &EndpointPose<T>,
    limits: &Limits<T>,
) -> Lobe<T> {
    let direction = sign::<T>(index);
    let rate = limits.rate;
    let arc = limits.arc;
    let origin = T::vec2(T::ZERO, T::ZERO);

    let t1 = Transition {
        rate: direction * rate,
        length: (direction * arc - start.curvature) / (direction * rate),
    };
    let t2 = Transition {
        rate: -direction * rate,
        length: arc / rate,
    };
    let t3 = Transition {
        rate: direction * rate,
        length: arc / rate,
    };
    let t4 = Transition {
        rate: -direction * rate,
        length: (-end_rev.curvature - direction * arc) / (-direction * rate),
    };

    let first = Clothoid::new(origin, start.direction, start.curvature, t1.rate, t1.length);
    let turn_t1 = first.end_direction_change() - straightening_turn(&first);
    let after_t1 = first.next_clothoid();

    let second = Clothoid::new(
        origin,
        after_t1.start_direction(),
        after_t1.start_curvature(),
        t2.rate,
        t2.length,
    );
    let turn_t2 = second.end_direction_change();
    let after_t2 = second.next_clothoid();

    let fourth_rev = Clothoid::new(origin, end_rev.direction, end_rev.curvature, t4.rate, t4.length);
    let turn_t4 = -(fourth_rev.end_direction_change() - straightening_turn(&fourth_rev));
    let after_t4_rev = fourth_rev.next_clothoid();

    let third_rev = Clothoid::new(
        origin,
        after_t4_rev.start_direction(),
        after_t4_rev.start_curvature(),
        -t4.rate,
        t3.length,
    );
    let turn_t3 = -third_rev.end_direction_change();
    let after_t3_rev = third_rev.next_clothoid();

    Lobe {
        t1,
        t2,
        t3,
        t4,
        turn_t1,
        turn_t2,
        turn_t3,
        turn_t4,
        after_t1,
        after_t2,
        after_t4_rev,
        after_t3_rev,
    }
}

/// Übergang ab Krümmung 0 mit Bogenrichtung `rate_sign`, als Folgestück.
fn zero_curvature_transition<T: Real>(direction: T, rate: T, length: T) -> Clothoid<T> {
    Clothoid::new(T::vec2(T::ZERO, T::ZERO), direction, T::ZERO, rate, length).next_clothoid()
}

/// Ersetzt Bogen + Übergang eines Endes durch ein direktes Klothoidenpaar.
fn unloop<T: Real>(
    arc_start: &Clothoid<T>,
    arc_length: T,
    transition: Transition<T>,
    pose: &EndpointPose<T>,
    straight: T,
    limits: &Limits<T>,
) -> Option<ClothoidPair<T>> {
    let mut arc = *arc_start;
    arc.set_length(arc_length);
    let mut curved = arc.next_clothoid();
    curved.set_curvature_rate(transition.rate);
    curved.set_length(transition.length);
    let straight_start = curved.next_clothoid();

    let pair = pair_with_limits(
        pose.direction,
        pose.curvature,
        straight_start.start_position(),
        straight_start.start_direction(),
        T::ZERO,
        limits,
    )?;
    unloop_acceptable(&pair, straight, limits).then_some(pair)
}

/// Ein Paar ersetzt den Bogen nur, wenn die Gerade nicht negativ wird und die
/// Krümmungsrate unter der Grenze bleibt.
fn unloop_acceptable<T: Real>(pair: &ClothoidPair<T>, straight: T, limits: &Limits<T>) -> bool {
    pair.extra_straight > -straight && pair.rate1.abs() < limits.max_unloop_rate
}

/// Gerade, wenn beide Enden ungekrümmt sind und auf einer Linie fluchten.
fn straight_candidate<T: Real>(
    start: &EndpointPose<T>,
    end_rev: &EndpointPose<T>,
    limits: &Limits<T>,
) -> Option<SectionParams<T>> {
    if start.curvature != T::ZERO || end_rev.curvature != T::ZERO {
        return None;
    }
    let heading_error = wrap_signed(end_rev.direction - T::PI - start.direction).abs();
    let offset = end_rev.position - start.position;
    let along = dot::<T>(offset, unit(start.direction));
    let lateral = dot::<T>(offset, left_normal(start.direction));
    if heading_error > limits.alignment || lateral.abs() > limits.alignment || along <= T::ZERO {
        return None;
    }
    Some(SectionParams::straight_only(along))
}

/// Löst die Trasse von `start` nach `end_rev` (Endpose in den Abschnitt blickend).
///
/// `None`, wenn keine Vorzeichenkombination eine gültige Trasse liefert.
pub fn solve_section<T: Real>(
    start: &EndpointPose<T>,
    end_rev: &EndpointPose<T>,
    options: &SolverOptions,
) -> Option<SectionSolution<T>> {
    let limits = Limits::<T>::from_options(options);
    let offset = end_rev.position - start.position;
    let two_pi = T::TAU;

    let lobes = [
        build_lobe(0, start, end_rev, &limits),
        build_lobe(1, start, end_rev, &limits),
    ];
    let arc_transition_length = limits.arc / limits.rate;

    // Übergänge ab der Geraden, indiziert [Bogenseite][Vorzeichen]
    let mut after_t3 = [[Clothoid::<T>::default(); 2]; 2];
    let mut after_t2_rev = [[Clothoid::<T>::default(); 2]; 2];
    for (a, lobe) in lobes.iter().enumerate() {
        for b in 0..2 {
            let direction = sign::<T>(b);
            after_t3[a][b] = zero_curvature_transition(
                lobe.after_t2.start_direction(),
                direction * limits.rate,
                arc_transition_length,
            );
            after_t2_rev[a][b] = zero_curvature_transition(
                lobe.after_t3_rev.start_direction(),
                -direction * limits.rate,
                arc_transition_length,
            );
        }
    }

    let mut best = straight_candidate(start, end_rev, &limits).map(|params| SectionSolution {
        params,
        kind: SolutionKind::Straight,
    });

    for d1 in 0..2 {
        let dir1 = sign::<T>(d1);
        let lobe1 = &lobes[d1];
        for d2 in 0..2 {
            let dir2 = sign::<T>(d2);
            let lobe2 = &lobes[d2];

            let mut params = SectionParams {
                t1: lobe1.t1,
                t2: lobe1.t2,
                t3: lobe2.t3,
                t4: lobe2.t4,
                ..SectionParams::default()
            };
            // Knotenkrümmung jenseits der Bogenkrümmung in dieser Richtung
            if params.t1.length < T::ZERO || params.t4.length < T::ZERO {
                continue;
            }

            let (Some(center1), Some(center2), Some(line_circle)) = (
                lobe1.after_t1.circle_at_start(),
                lobe2.after_t4_rev.circle_at_start(),
                after_t3[d1][d2].circle_at_start(),
            ) else {
                continue;
            };
            let Some(back_circle) = after_t2_rev[d2][d1].circle_at_start() else {
                continue;
            };

            // Vektor zwischen den Bogenmittelpunkten
            let this_offset = offset - center1 + center2;
            // Mittelpunktsvektor bei Geradenlänge 0
            let line_start = (lobe1.after_t2.start_position()
                - (center1 - lobe1.after_t1.start_position()))
                + line_circle;
            let line_norm2 = unit(lobe1.after_t2.start_direction());
            let line_norm3 = unit(lobe2.after_t3_rev.start_direction());

            // |line_start + s·n|² = |this_offset|²
            let b = dot::<T>(line_start, line_norm2);
            let c = length_squared::<T>(line_start) - length_squared::<T>(this_offset);
            let discriminant = b * b - c;
            if discriminant < T::ZERO {
                continue;
            }
            params.straight = -b + discriminant.sqrt();
            if params.straight < T::ZERO {
                continue;
            }

            let transition3_rev = lobe2.after_t4_rev.start_position()
                + lobe2.after_t3_rev.start_position()
                - center2;
            let midpoint2 = line_start + line_norm2 * params.straight;
            let midpoint3 = -(transition3_rev + back_circle + line_norm3 * params.straight);
            let angle1 = angle_of::<T>(midpoint2);
            let angle2 = angle_of::<T>(this_offset);
            let angle3 = angle_of::<T>(midpoint3);

            let curve1 = wrap_positive(dir1 * (angle2 - angle1));
            let curve2 = wrap_positive(dir2 * (angle3 - angle2));
            params.c1 = curve1 / limits.arc;
            params.c2 = curve2 / limits.arc;

            let change1 = (lobe1.turn_t1 + dir1 * curve1 + lobe1.turn_t2).abs();
            let change2 = (lobe2.turn_t3 + dir2 * curve2 + lobe2.turn_t4).abs();

            if limits.unloop_start && change1 > two_pi {
                match unloop(&lobe1.after_t1, params.c1, params.t2, start, params.straight, &limits) {
                    Some(pair) => {
                        log::debug!(
                            "Entschleifung Start ({}, {}): Rate {:?}, Gerade {:?}",
                            d1,
                            d2,
                            pair.rate1,
                            pair.extra_straight
                        );
                        params.t1 = Transition {
                            rate: pair.rate1,
                            length: pair.length1,
                        };
                        params.c1 = T::ZERO;
                        params.t2 = Transition {
                            rate: pair.rate2,
                            length: pair.length2,
                        };
                        params.straight += pair.extra_straight;
                    }
                    None => log::debug!("Entschleifung Start ({}, {}) verworfen", d1, d2),
                }
            }
            if limits.unloop_end && change2 > two_pi {
                match unloop(&lobe2.after_t4_rev, params.c2, params.t3, end_rev, params.straight, &limits) {
                    Some(pair) => {
                        log::debug!(
                            "Entschleifung Ende ({}, {}): Rate {:?}, Gerade {:?}",
                            d1,
                            d2,
                            pair.rate1,
                            pair.extra_straight
                        );
                        params.t4 = Transition {
                            rate: pair.rate1,
                            length: pair.length1,
                        };
                        params.c2 = T::ZERO;
                        params.t3 = Transition {
                            rate: pair.rate2,
                            length: pair.length2,
                        };
                        params.straight += pair.extra_straight;
                    }
                    None => log::debug!("Entschleifung Ende ({}, {}) verworfen", d1, d2),
                }
            }

            let length = params.total_length();
            if !length.is_finite() {
                continue;
            }
            if best.map_or(true, |current| length < current.length()) {
                best = Some(SectionSolution {
                    params,
                    kind: SolutionKind::Template {
                        direction1: dir1,
                        direction2: dir2,
                    },
                });
            }
        }
    }
    best
}

/// Baut die Kette aus den Schablonen-Parametern ab `start` neu auf.
///
/// Elemente mit Länge `<= 0` entfallen. Am Ende steht ein Segment der Länge 0
/// auf der Endpose, damit Abfragen hinter dem Ende die Endpose liefern.
pub fn build_chain<T: Real>(start: &EndpointPose<T>, params: &SectionParams<T>, chain: &mut ClothoidChain<T>) {
    chain.clear();
    for (rate, length) in params.primitives() {
        if length <= T::ZERO {
            continue;
        }
        let anchor = chain.is_empty();
        let segment = chain.append();
        if anchor {
            segment.set_start_position(start.position);
            segment.set_start_direction(start.direction);
            segment.set_start_curvature(start.curvature);
        }
        segment.set_curvature_rate(rate);
        segment.set_length(length);
    }
    if chain.is_empty() {
        let anchor = chain.append();
        anchor.set_start_position(start.position);
        anchor.set_start_direction(start.direction);
        anchor.set_start_curvature(start.curvature);
    }
    // Endmarke
    chain.append();
}
