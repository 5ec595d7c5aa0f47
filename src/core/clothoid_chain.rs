//! Geordnete, C1-stetige Folge von Klothoiden.

use super::clothoid::Clothoid;
use super::scalar::Real;

/// Zusammenhängende Kurve aus Klothoiden-Segmenten.
///
/// Jedes angehängte Segment startet an der Endpose seines Vorgängers;
/// `append` leitet es aus dem letzten Segment ab, Rohwerte werden nie kopiert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClothoidChain<T: Real = f32> {
    segments: Vec<Clothoid<T>>,
}

impl<T: Real> ClothoidChain<T> {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Hängt ein Segment an und gibt es zum Setzen von Rate/Länge zurück.
    ///
    /// Das erste Segment startet im Ursprung mit Richtung und Krümmung 0.
    pub fn append(&mut self) -> &mut Clothoid<T> {
        let next = match self.segments.last() {
            Some(last) => last.next_clothoid(),
            None => Clothoid::default(),
        };
        self.segments.push(next);
        let index = self.segments.len() - 1;
        &mut self.segments[index]
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn clothoids(&self) -> &[Clothoid<T>] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> Option<&Clothoid<T>> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&Clothoid<T>> {
        self.segments.last()
    }

    /// Gesamtlänge als Summe der Segmentlängen.
    pub fn length(&self) -> T {
        self.segments
            .iter()
            .fold(T::ZERO, |acc, segment| acc + segment.length())
    }

    /// Gesamtlänge einer um `offset` versetzten Parallelkurve (Näherung).
    pub fn parallel_length(&self, offset: T) -> T {
        self.segments
            .iter()
            .fold(T::ZERO, |acc, segment| acc + segment.parallel_length(offset))
    }

    /// Segment und lokale Länge zur Kettenlänge `length`.
    ///
    /// `length <= 0` liefert den Start des ersten Segments, eine Länge jenseits
    /// des Endes den Start des letzten Segments.
    pub fn segment_at(&self, mut length: T) -> Option<(&Clothoid<T>, T)> {
        let first = self.segments.first()?;
        if length <= T::ZERO {
            return Some((first, T::ZERO));
        }
        for segment in &self.segments {
            if length < segment.length() {
                return Some((segment, length));
            }
            length -= segment.length();
        }
        self.segments.last().map(|last| (last, T::ZERO))
    }

    pub fn position_at(&self, length: T) -> Option<T::Vec2> {
        self.segment_at(length)
            .map(|(segment, local)| segment.position_at(local))
    }

    pub fn direction_at(&self, length: T) -> Option<T> {
        self.segment_at(length)
            .map(|(segment, local)| segment.direction_at(local))
    }

    pub fn curvature_at(&self, length: T) -> Option<T> {
        self.segment_at(length)
            .map(|(segment, local)| segment.curvature_at(local))
    }

    /// Segment und lokale Mittellinienlänge zu einer Länge auf der Parallelkurve.
    fn segment_at_parallel(&self, mut parallel_length: T, offset: T) -> Option<(&Clothoid<T>, T)> {
        let first = self.segments.first()?;
        if parallel_length <= T::ZERO {
            return Some((first, T::ZERO));
        }
        for segment in &self.segments {
            let segment_length = segment.parallel_length(offset);
            if parallel_length < segment_length {
                return Some((
                    segment,
                    segment.length_at_parallel_length(parallel_length, offset),
                ));
            }
            parallel_length -= segment_length;
        }
        self.segments.last().map(|last| (last, T::ZERO))
    }

    /// Position auf der Parallelkurve zur Länge entlang dieser Parallelkurve.
    pub fn parallel_position_at_parallel_length(&self, parallel_length: T, offset: T) -> Option<T::Vec2> {
        self.segment_at_parallel(parallel_length, offset)
            .map(|(segment, local)| segment.parallel_position_at(local, offset))
    }

    pub fn parallel_direction_at_parallel_length(&self, parallel_length: T, offset: T) -> Option<T> {
        self.segment_at_parallel(parallel_length, offset)
            .map(|(segment, local)| segment.direction_at(local))
    }

    pub fn parallel_curvature_at_parallel_length(&self, parallel_length: T, offset: T) -> Option<T> {
        self.segment_at_parallel(parallel_length, offset)
            .map(|(segment, local)| segment.parallel_curvature_at(local, offset))
    }

    pub fn end_position(&self) -> Option<T::Vec2> {
        self.segments.last().map(Clothoid::end_position)
    }

    pub fn end_direction(&self) -> Option<T> {
        self.segments.last().map(Clothoid::end_direction)
    }

    pub fn end_curvature(&self) -> Option<T> {
        self.segments.last().map(Clothoid::end_curvature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use glam::DVec2;

    fn sample_chain() -> ClothoidChain<f64> {
        let mut chain = ClothoidChain::new();
        {
            let first = chain.append();
            first.set_start_position(DVec2::new(5.0, 1.0));
            first.set_start_direction(0.2);
            first.set_curvature_rate(0.002);
            first.set_length(10.0);
        }
        chain.append().set_length(7.5);
        {
            let third = chain.append();
            third.set_curvature_rate(-0.002);
            third.set_length(10.0);
        }
        chain.append().set_length(4.0);
        chain
    }

    #[test]
    fn first_segment_starts_at_origin() {
        let mut chain = ClothoidChain::<f64>::new();
        let first = *chain.append();
        assert_eq!(first.start_position(), DVec2::ZERO);
        assert_eq!(first.start_direction(), 0.0);
        assert_eq!(first.start_curvature(), 0.0);
    }

    #[test]
    fn appended_segments_are_continuous() {
        let chain = sample_chain();
        for pair in chain.clothoids().windows(2) {
            let end = pair[0].end_position();
            assert_abs_diff_eq!(pair[1].start_position().x, end.x, epsilon = 1e-12);
            assert_abs_diff_eq!(pair[1].start_position().y, end.y, epsilon = 1e-12);
            assert_abs_diff_eq!(pair[1].start_direction(), pair[0].end_direction(), epsilon = 1e-12);
            assert_abs_diff_eq!(pair[1].start_curvature(), pair[0].end_curvature(), epsilon = 1e-12);
        }
    }

    #[test]
    fn length_is_sum_of_segments() {
        let chain = sample_chain();
        let sum: f64 = chain.clothoids().iter().map(Clothoid::length).sum();
        assert_abs_diff_eq!(chain.length(), sum, epsilon = 1e-12);
        assert_abs_diff_eq!(chain.length(), 31.5, epsilon = 1e-12);
    }

    #[test]
    fn position_clamps_before_start() {
        let chain = sample_chain();
        for x in [0.0, -1.0, -100.0] {
            assert_eq!(chain.position_at(x), Some(DVec2::new(5.0, 1.0)));
        }
    }

    #[test]
    fn position_beyond_end_is_last_segment_start() {
        let chain = sample_chain();
        let last_start = chain.last().map(Clothoid::start_position);
        assert_eq!(chain.position_at(31.5), last_start);
        assert_eq!(chain.position_at(1000.0), last_start);
        assert_ne!(chain.position_at(1000.0), chain.end_position());
    }

    #[test]
    fn position_inside_segment_uses_local_length() {
        let chain = sample_chain();
        let second = chain.clothoids()[1];
        let p = chain.position_at(12.5).expect("Position erwartet");
        let expected = second.position_at(2.5);
        assert_abs_diff_eq!(p.x, expected.x, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, expected.y, epsilon = 1e-12);
    }

    #[test]
    fn empty_chain_has_no_position() {
        let chain = ClothoidChain::<f64>::new();
        assert_eq!(chain.position_at(1.0), None);
        assert_eq!(chain.length(), 0.0);
    }

    #[test]
    fn parallel_queries_with_zero_offset_match_centerline() {
        let chain = sample_chain();
        assert_abs_diff_eq!(chain.parallel_length(0.0), chain.length(), epsilon = 1e-12);
        let a = chain.parallel_position_at_parallel_length(14.0, 0.0).expect("Position erwartet");
        let b = chain.position_at(14.0).expect("Position erwartet");
        assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-9);
        assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-9);
    }

    #[test]
    fn parallel_position_is_offset_laterally() {
        let chain = sample_chain();
        let offset = -1.5;
        let total = chain.parallel_length(offset);
        let p = chain
            .parallel_position_at_parallel_length(total * 0.5, offset)
            .expect("Position erwartet");
        // Abstand zur Mittellinie entspricht dem Versatz
        let closest = (0..=3150)
            .filter_map(|i| chain.position_at(i as f64 * 0.01))
            .map(|c| (c - p).length())
            .fold(f64::INFINITY, f64::min);
        assert_abs_diff_eq!(closest, 1.5, epsilon = 1e-2);
    }

    #[test]
    fn clear_empties_chain() {
        let mut chain = sample_chain();
        chain.clear();
        assert!(chain.is_empty());
        chain.append();
        assert_eq!(chain.len(), 1);
    }
}
