//! # Bezier Paths
//!
//! Piecewise cubic curve through a polyline. Each source point becomes a
//! through-point with an incoming and an outgoing tangent point, estimated
//! from its neighbours:
//!
//! ```text
//!   p0 ─ t0 ········ q0 ─ p1 ─ q1 ········ q0 ─ p2 ─ q1 ··· ─ pn
//!   └─ segment 0 ──────────┘└─ segment 1 ───────────┘
//! ```
//!
//! A path with `n` source points has `n - 1` segments and `3(n - 1) + 1`
//! control points. Segment arc lengths are measured once when the path is
//! built and cached, so mapping a distance along the path to a segment is a
//! linear scan over `segment_count` floats.

use ember_core::Vec3;

/// Steps used to measure the arc length of one segment.
pub const ARC_LENGTH_STEPS: usize = 32;

/// Piecewise cubic bezier path.
#[derive(Debug, Clone, Default)]
pub struct BezierPath {
    /// The polyline the path was built from
    source: Vec<Vec3>,
    /// Tangent scale the path was built with
    scale: f32,
    control_points: Vec<Vec3>,
    segment_lengths: Vec<f32>,
    length: f32,
}

impl BezierPath {
    /// Creates an empty path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a path through `points`, see [`BezierPath::set_control_points`].
    #[must_use]
    pub fn from_points(points: &[Vec3], scale: f32) -> Self {
        let mut path = Self::new();
        path.set_control_points(points, scale);
        path
    }

    /// Rebuilds the path through `points`.
    ///
    /// `scale` is the tangent length as a fraction of the distance to the
    /// neighbouring point; around 0.3 gives smooth curves, 0 gives the
    /// polyline itself. Fewer than two points leave the path empty.
    pub fn set_control_points(&mut self, points: &[Vec3], scale: f32) {
        self.source.clear();
        self.source.extend_from_slice(points);
        self.scale = scale;
        self.rebuild();
    }

    /// Rebuilds the path through a decimated copy of a dense point stream,
    /// such as mouse or emitter samples.
    ///
    /// A point is kept only when it is farther than `min_sqr_distance` from
    /// the point after it and the last kept point is farther than
    /// `max_sqr_distance` from that next point. The last kept interior point
    /// is then nudged along the end tangent to even out the final two
    /// segments.
    pub fn set_control_points_resampled(
        &mut self,
        points: &[Vec3],
        min_sqr_distance: f32,
        max_sqr_distance: f32,
        scale: f32,
    ) {
        if points.len() < 2 {
            self.set_control_points(&[], scale);
            return;
        }

        let mut samples = vec![points[0]];
        let mut candidate = points[1];
        for &next in &points[2..] {
            let committed = samples[samples.len() - 1];
            if candidate.distance_squared(next) > min_sqr_distance
                && committed.distance_squared(next) > max_sqr_distance
            {
                samples.push(candidate);
            }
            candidate = next;
        }

        // Balance the last two segments around the final sample
        if samples.len() >= 2 {
            if let Some(last) = samples.pop() {
                let before = samples[samples.len() - 1];
                let tangent = (before - candidate).normalize_or_zero();
                let tail = candidate.distance(last);
                let head = last.distance(before);
                samples.push(last + tangent * ((head - tail) / 2.0));
            }
        }
        samples.push(candidate);

        self.set_control_points(&samples, scale);
    }

    /// Appends a point to the source polyline and rebuilds the whole path.
    pub fn add_point(&mut self, point: Vec3) {
        self.source.push(point);
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.control_points.clear();
        self.segment_lengths.clear();
        self.length = 0.0;

        let points = &self.source;
        let n = points.len();
        if n < 2 {
            return;
        }

        let scale = self.scale;
        self.control_points.reserve(3 * (n - 1) + 1);
        for i in 0..n {
            let p = points[i];
            if i == 0 {
                self.control_points.push(p);
                self.control_points.push(p + (points[1] - p) * scale);
            } else if i == n - 1 {
                self.control_points.push(p - (p - points[i - 1]) * scale);
                self.control_points.push(p);
            } else {
                let previous = points[i - 1];
                let next = points[i + 1];
                let tangent = (next - previous).normalize_or_zero();
                self.control_points
                    .push(p - tangent * (scale * p.distance(previous)));
                self.control_points.push(p);
                self.control_points.push(p + tangent * (scale * next.distance(p)));
            }
        }

        for segment in 0..n - 1 {
            let length = self.measure_segment(segment);
            self.segment_lengths.push(length);
            self.length += length;
        }
    }

    fn measure_segment(&self, segment: usize) -> f32 {
        let mut length = 0.0;
        let mut previous = self.evaluate(segment, 0.0);
        for step in 1..=ARC_LENGTH_STEPS {
            let point = self.evaluate(segment, step as f32 / ARC_LENGTH_STEPS as f32);
            length += previous.distance(point);
            previous = point;
        }
        length
    }

    /// Number of cubic segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.control_points.len().saturating_sub(1) / 3
    }

    /// All control points, `3 * segment_count() + 1` of them.
    #[must_use]
    pub fn control_points(&self) -> &[Vec3] {
        &self.control_points
    }

    /// The polyline the path was built from.
    #[must_use]
    pub fn source_points(&self) -> &[Vec3] {
        &self.source
    }

    /// Cached arc length of every segment.
    #[must_use]
    pub fn segment_lengths(&self) -> &[f32] {
        &self.segment_lengths
    }

    /// Total arc length.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Whether the path has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segment_lengths.is_empty()
    }

    /// Maps a distance along the path to `(segment, local time)`.
    ///
    /// `time` is measured in the same units as [`BezierPath::length`]. Zero
    /// (or less) maps to the start of the first segment, `length()` or more
    /// to the end of the last.
    #[must_use]
    pub fn find_curve(&self, time: f32) -> (usize, f32) {
        if time <= 0.0 || self.is_empty() {
            return (0, 0.0);
        }
        let last = self.segment_lengths.len() - 1;
        if time >= self.length {
            return (last, 1.0);
        }

        let mut total = 0.0;
        for (segment, &length) in self.segment_lengths.iter().enumerate() {
            total += length;
            if total > time {
                return (segment, (1.0 - (total - time) / length).clamp(0.0, 1.0));
            }
        }
        (last, 1.0)
    }

    /// Cubic Bernstein evaluation of one segment.
    #[inline]
    #[must_use]
    pub fn calculate_bezier_point(t: f32, p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3) -> Vec3 {
        let u = 1.0 - t;
        let uu = u * u;
        let tt = t * t;
        p0 * (uu * u) + p1 * (3.0 * uu * t) + p2 * (3.0 * u * tt) + p3 * (tt * t)
    }

    fn segment_points(&self, segment: usize) -> [Vec3; 4] {
        let i = segment * 3;
        [
            self.control_points[i],
            self.control_points[i + 1],
            self.control_points[i + 2],
            self.control_points[i + 3],
        ]
    }

    /// Point at local time `t` of `segment`.
    ///
    /// # Panics
    ///
    /// Panics if `segment >= segment_count()`.
    #[must_use]
    pub fn evaluate(&self, segment: usize, t: f32) -> Vec3 {
        let [p0, p1, p2, p3] = self.segment_points(segment);
        Self::calculate_bezier_point(t, p0, p1, p2, p3)
    }

    /// Point `time` units along the path, `None` for an empty path.
    #[must_use]
    pub fn position(&self, time: f32) -> Option<Vec3> {
        if self.is_empty() {
            return None;
        }
        let (segment, t) = self.find_curve(time);
        Some(self.evaluate(segment, t))
    }

    /// Unit direction of travel `time` units along the path.
    #[must_use]
    pub fn tangent(&self, time: f32) -> Option<Vec3> {
        if self.is_empty() {
            return None;
        }
        let (segment, t) = self.find_curve(time);
        let [p0, p1, p2, p3] = self.segment_points(segment);

        let u = 1.0 - t;
        let derivative =
            (p1 - p0) * (3.0 * u * u) + (p2 - p1) * (6.0 * u * t) + (p3 - p2) * (3.0 * t * t);

        // Zero where a tangent point coincides with its through-point
        let tangent = derivative.normalize_or_zero();
        if tangent == Vec3::ZERO {
            Some((p3 - p0).normalize_or_zero())
        } else {
            Some(tangent)
        }
    }

    /// Unit horizontal normal (`up × tangent`) `time` units along the path.
    /// Falls back to +X where the path runs vertically.
    #[must_use]
    pub fn normal(&self, time: f32) -> Option<Vec3> {
        let tangent = self.tangent(time)?;
        let normal = Vec3::Y.cross(tangent).normalize_or_zero();
        if normal == Vec3::ZERO {
            Some(Vec3::X)
        } else {
            Some(normal)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corner() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 10.0),
        ]
    }

    #[test]
    fn test_three_points_two_segments() {
        let path = BezierPath::from_points(&corner(), 1.0);
        assert_eq!(path.segment_count(), 2);
        assert_eq!(path.control_points().len(), 7);
        assert_eq!(path.segment_lengths().len(), 2);
    }

    #[test]
    fn test_control_point_layout() {
        let path = BezierPath::from_points(&corner(), 0.5);
        let cp = path.control_points();

        assert_eq!(cp[0], Vec3::ZERO);
        assert!(cp[1].abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-5));
        assert_eq!(cp[3], Vec3::new(10.0, 0.0, 0.0));
        assert!(cp[5].abs_diff_eq(Vec3::new(10.0, 0.0, 5.0), 1e-5));
        assert_eq!(cp[6], Vec3::new(10.0, 0.0, 10.0));

        // Interior tangents are collinear with the through-point
        let incoming = (cp[3] - cp[2]).normalize_or_zero();
        let outgoing = (cp[4] - cp[3]).normalize_or_zero();
        assert!(incoming.abs_diff_eq(outgoing, 1e-5));
    }

    #[test]
    fn test_too_few_points_is_empty() {
        let path = BezierPath::from_points(&[Vec3::X], 0.3);
        assert!(path.is_empty());
        assert_eq!(path.segment_count(), 0);
        assert_eq!(path.find_curve(5.0), (0, 0.0));
        assert_eq!(path.position(1.0), None);
    }

    #[test]
    fn test_straight_line_length() {
        let path = BezierPath::from_points(&[Vec3::ZERO, Vec3::new(0.0, 0.0, 8.0)], 0.3);
        assert!((path.length() - 8.0).abs() < 1e-3);
        let middle = path.position(4.0).unwrap();
        assert!((middle.z - 4.0).abs() < 0.5);
    }

    #[test]
    fn test_find_curve_bounds() {
        let path = BezierPath::from_points(&corner(), 0.3);
        assert_eq!(path.find_curve(0.0), (0, 0.0));
        assert_eq!(path.find_curve(path.length()), (1, 1.0));
        assert_eq!(path.find_curve(path.length() * 2.0), (1, 1.0));

        let first = path.segment_lengths()[0];
        let (segment, t) = path.find_curve(first * 0.5);
        assert_eq!(segment, 0);
        assert!((t - 0.5).abs() < 1e-4);

        let (segment, t) = path.find_curve(first + path.segment_lengths()[1] * 0.25);
        assert_eq!(segment, 1);
        assert!((t - 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_add_point_rebuilds() {
        let mut path = BezierPath::from_points(&corner(), 0.3);
        let before = path.length();
        path.add_point(Vec3::new(0.0, 0.0, 10.0));
        assert_eq!(path.segment_count(), 3);
        assert_eq!(path.control_points().len(), 10);
        assert!(path.length() > before);
        // The old end point now has both tangents
        assert_eq!(path.control_points()[6], Vec3::new(10.0, 0.0, 10.0));
    }

    #[test]
    fn test_tangent_and_normal() {
        let path = BezierPath::from_points(&[Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)], 0.3);
        let tangent = path.tangent(5.0).unwrap();
        assert!(tangent.abs_diff_eq(Vec3::X, 1e-5));

        let normal = path.normal(5.0).unwrap();
        assert!((normal.length() - 1.0).abs() < 1e-5);
        assert!(normal.dot(tangent).abs() < 1e-5);
        assert!(normal.y.abs() < 1e-5);

        let vertical = BezierPath::from_points(&[Vec3::ZERO, Vec3::new(0.0, 10.0, 0.0)], 0.3);
        assert_eq!(vertical.normal(1.0), Some(Vec3::X));
    }

    #[test]
    fn test_resampling_drops_dense_points() {
        let dense: Vec<Vec3> = (0..=100).map(|i| Vec3::new(i as f32 * 0.1, 0.0, 0.0)).collect();
        let mut path = BezierPath::new();
        path.set_control_points_resampled(&dense, 0.001, 1.0, 0.3);

        let kept = path.source_points();
        assert!(kept.len() < dense.len());
        assert!(kept.len() >= 2);
        assert_eq!(kept[0], dense[0]);
        assert_eq!(kept[kept.len() - 1], dense[100]);
        assert!((path.length() - 10.0).abs() < 0.05);
    }

    #[test]
    fn test_resampling_two_points() {
        let mut path = BezierPath::new();
        path.set_control_points_resampled(&[Vec3::ZERO, Vec3::X], 0.0, 0.0, 0.3);
        assert_eq!(path.source_points(), &[Vec3::ZERO, Vec3::X]);
        assert_eq!(path.segment_count(), 1);

        path.set_control_points_resampled(&[Vec3::ZERO], 0.0, 0.0, 0.3);
        assert!(path.is_empty());
    }
}
