//! Closed intervals and axis-aligned hyper-rectangles of parameter space.
//!
//! An interval `[low, high]` is empty whenever `low >= high`: a single point is not a valid
//! interval. This keeps sets of measure zero (a root sitting exactly on a threshold) out of the
//! parameter sets.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Index;

#[derive(Debug, Copy, Clone)]
pub struct Interval {
    pub low: f64,
    pub high: f64,
}

impl Interval {
    pub const EMPTY: Interval = Interval { low: 0.0, high: 0.0 };

    pub fn new(low: f64, high: f64) -> Self {
        // Adding zero turns -0.0 into 0.0, so both zeros compare and hash the same.
        Interval {
            low: low + 0.0,
            high: high + 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.low < self.high)
    }

    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.high - self.low
        }
    }

    pub fn contains(&self, x: f64) -> bool {
        !self.is_empty() && self.low <= x && x <= self.high
    }

    pub fn encloses(&self, other: &Interval) -> bool {
        other.is_empty() || (!self.is_empty() && self.low <= other.low && other.high <= self.high)
    }

    pub fn intersect(&self, other: &Interval) -> Interval {
        if self.is_empty() || other.is_empty() {
            return Interval::EMPTY;
        }
        Interval::new(self.low.max(other.low), self.high.min(other.high))
    }

    /// Smallest interval containing both.
    pub fn closure(&self, other: &Interval) -> Interval {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Interval::new(self.low.min(other.low), self.high.max(other.high))
    }

    /// True if the intersection has positive width. Intervals sharing only an endpoint do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        !self.intersect(other).is_empty()
    }

    fn total_cmp(&self, other: &Interval) -> Ordering {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .low
                .total_cmp(&other.low)
                .then_with(|| self.high.total_cmp(&other.high)),
        }
    }
}

// All empty intervals are the same value.
impl PartialEq for Interval {
    fn eq(&self, other: &Self) -> bool {
        self.total_cmp(other) == Ordering::Equal
    }
}

impl Eq for Interval {}

impl Hash for Interval {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if self.is_empty() {
            state.write_u8(0);
        } else {
            state.write_u8(1);
            self.low.to_bits().hash(state);
            self.high.to_bits().hash(state);
        }
    }
}

impl PartialOrd for Interval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Interval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "∅")
        } else {
            write!(f, "[{}, {}]", self.low, self.high)
        }
    }
}

/// A product of closed intervals, one per parameter.
///
/// A rectangle with no dimensions is the single point of an empty parameter space and is
/// not empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rectangle {
    intervals: Vec<Interval>,
}

impl Rectangle {
    pub fn new(intervals: Vec<Interval>) -> Self {
        Rectangle { intervals }
    }

    /// Builds a rectangle from `(low, high)` bounds, one pair per dimension.
    pub fn from_bounds(bounds: &[(f64, f64)]) -> Self {
        Rectangle::new(bounds.iter().map(|&(lo, hi)| Interval::new(lo, hi)).collect())
    }

    pub fn dimensions(&self) -> usize {
        self.intervals.len()
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.iter().any(Interval::is_empty)
    }

    pub fn contains(&self, point: &[f64]) -> bool {
        assert_eq!(point.len(), self.dimensions(), "Point has wrong dimension");
        self.intervals.iter().zip(point).all(|(i, &x)| i.contains(x))
    }

    /// Copy of this rectangle with the interval of `dim` replaced.
    pub fn with(&self, dim: usize, interval: Interval) -> Rectangle {
        let mut intervals = self.intervals.clone();
        intervals[dim] = interval;
        Rectangle { intervals }
    }

    pub fn intersect(&self, other: &Rectangle) -> Rectangle {
        assert_eq!(self.dimensions(), other.dimensions(), "Dimension mismatch");
        Rectangle::new(
            self.intervals
                .iter()
                .zip(&other.intervals)
                .map(|(a, b)| a.intersect(b))
                .collect(),
        )
    }

    pub fn encloses(&self, other: &Rectangle) -> bool {
        if other.is_empty() {
            return true;
        }
        self.intervals.iter().zip(&other.intervals).all(|(a, b)| a.encloses(b))
    }

    /// Merges two rectangles into one if their union is a rectangle.
    ///
    /// That is the case when they are equal, or differ in exactly one dimension in which
    /// their intervals overlap. The merged rectangle takes the closure in that dimension.
    pub fn merge(&self, other: &Rectangle) -> Option<Rectangle> {
        if self.is_empty() {
            return Some(other.clone());
        }
        if other.is_empty() {
            return Some(self.clone());
        }
        let mut merge_on = None;
        for (dim, (a, b)) in self.intervals.iter().zip(&other.intervals).enumerate() {
            if a != b {
                if merge_on.is_none() && a.overlaps(b) {
                    merge_on = Some(dim);
                } else {
                    return None;
                }
            }
        }
        match merge_on {
            None => Some(self.clone()),
            Some(dim) => Some(self.with(dim, self[dim].closure(&other[dim]))),
        }
    }

    /// Splits `self \ other` into pairwise disjoint rectangles (at most two per dimension).
    ///
    /// Dimensions are processed left to right. Each one contributes the parts of `self` below
    /// and above `other`, over the region already narrowed to the intersection in all
    /// previously processed dimensions.
    pub fn subtract(&self, other: &Rectangle) -> Vec<Rectangle> {
        if self.is_empty() {
            return Vec::new();
        }
        if self.intersect(other).is_empty() {
            return vec![self.clone()];
        }
        let (_, pieces) = (0..self.dimensions()).fold(
            (self.clone(), Vec::new()),
            |(working, mut pieces), dim| {
                let below = Interval::new(self[dim].low, other[dim].low);
                let above = Interval::new(other[dim].high, self[dim].high);
                for part in [below, above] {
                    if !part.is_empty() {
                        pieces.push(working.with(dim, part));
                    }
                }
                let narrowed = working.with(dim, self[dim].intersect(&other[dim]));
                (narrowed, pieces)
            },
        );
        pieces
    }

    /// Flattens to `low_0, high_0, low_1, high_1, ...`.
    pub fn to_bounds(&self) -> Vec<f64> {
        self.intervals.iter().flat_map(|i| [i.low, i.high]).collect()
    }
}

impl Index<usize> for Rectangle {
    type Output = Interval;

    fn index(&self, dim: usize) -> &Interval {
        &self.intervals[dim]
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, interval) in self.intervals.iter().enumerate() {
            if i > 0 {
                write!(f, " × ")?;
            }
            write!(f, "{}", interval)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(bounds: &[(f64, f64)]) -> Rectangle {
        Rectangle::from_bounds(bounds)
    }

    #[test]
    fn test_point_interval_is_empty() {
        assert!(Interval::new(3.0, 3.0).is_empty());
        assert!(Interval::new(4.0, 3.0).is_empty());
        assert!(!Interval::new(3.0, 4.0).is_empty());
        assert!(!Interval::new(3.0, 3.0).contains(3.0));
    }

    #[test]
    fn test_empty_intervals_are_equal() {
        assert_eq!(Interval::new(3.0, 3.0), Interval::new(5.0, 1.0));
        assert_eq!(Interval::new(3.0, 3.0), Interval::EMPTY);
        assert_ne!(Interval::new(0.0, 1.0), Interval::EMPTY);

        use std::collections::hash_map::DefaultHasher;
        let hash = |i: Interval| {
            let mut h = DefaultHasher::new();
            i.hash(&mut h);
            h.finish()
        };
        assert_eq!(hash(Interval::new(2.0, 2.0)), hash(Interval::new(7.0, -1.0)));
    }

    #[test]
    fn test_interval_ops() {
        let a = Interval::new(0.0, 2.0);
        let b = Interval::new(1.0, 3.0);
        assert_eq!(a.intersect(&b), Interval::new(1.0, 2.0));
        assert_eq!(a.closure(&b), Interval::new(0.0, 3.0));
        assert!(a.encloses(&Interval::new(0.5, 1.5)));
        assert!(!a.encloses(&b));
        assert!(a.encloses(&Interval::EMPTY));

        let c = Interval::new(2.0, 3.0);
        assert!(a.intersect(&c).is_empty());
        assert!(!a.overlaps(&c));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&Interval::new(2.5, 3.0)));
    }

    #[test]
    fn test_rect_merge() {
        let a = rect(&[(0.0, 1.0), (0.0, 2.0)]);
        let b = rect(&[(0.5, 3.0), (0.0, 2.0)]);
        assert_eq!(a.merge(&b), Some(rect(&[(0.0, 3.0), (0.0, 2.0)])));

        // Touching intervals share no area, so they stay apart.
        let c = rect(&[(1.0, 2.0), (0.0, 2.0)]);
        assert!(a.intersect(&c).is_empty());
        assert_eq!(a.merge(&c), None);

        // Differs in two dimensions.
        let d = rect(&[(0.5, 3.0), (1.0, 2.0)]);
        assert_eq!(a.merge(&d), None);

        // Disjoint in the differing dimension.
        let e = rect(&[(1.5, 3.0), (0.0, 2.0)]);
        assert_eq!(a.merge(&e), None);

        assert_eq!(a.merge(&a), Some(a.clone()));
    }

    #[test]
    fn test_rect_subtract_disjoint_pieces() {
        let a = rect(&[(0.0, 4.0), (0.0, 4.0)]);
        let b = rect(&[(1.0, 2.0), (1.0, 3.0)]);
        let pieces = a.subtract(&b);
        assert_eq!(pieces.len(), 4);
        assert_eq!(
            pieces,
            vec![
                rect(&[(0.0, 1.0), (0.0, 4.0)]),
                rect(&[(2.0, 4.0), (0.0, 4.0)]),
                rect(&[(1.0, 2.0), (0.0, 1.0)]),
                rect(&[(1.0, 2.0), (3.0, 4.0)]),
            ]
        );
        for (i, p) in pieces.iter().enumerate() {
            assert!(p.intersect(&b).is_empty());
            for q in &pieces[i + 1..] {
                assert!(p.intersect(q).is_empty());
            }
        }
    }

    #[test]
    fn test_rect_subtract_edge_cases() {
        let a = rect(&[(0.0, 1.0)]);
        assert_eq!(a.subtract(&rect(&[(2.0, 3.0)])), vec![a.clone()]);
        assert_eq!(a.subtract(&rect(&[(-1.0, 5.0)])), Vec::<Rectangle>::new());
        assert_eq!(rect(&[(1.0, 1.0)]).subtract(&a), Vec::<Rectangle>::new());
        assert_eq!(a.subtract(&rect(&[(0.5, 0.5)])), vec![a.clone()]);
    }

    #[test]
    fn test_zero_dimensional_rectangle() {
        let point = Rectangle::new(Vec::new());
        assert!(!point.is_empty());
        assert!(point.contains(&[]));
        assert!(point.subtract(&point).is_empty());
    }

    #[test]
    fn test_to_bounds() {
        let a = rect(&[(0.0, 1.0), (2.0, 3.0)]);
        assert_eq!(a.to_bounds(), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(a.to_string(), "([0, 1] × [2, 3])");
    }
}
