//! Parameter sets: finite unions of hyper-rectangles.
//!
//! `union`, `intersect` and `subtract` return canonical sets. A canonical set holds no empty
//! rectangle, no rectangle enclosed by another member, and no pair of members that
//! [`Rectangle::merge`] could fuse. Members are kept sorted, so equal covers compare and hash
//! equal.
//!
//! The `*_cover` variants only drop empty rectangles and leave the rest of the cover as it
//! comes out of the rectangle arithmetic. The solver builds colors with them and canonicalizes
//! once, in its memoized `minimize`.
//!
//! Note that two different canonical covers can still denote the same set of points (there is
//! no unique minimal cover in general). Use [`ParamSet::is_equivalent`] for semantic equality.

use std::fmt;

use log::trace;

use crate::rect::Rectangle;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ParamSet {
    rectangles: Vec<Rectangle>,
}

impl ParamSet {
    pub fn empty() -> Self {
        ParamSet::default()
    }

    /// Canonical set covering the given rectangles.
    pub fn new(rectangles: impl IntoIterator<Item = Rectangle>) -> Self {
        let mut set = ParamSet {
            rectangles: rectangles.into_iter().collect(),
        };
        set.canonicalize();
        set
    }

    /// Set covered by the given rectangles, without canonicalization.
    pub fn from_cover(rectangles: impl IntoIterator<Item = Rectangle>) -> Self {
        ParamSet {
            rectangles: rectangles.into_iter().filter(|r| !r.is_empty()).collect(),
        }
    }

    pub fn from_rectangle(rectangle: Rectangle) -> Self {
        ParamSet::new([rectangle])
    }

    pub fn rectangles(&self) -> &[Rectangle] {
        &self.rectangles
    }

    pub fn len(&self) -> usize {
        self.rectangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rectangles.is_empty()
    }

    pub fn contains(&self, point: &[f64]) -> bool {
        self.rectangles.iter().any(|r| r.contains(point))
    }

    pub fn intersect(&self, other: &ParamSet) -> ParamSet {
        self.intersect_cover(other).canonical()
    }

    pub fn union(&self, other: &ParamSet) -> ParamSet {
        self.union_cover(other).canonical()
    }

    pub fn subtract(&self, other: &ParamSet) -> ParamSet {
        self.subtract_cover(other).canonical()
    }

    /// Pairwise intersections of the members.
    pub fn intersect_cover(&self, other: &ParamSet) -> ParamSet {
        ParamSet::from_cover(
            self.rectangles
                .iter()
                .flat_map(|a| other.rectangles.iter().map(move |b| a.intersect(b))),
        )
    }

    /// Members of both sets side by side.
    pub fn union_cover(&self, other: &ParamSet) -> ParamSet {
        ParamSet::from_cover(self.rectangles.iter().chain(&other.rectangles).cloned())
    }

    /// Pairwise disjoint pieces of `self` outside `other`.
    pub fn subtract_cover(&self, other: &ParamSet) -> ParamSet {
        // Each subtrahend has to cut the pieces left over by the previous one.
        let pieces = other.rectangles.iter().fold(self.rectangles.clone(), |pieces, b| {
            pieces.iter().flat_map(|a| a.subtract(b)).collect()
        });
        ParamSet::from_cover(pieces)
    }

    fn canonical(mut self) -> ParamSet {
        self.canonicalize();
        self
    }

    /// True if every point of `other` lies in `self`.
    pub fn encloses(&self, other: &ParamSet) -> bool {
        other.subtract_cover(self).is_empty()
    }

    /// True if both sets contain exactly the same points.
    pub fn is_equivalent(&self, other: &ParamSet) -> bool {
        self.encloses(other) && other.encloses(self)
    }

    /// Reduces the cover to a non-redundant, merged form. Idempotent.
    pub fn canonicalize(&mut self) {
        let before = self.rectangles.len();
        self.rectangles.retain(|r| !r.is_empty());
        loop {
            self.rectangles.sort();
            self.rectangles.dedup();
            let items = std::mem::take(&mut self.rectangles);
            let kept: Vec<Rectangle> = items
                .iter()
                .enumerate()
                .filter(|&(i, r)| !items.iter().enumerate().any(|(j, o)| i != j && o.encloses(r)))
                .map(|(_, r)| r.clone())
                .collect();
            self.rectangles = kept;
            if !self.merge_one() {
                break;
            }
        }
        self.rectangles.sort();
        trace!("canonicalize: {} -> {} rectangles", before, self.rectangles.len());
    }

    /// Fuses the first mergeable pair, if any.
    fn merge_one(&mut self) -> bool {
        for i in 0..self.rectangles.len() {
            for j in i + 1..self.rectangles.len() {
                if let Some(merged) = self.rectangles[i].merge(&self.rectangles[j]) {
                    self.rectangles.swap_remove(j);
                    self.rectangles[i] = merged;
                    return true;
                }
            }
        }
        false
    }
}

impl From<Rectangle> for ParamSet {
    fn from(rectangle: Rectangle) -> Self {
        ParamSet::from_rectangle(rectangle)
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, r) in self.rectangles.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", r)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn set(rects: &[&[(f64, f64)]]) -> ParamSet {
        ParamSet::new(rects.iter().map(|b| Rectangle::from_bounds(b)))
    }

    #[test]
    fn test_drops_empty_and_enclosed() {
        let s = set(&[&[(0.0, 4.0), (0.0, 4.0)], &[(1.0, 2.0), (1.0, 2.0)], &[(3.0, 3.0), (0.0, 9.0)]]);
        assert_eq!(s.rectangles(), &[Rectangle::from_bounds(&[(0.0, 4.0), (0.0, 4.0)])]);
    }

    #[test]
    fn test_merges_to_fixpoint() {
        // Four overlapping quadrants collapse into one square.
        let s = set(&[
            &[(0.0, 1.5), (0.0, 1.5)],
            &[(1.0, 2.0), (1.0, 2.0)],
            &[(0.0, 1.5), (1.0, 2.0)],
            &[(1.0, 2.0), (0.0, 1.5)],
        ]);
        assert_eq!(s, set(&[&[(0.0, 2.0), (0.0, 2.0)]]));
    }

    #[test]
    fn test_touching_quadrants_stay_apart() {
        let s = set(&[
            &[(0.0, 1.0), (0.0, 1.0)],
            &[(1.0, 2.0), (1.0, 2.0)],
            &[(0.0, 1.0), (1.0, 2.0)],
            &[(1.0, 2.0), (0.0, 1.0)],
        ]);
        assert_eq!(s.len(), 4);
        assert!(s.is_equivalent(&set(&[&[(0.0, 2.0), (0.0, 2.0)]])));
    }

    #[test]
    fn test_canonicalize_idempotent() {
        let s = set(&[&[(0.0, 1.0), (0.0, 3.0)], &[(0.5, 2.0), (1.0, 2.0)], &[(2.5, 3.0), (0.0, 1.0)]]);
        let mut t = s.clone();
        t.canonicalize();
        assert_eq!(s, t);
    }

    #[test]
    fn test_intersect_union() {
        let a = set(&[&[(0.0, 2.0)]]);
        let b = set(&[&[(1.0, 3.0)]]);
        assert_eq!(a.intersect(&b), set(&[&[(1.0, 2.0)]]));
        assert_eq!(a.union(&b), set(&[&[(0.0, 3.0)]]));

        // Sharing an endpoint is not an overlap: no common area and no merge.
        let c = set(&[&[(2.0, 3.0)]]);
        assert!(a.intersect(&c).is_empty());
        assert_eq!(a.union(&c).len(), 2);
        assert!(a.union(&c).is_equivalent(&set(&[&[(0.0, 3.0)]])));
    }

    #[test]
    fn test_subtract() {
        let full = set(&[&[(0.0, 4.0), (0.0, 4.0)]]);
        let hole = set(&[&[(1.0, 3.0), (1.0, 3.0)]]);
        let ring = full.subtract(&hole);
        assert!(!ring.is_empty());
        assert!(ring.intersect(&hole).is_empty());
        assert!(ring.contains(&[0.5, 2.0]));
        assert!(!ring.contains(&[2.0, 2.0]));
        assert!(ring.union(&hole).is_equivalent(&full));
        assert!(full.subtract(&full).is_empty());
    }

    #[test]
    fn test_subtract_multiple() {
        let full = set(&[&[(0.0, 10.0)]]);
        let holes = set(&[&[(1.0, 2.0)], &[(5.0, 6.0)]]);
        assert_eq!(
            full.subtract(&holes),
            set(&[&[(0.0, 1.0)], &[(2.0, 5.0)], &[(6.0, 10.0)]])
        );
    }

    #[test]
    fn test_encloses() {
        let a = set(&[&[(0.0, 2.0), (0.0, 2.0)]]);
        let b = set(&[&[(0.0, 1.0), (0.0, 1.0)], &[(1.0, 2.0), (1.0, 2.0)]]);
        assert!(a.encloses(&b));
        assert!(!b.encloses(&a));
        assert!(a.encloses(&ParamSet::empty()));
        assert!(a.encloses(&a));
    }

    #[test]
    fn test_equivalent_covers() {
        // An L-shape split two different ways.
        let a = set(&[&[(0.0, 2.0), (0.0, 1.0)], &[(0.0, 1.0), (1.0, 2.0)]]);
        let b = set(&[&[(0.0, 1.0), (0.0, 2.0)], &[(1.0, 2.0), (0.0, 1.0)]]);
        assert!(a.is_equivalent(&b));
    }

    #[test]
    fn test_cover_variants() {
        let a = set(&[&[(0.0, 2.0), (0.0, 1.0)]]);
        let b = set(&[&[(1.0, 3.0), (0.0, 1.0)], &[(5.0, 6.0), (0.0, 1.0)]]);

        let raw = a.union_cover(&b);
        assert_eq!(raw.len(), 3);
        let mut canonical = raw.clone();
        canonical.canonicalize();
        assert_eq!(canonical, a.union(&b));
        assert_eq!(canonical.len(), 2);

        assert_eq!(a.intersect_cover(&b).rectangles(), &[Rectangle::from_bounds(&[(1.0, 2.0), (0.0, 1.0)])]);
        assert!(a.subtract_cover(&b).is_equivalent(&set(&[&[(0.0, 1.0), (0.0, 1.0)]])));
        assert!(ParamSet::from_cover([Rectangle::from_bounds(&[(1.0, 1.0), (0.0, 1.0)])]).is_empty());
    }

    #[test]
    fn test_zero_parameters() {
        let tt = ParamSet::from_rectangle(Rectangle::new(Vec::new()));
        let ff = ParamSet::empty();
        assert!(!tt.is_empty());
        assert!(tt.subtract(&tt).is_empty());
        assert_eq!(tt.union(&tt), tt);
        assert_eq!(tt.intersect(&ff), ff);
    }
}
