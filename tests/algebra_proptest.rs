//! Property tests for the parameter-set algebra and for vertex colors.
//!
//! Rectangles have integer bounds in `[0, 6]`, so touching and overlapping pieces are common.
//! Membership is checked at half-integer points, which never lie on a rectangle boundary; on
//! boundaries closed-set subtraction keeps the cut face and membership would be ambiguous.

use std::sync::Arc;

use proptest::prelude::*;

use ode_gen::coloring::ColorEngine;
use ode_gen::model::{OdeModel, Parameter, Summand, Variable};
use ode_gen::params::ParamSet;
use ode_gen::rect::{Interval, Rectangle};
use ode_gen::solver::{RectangleSolver, Solver};

fn interval() -> impl Strategy<Value = Interval> {
    (0i32..=6, 0i32..=6).prop_map(|(a, b)| Interval::new(a as f64, b as f64))
}

fn rectangle() -> impl Strategy<Value = Rectangle> {
    (interval(), interval()).prop_map(|(x, y)| Rectangle::new(vec![x, y]))
}

fn param_set() -> impl Strategy<Value = ParamSet> {
    prop::collection::vec(rectangle(), 0..5).prop_map(ParamSet::new)
}

fn sample_points() -> Vec<[f64; 2]> {
    let coords: Vec<f64> = (0..6).map(|i| i as f64 + 0.5).collect();
    coords.iter().flat_map(|&x| coords.iter().map(move |&y| [x, y])).collect()
}

proptest! {
    #[test]
    fn canonical_form_is_stable(a in param_set()) {
        let again = ParamSet::new(a.rectangles().to_vec());
        prop_assert_eq!(&again, &a);
        prop_assert!(a.rectangles().iter().all(|r| !r.is_empty()));
    }

    #[test]
    fn union_is_commutative(a in param_set(), b in param_set()) {
        prop_assert_eq!(a.union(&b), b.union(&a));
    }

    #[test]
    fn intersect_is_commutative(a in param_set(), b in param_set()) {
        prop_assert_eq!(a.intersect(&b), b.intersect(&a));
    }

    #[test]
    fn difference_misses_subtrahend(a in param_set(), b in param_set()) {
        // Only a zero-width face may be shared, and that counts as empty.
        prop_assert!(a.subtract(&b).intersect(&b).is_empty());
        prop_assert!(a.subtract_cover(&b).intersect_cover(&b).is_empty());
        prop_assert!(b.intersect(&a.subtract(&b)).is_empty());
    }

    #[test]
    fn covers_denote_the_canonical_set(a in param_set(), b in param_set()) {
        prop_assert!(a.union_cover(&b).is_equivalent(&a.union(&b)));
        prop_assert!(a.intersect_cover(&b).is_equivalent(&a.intersect(&b)));
        prop_assert!(a.subtract_cover(&b).is_equivalent(&a.subtract(&b)));
        let mut cover = a.union_cover(&b);
        cover.canonicalize();
        prop_assert_eq!(cover, a.union(&b));
    }

    #[test]
    fn operations_match_membership(a in param_set(), b in param_set()) {
        let union = a.union(&b);
        let intersection = a.intersect(&b);
        let difference = a.subtract(&b);
        for point in sample_points() {
            let (in_a, in_b) = (a.contains(&point), b.contains(&point));
            prop_assert_eq!(union.contains(&point), in_a || in_b);
            prop_assert_eq!(intersection.contains(&point), in_a && in_b);
            prop_assert_eq!(difference.contains(&point), in_a && !in_b);
        }
    }

    #[test]
    fn enclosure(a in param_set(), b in param_set()) {
        prop_assert!(a.union(&b).encloses(&a));
        prop_assert!(a.encloses(&a.intersect(&b)));
        prop_assert!(a.subtract(&a).is_empty());
        prop_assert!(a.is_equivalent(&a.union(&a.intersect(&b))));
    }

    #[test]
    fn subtract_pieces_are_disjoint(a in rectangle(), b in rectangle()) {
        let pieces = a.subtract(&b);
        for (i, p) in pieces.iter().enumerate() {
            prop_assert!(!p.is_empty());
            prop_assert!(a.encloses(p));
            prop_assert!(p.intersect(&b).is_empty());
            for q in &pieces[i + 1..] {
                prop_assert!(p.intersect(q).is_empty());
            }
        }
    }

    #[test]
    fn vertex_signs_complement(constant in -3i32..=3, coefficient in -3i32..=3) {
        // dx/dt = constant + coefficient * p, p in [0, 4]
        let x = Variable::new(
            "x",
            vec![0.0, 1.0],
            vec![
                Summand::constant(constant as f64),
                Summand::constant(coefficient as f64).with_param(0),
            ],
        );
        let model = Arc::new(OdeModel::new(vec![x], vec![Parameter::new("p", (0.0, 4.0))]).unwrap());
        let solver = RectangleSolver::new(Rectangle::from_bounds(&model.parameter_bounds()));
        let engine = ColorEngine::new(model, solver, 4);
        let solver = engine.solver();

        let positive = engine.vertex_color(0, 0, true);
        let negative = engine.vertex_color(0, 0, false);
        prop_assert!(solver.is_empty(&solver.and(&positive, &negative)));

        if constant == 0 && coefficient == 0 {
            prop_assert!(positive.is_empty());
            prop_assert!(negative.is_empty());
        } else {
            prop_assert!(solver.or(&positive, &negative).is_equivalent(&solver.tt()));
            for j in 0..10 {
                let p = 0.05 + 0.4 * j as f64;
                let value = constant as f64 + coefficient as f64 * p;
                if value.abs() > 1e-9 {
                    prop_assert_eq!(positive.contains(&[p]), value > 0.0);
                    prop_assert_eq!(negative.contains(&[p]), value < 0.0);
                }
            }
        }
    }
}
