//! Color solvers: boolean algebra over sets of parameter valuations.
//!
//! The coloring engine and the transition system only ever talk to a [`Solver`], never to a
//! concrete set representation. Two backends are provided:
//!
//! - [`RectangleSolver`]: colors are [`ParamSet`]s, unions of rectangles inside the admissible
//!   parameter box. This is the reference backend.
//! - [`BoolSolver`]: colors are plain `bool`s, for models without parameters.
//!
//! Every solver owns a [`SolverStats`] instance with its call counters and timings.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::time::{Duration, Instant};

use log::trace;

use crate::cache::Cache;
use crate::params::ParamSet;
use crate::rect::{Interval, Rectangle};

/// Diagnostic counters of one solver instance.
#[derive(Debug, Default)]
pub struct SolverStats {
    solver_calls: Cell<usize>,
    cache_hits: Cell<usize>,
    solver_time: Cell<Duration>,
    simplify_time: Cell<Duration>,
}

impl SolverStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of emptiness checks and simplifications that reached the backend.
    pub fn solver_calls(&self) -> usize {
        self.solver_calls.get()
    }

    /// Number of requests answered from a memo table instead of the backend.
    pub fn cache_hits(&self) -> usize {
        self.cache_hits.get()
    }

    /// Cumulative time spent answering emptiness checks.
    pub fn solver_time(&self) -> Duration {
        self.solver_time.get()
    }

    /// Cumulative time spent in simplification.
    pub fn simplify_time(&self) -> Duration {
        self.simplify_time.get()
    }

    pub fn record_call(&self, elapsed: Duration) {
        self.solver_calls.set(self.solver_calls.get() + 1);
        self.solver_time.set(self.solver_time.get() + elapsed);
    }

    pub fn record_simplify(&self, elapsed: Duration) {
        self.solver_calls.set(self.solver_calls.get() + 1);
        self.simplify_time.set(self.simplify_time.get() + elapsed);
    }

    pub fn record_hit(&self) {
        self.cache_hits.set(self.cache_hits.get() + 1);
    }
}

impl fmt::Display for SolverStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "solver calls: {}, cache hits: {}, solver time: {:?}, simplify time: {:?}",
            self.solver_calls(),
            self.cache_hits(),
            self.solver_time(),
            self.simplify_time()
        )
    }
}

/// Boolean operations over an opaque color type.
///
/// `not` complements within the full admissible parameter box, so `tt` is that box and `ff`
/// is the empty set. `and`, `or` and `not` may return a redundant representation; pass the
/// result through `minimize` before using it as a key or comparing it structurally.
pub trait Solver {
    type Colors: Clone + fmt::Debug + fmt::Display + PartialEq;

    fn tt(&self) -> Self::Colors;
    fn ff(&self) -> Self::Colors;

    fn and(&self, a: &Self::Colors, b: &Self::Colors) -> Self::Colors;
    fn or(&self, a: &Self::Colors, b: &Self::Colors) -> Self::Colors;
    fn not(&self, a: &Self::Colors) -> Self::Colors;

    fn is_sat(&self, a: &Self::Colors) -> bool;

    fn is_empty(&self, a: &Self::Colors) -> bool {
        !self.is_sat(a)
    }

    /// Simplifies the representation in place without changing the denoted set.
    fn minimize(&self, a: &mut Self::Colors);

    /// The colors where `param` lies in `[low, high]` and every other parameter is unconstrained.
    fn param_range(&self, param: usize, low: f64, high: f64) -> Self::Colors;

    fn stats(&self) -> &SolverStats;
}

/// Solver over unions of rectangles within a fixed parameter box.
pub struct RectangleSolver {
    bounds: Rectangle,
    tt: ParamSet,
    minimized: RefCell<Cache<ParamSet, ParamSet>>,
    stats: SolverStats,
}

impl RectangleSolver {
    pub fn new(bounds: Rectangle) -> Self {
        Self::with_cache_bits(bounds, 10)
    }

    pub fn with_cache_bits(bounds: Rectangle, cache_bits: usize) -> Self {
        assert!(!bounds.is_empty(), "Parameter bounds must not be empty");
        let tt = ParamSet::from_rectangle(bounds.clone());
        Self {
            bounds,
            tt,
            minimized: RefCell::new(Cache::new(cache_bits)),
            stats: SolverStats::new(),
        }
    }

    pub fn bounds(&self) -> &Rectangle {
        &self.bounds
    }
}

impl Solver for RectangleSolver {
    type Colors = ParamSet;

    fn tt(&self) -> ParamSet {
        self.tt.clone()
    }

    fn ff(&self) -> ParamSet {
        ParamSet::empty()
    }

    fn and(&self, a: &ParamSet, b: &ParamSet) -> ParamSet {
        a.intersect_cover(b)
    }

    fn or(&self, a: &ParamSet, b: &ParamSet) -> ParamSet {
        a.union_cover(b)
    }

    fn not(&self, a: &ParamSet) -> ParamSet {
        self.tt.subtract_cover(a)
    }

    fn is_sat(&self, a: &ParamSet) -> bool {
        let start = Instant::now();
        let result = !a.is_empty();
        self.stats.record_call(start.elapsed());
        result
    }

    fn minimize(&self, a: &mut ParamSet) {
        if let Some(m) = self.minimized.borrow_mut().get(a) {
            self.stats.record_hit();
            *a = m.clone();
            return;
        }
        let start = Instant::now();
        let key = a.clone();
        a.canonicalize();
        self.stats.record_simplify(start.elapsed());
        trace!("minimize: {} -> {}", key, a);
        self.minimized.borrow_mut().insert(key, a.clone());
    }

    fn param_range(&self, param: usize, low: f64, high: f64) -> ParamSet {
        ParamSet::from_rectangle(self.bounds.with(param, Interval::new(low, high)))
    }

    fn stats(&self) -> &SolverStats {
        &self.stats
    }
}

/// Solver for parameter-free models: a color is either everything or nothing.
#[derive(Default)]
pub struct BoolSolver {
    stats: SolverStats,
}

impl BoolSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Solver for BoolSolver {
    type Colors = bool;

    fn tt(&self) -> bool {
        true
    }

    fn ff(&self) -> bool {
        false
    }

    fn and(&self, a: &bool, b: &bool) -> bool {
        *a && *b
    }

    fn or(&self, a: &bool, b: &bool) -> bool {
        *a || *b
    }

    fn not(&self, a: &bool) -> bool {
        !*a
    }

    fn is_sat(&self, a: &bool) -> bool {
        self.stats.record_call(Duration::ZERO);
        *a
    }

    fn minimize(&self, _a: &mut bool) {}

    fn param_range(&self, _param: usize, low: f64, high: f64) -> bool {
        // There are no parameters to constrain; the range is either inhabited or not.
        Interval::new(low, high).width() > 0.0
    }

    fn stats(&self) -> &SolverStats {
        &self.stats
    }
}
