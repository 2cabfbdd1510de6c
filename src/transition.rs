//! Parametrized transition system over the rectangular abstraction.
//!
//! States are grid cells. A cell has an edge to its neighbor along some dimension for exactly
//! the parameter valuations under which the flow leaves through the shared facet. With self-loops
//! enabled, a cell also loops on itself for the valuations under which the flow does not
//! simply pass through it in any dimension.
//!
//! The model checker consumes the system through the [`TransitionSystem`] trait.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, info};

use crate::cache::Cache;
use crate::coloring::{ColorEngine, Orientation};
use crate::config::Config;
use crate::encoder::NodeEncoder;
use crate::error::Result;
use crate::model::OdeModel;
use crate::solver::Solver;

/// Which way an edge moves through the grid.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DirectionLabel {
    Increase(usize),
    Decrease(usize),
    Loop,
}

impl fmt::Display for DirectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectionLabel::Increase(dim) => write!(f, "+{}", dim),
            DirectionLabel::Decrease(dim) => write!(f, "-{}", dim),
            DirectionLabel::Loop => write!(f, "loop"),
        }
    }
}

/// One edge as seen from a state: the state on the other end, the direction of the edge
/// (from its source to its target), and the colors for which it exists.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<C> {
    pub target: usize,
    pub direction: DirectionLabel,
    pub colors: C,
}

/// What a model checker needs from a parametrized transition system.
pub trait TransitionSystem {
    type Colors;

    fn state_count(&self) -> usize;

    /// All parameter valuations.
    fn tt(&self) -> Self::Colors;
    /// No parameter valuation.
    fn ff(&self) -> Self::Colors;

    fn successors(&self, state: usize) -> Result<Vec<Transition<Self::Colors>>>;

    /// Edges entering `state`; `target` of each returned transition is the predecessor.
    fn predecessors(&self, state: usize) -> Result<Vec<Transition<Self::Colors>>>;

    /// Colors of the edge `source -> target` (empty if there is no such edge).
    fn transition_params(&self, source: usize, target: usize) -> Result<Self::Colors>;
}

pub struct OdeTransitionSystem<S: Solver> {
    engine: ColorEngine<S>,
    config: Config,
    successors: RefCell<Cache<usize, Vec<Transition<S::Colors>>>>,
    predecessors: RefCell<Cache<usize, Vec<Transition<S::Colors>>>>,
    edge_colors: RefCell<HashMap<(usize, usize), S::Colors>>,
}

impl<S: Solver> OdeTransitionSystem<S> {
    pub fn new(model: Arc<OdeModel>, solver: S, config: Config) -> Self {
        Self {
            engine: ColorEngine::new(model, solver, config.cache_bits),
            config,
            successors: RefCell::new(Cache::new(config.cache_bits)),
            predecessors: RefCell::new(Cache::new(config.cache_bits)),
            edge_colors: RefCell::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &ColorEngine<S> {
        &self.engine
    }

    pub fn encoder(&self) -> &NodeEncoder {
        self.engine.encoder()
    }

    pub fn solver(&self) -> &S {
        self.engine.solver()
    }

    /// Logs solver and cache statistics.
    pub fn log_stats(&self) {
        info!(
            "{}; vertex cache hits: {}; cached edges: {}",
            self.solver().stats(),
            self.engine.vertex_cache_hits(),
            self.edge_colors.borrow().len()
        );
    }

    fn cached_step(
        &self,
        cache: &RefCell<Cache<usize, Vec<Transition<S::Colors>>>>,
        state: usize,
        successors: bool,
    ) -> Result<Vec<Transition<S::Colors>>> {
        self.encoder().check_state(state)?;
        if let Some(step) = cache.borrow_mut().get(&state) {
            return Ok(step.clone());
        }
        let step = self.step(state, successors);
        cache.borrow_mut().insert(state, step.clone());
        Ok(step)
    }

    fn step(&self, state: usize, successors: bool) -> Vec<Transition<S::Colors>> {
        let solver = self.solver();
        let encoder = self.encoder();
        let mut result = Vec::new();
        let mut self_loop = solver.tt();

        for dim in 0..encoder.dimensions() {
            let positive_in = self.engine.facet_color(state, dim, Orientation::PositiveIn);
            let positive_out = self.engine.facet_color(state, dim, Orientation::PositiveOut);
            let negative_in = self.engine.facet_color(state, dim, Orientation::NegativeIn);
            let negative_out = self.engine.facet_color(state, dim, Orientation::NegativeOut);

            if let Some(higher) = encoder.higher_node(state, dim) {
                let (colors, direction, edge) = if successors {
                    (&positive_out, DirectionLabel::Increase(dim), (state, higher))
                } else {
                    (&positive_in, DirectionLabel::Decrease(dim), (higher, state))
                };
                if solver.is_sat(colors) {
                    self.add_edge(&mut result, higher, direction, edge, colors);
                }
                if self.config.create_self_loops {
                    // Flow enters from below and leaves above, and never the other way.
                    let through = solver.and(
                        &solver.and(&negative_in, &positive_out),
                        &solver.not(&solver.or(&negative_out, &positive_in)),
                    );
                    self_loop = solver.and(&self_loop, &solver.not(&through));
                }
            }

            if let Some(lower) = encoder.lower_node(state, dim) {
                let (colors, direction, edge) = if successors {
                    (&negative_out, DirectionLabel::Decrease(dim), (state, lower))
                } else {
                    (&negative_in, DirectionLabel::Increase(dim), (lower, state))
                };
                if solver.is_sat(colors) {
                    self.add_edge(&mut result, lower, direction, edge, colors);
                }
                if self.config.create_self_loops {
                    let through = solver.and(
                        &solver.and(&negative_out, &positive_in),
                        &solver.not(&solver.or(&negative_in, &positive_out)),
                    );
                    self_loop = solver.and(&self_loop, &solver.not(&through));
                }
            }
        }

        if self.config.create_self_loops && solver.is_sat(&self_loop) {
            solver.minimize(&mut self_loop);
            self.add_edge(&mut result, state, DirectionLabel::Loop, (state, state), &self_loop);
        }

        debug!(
            "{}({}) = {:?}",
            if successors { "successors" } else { "predecessors" },
            state,
            result.iter().map(|t| t.target).collect::<Vec<_>>()
        );
        result
    }

    fn add_edge(
        &self,
        result: &mut Vec<Transition<S::Colors>>,
        target: usize,
        direction: DirectionLabel,
        edge: (usize, usize),
        colors: &S::Colors,
    ) {
        self.edge_colors
            .borrow_mut()
            .entry(edge)
            .or_insert_with(|| colors.clone());
        result.push(Transition {
            target,
            direction,
            colors: colors.clone(),
        });
    }
}

impl<S: Solver> TransitionSystem for OdeTransitionSystem<S> {
    type Colors = S::Colors;

    fn state_count(&self) -> usize {
        self.encoder().state_count()
    }

    fn tt(&self) -> S::Colors {
        self.solver().tt()
    }

    fn ff(&self) -> S::Colors {
        self.solver().ff()
    }

    fn successors(&self, state: usize) -> Result<Vec<Transition<S::Colors>>> {
        self.cached_step(&self.successors, state, true)
    }

    fn predecessors(&self, state: usize) -> Result<Vec<Transition<S::Colors>>> {
        self.cached_step(&self.predecessors, state, false)
    }

    fn transition_params(&self, source: usize, target: usize) -> Result<S::Colors> {
        self.encoder().check_state(target)?;
        if let Some(colors) = self.edge_colors.borrow().get(&(source, target)) {
            return Ok(colors.clone());
        }
        self.successors(source)?;
        Ok(self
            .edge_colors
            .borrow()
            .get(&(source, target))
            .cloned()
            .unwrap_or_else(|| self.ff()))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::error::Error;
    use crate::model::{Parameter, Summand, Variable};
    use crate::params::ParamSet;
    use crate::rect::Rectangle;
    use crate::solver::RectangleSolver;

    /// dx/dt = p - x over thresholds 0..4, p in [0, 4]: the flow settles at x = p.
    fn production_system(config: Config) -> OdeTransitionSystem<RectangleSolver> {
        let x = Variable::new(
            "x",
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![Summand::constant(1.0).with_param(0), Summand::constant(-1.0).with_variable(0)],
        );
        let model = Arc::new(OdeModel::new(vec![x], vec![Parameter::new("p", (0.0, 4.0))]).unwrap());
        let solver = RectangleSolver::new(Rectangle::from_bounds(&model.parameter_bounds()));
        OdeTransitionSystem::new(model, solver, config)
    }

    fn p_range(lo: f64, hi: f64) -> ParamSet {
        ParamSet::from_rectangle(Rectangle::from_bounds(&[(lo, hi)]))
    }

    fn targets<C>(transitions: &[Transition<C>]) -> Vec<usize> {
        let mut t: Vec<usize> = transitions.iter().map(|t| t.target).collect();
        t.sort();
        t
    }

    #[test]
    fn test_successors_with_parameter() {
        let ts = production_system(Config::default());
        let succ = ts.successors(1).unwrap();
        assert_eq!(targets(&succ), vec![0, 1, 2]);

        let up = succ.iter().find(|t| t.target == 2).unwrap();
        assert_eq!(up.direction, DirectionLabel::Increase(0));
        assert_eq!(up.colors, p_range(2.0, 4.0));

        let down = succ.iter().find(|t| t.target == 0).unwrap();
        assert_eq!(down.direction, DirectionLabel::Decrease(0));
        assert_eq!(down.colors, p_range(0.0, 1.0));

        // The flow stays inside [1, 2] exactly when the equilibrium p lies there.
        let stay = succ.iter().find(|t| t.target == 1).unwrap();
        assert_eq!(stay.direction, DirectionLabel::Loop);
        assert_eq!(stay.colors, p_range(1.0, 2.0));
    }

    #[test]
    fn test_predecessors_match_successors() {
        let ts = production_system(Config::default());
        for state in 0..ts.state_count() {
            for pred in ts.predecessors(state).unwrap() {
                let forward = ts.successors(pred.target).unwrap();
                let edge = forward.iter().find(|t| t.target == state).unwrap();
                assert_eq!(edge.colors, pred.colors);
                assert_eq!(edge.direction, pred.direction);
            }
        }
    }

    #[test]
    fn test_transition_params() {
        let ts = production_system(Config::default());
        assert_eq!(ts.transition_params(1, 2).unwrap(), p_range(2.0, 4.0));
        assert_eq!(ts.transition_params(2, 1).unwrap(), p_range(0.0, 2.0));
        assert!(ts.transition_params(0, 2).unwrap().is_empty());
        assert_eq!(
            ts.transition_params(0, 9),
            Err(Error::StateOutOfRange { state: 9, count: 4 })
        );
    }

    #[test]
    fn test_without_self_loops() {
        let ts = production_system(Config::default().with_self_loops(false));
        for state in 0..ts.state_count() {
            let succ = ts.successors(state).unwrap();
            assert!(succ.iter().all(|t| t.direction != DirectionLabel::Loop));
        }
    }

    #[test]
    fn test_out_of_range_state() {
        let ts = production_system(Config::default());
        assert_eq!(
            ts.successors(4).unwrap_err(),
            Error::StateOutOfRange { state: 4, count: 4 }
        );
        assert!(ts.predecessors(17).is_err());
    }

    #[test]
    fn test_successors_cached() {
        let ts = production_system(Config::default());
        let first = ts.successors(2).unwrap();
        let calls = ts.solver().stats().solver_calls();
        let second = ts.successors(2).unwrap();
        assert_eq!(first, second);
        assert_eq!(ts.solver().stats().solver_calls(), calls);
    }
}
