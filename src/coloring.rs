//! Vertex and facet coloring.
//!
//! The sign of the derivative of variable `dim` is evaluated at grid vertices. A vertex color
//! is the set of parameter valuations under which that sign is positive (or negative). A facet
//! color is the union of the vertex colors over the corners of one facet of a cell, and
//! describes when the flow may cross that facet in a given direction.
//!
//! Every facet is shared by two cells. When the color of a facet is computed for one of them,
//! the same value is stored for the neighbor's dual orientation in the same cache fill, so the
//! two cells can never disagree about their common boundary.

use std::cell::RefCell;
use std::sync::Arc;

use log::{debug, trace};

use crate::cache::Cache;
use crate::encoder::NodeEncoder;
use crate::model::OdeModel;
use crate::solver::Solver;

/// Side of a cell and direction of the flow through it along one dimension.
///
/// `Positive*` is the upper facet, `Negative*` the lower one; `*In` is flow entering the cell
/// and `*Out` flow leaving it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Orientation {
    PositiveIn,
    PositiveOut,
    NegativeIn,
    NegativeOut,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::PositiveIn,
        Orientation::PositiveOut,
        Orientation::NegativeIn,
        Orientation::NegativeOut,
    ];

    fn index(self) -> usize {
        match self {
            Orientation::PositiveIn => 0,
            Orientation::PositiveOut => 1,
            Orientation::NegativeIn => 2,
            Orientation::NegativeOut => 3,
        }
    }

    /// Whether this is the facet at the upper threshold of the cell.
    pub fn is_upper(self) -> bool {
        matches!(self, Orientation::PositiveIn | Orientation::PositiveOut)
    }

    /// Whether crossing in this orientation needs a positive derivative.
    pub fn is_positive_flow(self) -> bool {
        matches!(self, Orientation::PositiveOut | Orientation::NegativeIn)
    }

    /// The same physical crossing seen from the neighbor on the other side of the facet.
    pub fn dual(self) -> Orientation {
        match self {
            Orientation::PositiveIn => Orientation::NegativeOut,
            Orientation::PositiveOut => Orientation::NegativeIn,
            Orientation::NegativeIn => Orientation::PositiveOut,
            Orientation::NegativeOut => Orientation::PositiveIn,
        }
    }
}

/// Derivative of one variable at one vertex, split by its dependence on the parameter:
/// `constant + coefficient * p`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Derivative {
    pub constant: f64,
    pub coefficient: f64,
    pub param: Option<usize>,
}

impl Derivative {
    /// The zero function: no sign at all, for any parameter valuation.
    pub fn is_degenerate(&self) -> bool {
        self.constant == 0.0 && self.coefficient == 0.0
    }
}

struct VertexColors<C> {
    positive: Vec<C>,
    negative: Vec<C>,
}

pub struct ColorEngine<S: Solver> {
    model: Arc<OdeModel>,
    encoder: NodeEncoder,
    solver: S,
    /// Per dimension: the corner masks whose vertices can influence its derivative.
    masks: Vec<Vec<usize>>,
    self_dependent: Vec<bool>,
    vertex_cache: RefCell<Cache<usize, VertexColors<S::Colors>>>,
    facet_cache: RefCell<Vec<Option<S::Colors>>>,
}

impl<S: Solver> ColorEngine<S> {
    pub fn new(model: Arc<OdeModel>, solver: S, cache_bits: usize) -> Self {
        let encoder = NodeEncoder::new(&model);
        let dimensions = model.dimensions();

        let mut masks = Vec::with_capacity(dimensions);
        let mut self_dependent = Vec::with_capacity(dimensions);
        for dim in 0..dimensions {
            let dependencies = model.dependencies(dim);
            // Corners only differing in variables the equation ignores give the same value.
            let independent = (0..dimensions)
                .filter(|v| !dependencies.contains(v))
                .fold(0usize, |acc, v| acc | (1 << v));
            masks.push((0..1usize << dimensions).filter(|m| m & independent == 0).collect());
            self_dependent.push(dependencies.contains(&dim));
        }

        let facet_count = encoder.state_count() * dimensions * Orientation::ALL.len();
        debug!(
            "ColorEngine: {} states, {} vertices, {} facets",
            encoder.state_count(),
            encoder.vertex_count(),
            facet_count
        );

        Self {
            model,
            encoder,
            solver,
            masks,
            self_dependent,
            vertex_cache: RefCell::new(Cache::new(cache_bits)),
            facet_cache: RefCell::new(vec![None; facet_count]),
        }
    }

    pub fn model(&self) -> &OdeModel {
        &self.model
    }

    pub fn encoder(&self) -> &NodeEncoder {
        &self.encoder
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Number of vertex color requests answered from the vertex cache.
    pub fn vertex_cache_hits(&self) -> usize {
        self.vertex_cache.borrow().hits()
    }

    /// Evaluates the derivative of `dim` at the thresholds of `vertex`.
    pub fn derivative(&self, vertex: usize, dim: usize) -> Derivative {
        let variables = self.model.variables();
        let value = |v: usize| variables[v].thresholds[self.encoder.vertex_coordinate(vertex, v)];

        let mut result = Derivative {
            constant: 0.0,
            coefficient: 0.0,
            param: variables[dim].param(),
        };
        for summand in &variables[dim].equation {
            let partial = summand.eval(value);
            if summand.has_param() {
                result.coefficient += partial;
            } else {
                result.constant += partial;
            }
        }
        result
    }

    /// Parameter valuations for which the derivative of `dim` at `vertex` is positive
    /// (or negative, when `positive` is false).
    pub fn vertex_color(&self, vertex: usize, dim: usize, positive: bool) -> S::Colors {
        if let Some(colors) = self.vertex_cache.borrow_mut().get(&vertex) {
            return if positive {
                colors.positive[dim].clone()
            } else {
                colors.negative[dim].clone()
            };
        }

        let mut colors = VertexColors {
            positive: Vec::with_capacity(self.model.dimensions()),
            negative: Vec::with_capacity(self.model.dimensions()),
        };
        for d in 0..self.model.dimensions() {
            let derivative = self.derivative(vertex, d);
            let up = self.sign_color(&derivative, true);
            // The zero function has no sign, so its complement is empty as well.
            let down = if derivative.is_degenerate() {
                self.solver.ff()
            } else {
                let mut down = self.solver.not(&up);
                self.solver.minimize(&mut down);
                down
            };
            trace!("vertex {} dim {}: {:?} -> +{} / -{}", vertex, d, derivative, up, down);
            colors.positive.push(up);
            colors.negative.push(down);
        }

        let result = if positive {
            colors.positive[dim].clone()
        } else {
            colors.negative[dim].clone()
        };
        self.vertex_cache.borrow_mut().insert(vertex, colors);
        result
    }

    /// Solves `constant + coefficient * p > 0` (or `< 0`) within the range of `p`.
    fn sign_color(&self, derivative: &Derivative, positive: bool) -> S::Colors {
        match derivative.param {
            Some(param) if derivative.coefficient != 0.0 => {
                // Dividing by a negative coefficient flips the inequality.
                let positive = if derivative.coefficient > 0.0 {
                    positive
                } else {
                    !positive
                };
                let (lo, hi) = self.model.parameters()[param].range;
                let split = (-derivative.constant / derivative.coefficient).clamp(lo, hi);
                let (low, high) = if positive { (split, hi) } else { (lo, split) };
                if low >= high {
                    self.solver.ff()
                } else {
                    self.solver.param_range(param, low, high)
                }
            }
            _ => {
                if (positive && derivative.constant > 0.0) || (!positive && derivative.constant < 0.0) {
                    self.solver.tt()
                } else {
                    self.solver.ff()
                }
            }
        }
    }

    fn facet_index(&self, state: usize, dim: usize, orientation: Orientation) -> usize {
        let states = self.encoder.state_count();
        state + states * dim + states * self.model.dimensions() * orientation.index()
    }

    /// The facet color of `state` if it was already computed (directly or as a dual).
    pub fn cached_facet_color(&self, state: usize, dim: usize, orientation: Orientation) -> Option<S::Colors> {
        self.facet_cache.borrow()[self.facet_index(state, dim, orientation)].clone()
    }

    /// Parameter valuations for which the flow crosses the facet of `state` along `dim` in the
    /// given orientation.
    pub fn facet_color(&self, state: usize, dim: usize, orientation: Orientation) -> S::Colors {
        let index = self.facet_index(state, dim, orientation);
        if let Some(colors) = &self.facet_cache.borrow()[index] {
            return colors.clone();
        }

        let upper = orientation.is_upper() as usize;
        let positive = orientation.is_positive_flow();
        let mut colors = self.solver.ff();
        for &mask in &self.masks[dim] {
            if self.self_dependent[dim] && (mask >> dim) & 1 != upper {
                continue;
            }
            let vertex = self.encoder.vertex(state, mask);
            colors = self.solver.or(&colors, &self.vertex_color(vertex, dim, positive));
        }
        self.solver.minimize(&mut colors);

        let neighbor = if orientation.is_upper() {
            self.encoder.higher_node(state, dim)
        } else {
            self.encoder.lower_node(state, dim)
        };
        let mut cache = self.facet_cache.borrow_mut();
        cache[index] = Some(colors.clone());
        if let Some(neighbor) = neighbor {
            cache[self.facet_index(neighbor, dim, orientation.dual())] = Some(colors.clone());
        }
        colors
    }
}
