//! # ode-gen: Parametrized Rectangular Abstraction of ODE Models
//!
//! **`ode-gen`** turns a piecewise multi-affine ODE model into a finite transition system whose
//! edges are labelled by the sets of parameter valuations for which the flow crosses between
//! neighboring grid cells. The result is meant to be consumed by a model checker that performs
//! parameter synthesis.
//!
//! ## How it works
//!
//! Every variable has a sorted list of thresholds. The thresholds cut the state space into a grid
//! of hyper-rectangles, the **states**. For each vertex of the grid and each dimension, the
//! derivative is affine in at most one parameter, so the set of parameter values for which it
//! is positive is an interval. Those intervals, combined over the vertices of a facet, give the
//! **colors** of the facet: the parameter valuations under which the flow can pass through it.
//!
//! Colors are unions of axis-aligned rectangles in parameter space ([`ParamSet`][crate::params::ParamSet]),
//! kept in a canonical form so that equal sets compare and hash equal.
//!
//! ## Key Features
//!
//! - **Exact boundaries**: vertex colors are closed intervals, clamped to the admissible
//!   parameter range.
//! - **Pluggable solvers**: the coloring engine is generic over a [`Solver`][crate::solver::Solver].
//! - **Memoization**: vertex colors, facet colors and successor lists are computed once.
//!   Every facet is computed once for both cells sharing it.
//! - **Partitioning**: states can be split across workers, which then exchange the edges
//!   crossing their partitions.
//!
//! ## Basic Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ode_gen::config::Config;
//! use ode_gen::model::{OdeModel, Parameter, Summand, Variable};
//! use ode_gen::rect::Rectangle;
//! use ode_gen::solver::RectangleSolver;
//! use ode_gen::transition::{OdeTransitionSystem, TransitionSystem};
//!
//! // dx/dt = p - x, with x cut at 0, 1, 2, 3, 4 and p in [0, 4]
//! let x = Variable::new(
//!     "x",
//!     vec![0.0, 1.0, 2.0, 3.0, 4.0],
//!     vec![Summand::constant(1.0).with_param(0), Summand::constant(-1.0).with_variable(0)],
//! );
//! let model = Arc::new(OdeModel::new(vec![x], vec![Parameter::new("p", (0.0, 4.0))])?);
//!
//! let solver = RectangleSolver::new(Rectangle::from_bounds(&model.parameter_bounds()));
//! let ts = OdeTransitionSystem::new(model, solver, Config::default());
//!
//! // From the cell [1, 2] the flow goes up for p >= 2, down for p <= 1, and stays otherwise.
//! let successors = ts.successors(1)?;
//! assert_eq!(successors.len(), 3);
//! # Ok::<(), ode_gen::error::Error>(())
//! ```
//!
//! ## Core Components
//!
//! - **[`encoder`]**: mapping between state ids, grid coordinates and vertices.
//! - **[`params`]**: the parameter-set algebra.
//! - **[`coloring`]**: vertex and facet colors.
//! - **[`transition`]**: successors, predecessors and edge labels.
//! - **[`partition`]**, **[`comm`]** and **[`exchange`]**: distributed construction.

pub mod cache;
pub mod coloring;
pub mod comm;
pub mod config;
pub mod encoder;
pub mod error;
pub mod exchange;
pub mod model;
pub mod params;
pub mod partition;
pub mod rect;
pub mod solver;
pub mod transition;

pub use crate::error::{Error, Result};
