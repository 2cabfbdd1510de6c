//! In-memory grid model: thresholds, parameters and symbolic derivatives.
//!
//! A model is what the approximation step hands over to the abstraction: for every variable an
//! ascending list of thresholds (the grid) and an equation given as a sum of monomials. Each
//! monomial ([`Summand`]) is a constant multiplied by variables, by transfer functions of
//! variables ([`Evaluable`]), and by at most one parameter.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Error, Result};

/// A transfer function applied to the value of one variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluable {
    /// `a + (b - a) * x^n / (theta^n + x^n)`
    Hill {
        var: usize,
        theta: f64,
        n: f64,
        a: f64,
        b: f64,
    },
    /// `a + (b - a) * (1 + tanh(k * (x - theta))) / 2`
    Sigmoid {
        var: usize,
        theta: f64,
        k: f64,
        a: f64,
        b: f64,
    },
    /// Haldane-Andrews growth: `x / (theta + x + x^2 / kappa)`
    Haldane { var: usize, theta: f64, kappa: f64 },
    /// `a` below `theta`, `b` from `theta` on.
    Step { var: usize, theta: f64, a: f64, b: f64 },
    /// Linear from `a` at `low` to `b` at `high`, constant outside.
    Ramp {
        var: usize,
        low: f64,
        high: f64,
        a: f64,
        b: f64,
    },
    /// Piecewise-linear interpolation through explicit points, sorted by `x`.
    Explicit { var: usize, points: Vec<(f64, f64)> },
}

impl Evaluable {
    /// Creates an explicit table function; points are sorted by their `x` coordinate.
    pub fn explicit(var: usize, points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut points: Vec<_> = points.into_iter().collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Evaluable::Explicit { var, points }
    }

    /// The variable this function reads.
    pub fn var(&self) -> usize {
        match *self {
            Evaluable::Hill { var, .. }
            | Evaluable::Sigmoid { var, .. }
            | Evaluable::Haldane { var, .. }
            | Evaluable::Step { var, .. }
            | Evaluable::Ramp { var, .. }
            | Evaluable::Explicit { var, .. } => var,
        }
    }

    pub fn eval(&self, x: f64) -> f64 {
        match self {
            Evaluable::Hill { theta, n, a, b, .. } => {
                let xn = x.powf(*n);
                a + (b - a) * xn / (theta.powf(*n) + xn)
            }
            Evaluable::Sigmoid { theta, k, a, b, .. } => a + (b - a) * 0.5 * (1.0 + (k * (x - theta)).tanh()),
            Evaluable::Haldane { theta, kappa, .. } => x / (theta + x + x * x / kappa),
            Evaluable::Step { theta, a, b, .. } => {
                if x < *theta {
                    *a
                } else {
                    *b
                }
            }
            Evaluable::Ramp { low, high, a, b, .. } => {
                if x <= *low {
                    *a
                } else if x >= *high {
                    *b
                } else {
                    a + (b - a) * (x - low) / (high - low)
                }
            }
            Evaluable::Explicit { points, .. } => interpolate(points, x),
        }
    }
}

fn interpolate(points: &[(f64, f64)], x: f64) -> f64 {
    let Some(&(first_x, first_y)) = points.first() else {
        return 0.0;
    };
    if x <= first_x {
        return first_y;
    }
    for pair in points.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x == x1 {
            return y1;
        }
        if x < x1 {
            return y0 + (y1 - y0) * (x - x0) / (x1 - x0);
        }
    }
    points[points.len() - 1].1
}

impl fmt::Display for Evaluable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluable::Hill { var, theta, n, a, b } => write!(f, "Hill({}, {}, {}, {}, {})", var, theta, n, a, b),
            Evaluable::Sigmoid { var, theta, k, a, b } => write!(f, "Sigmoid({}, {}, {}, {}, {})", var, theta, k, a, b),
            Evaluable::Haldane { var, theta, kappa } => write!(f, "Haldane({}, {}, {})", var, theta, kappa),
            Evaluable::Step { var, theta, a, b } => write!(f, "Step({}, {}, {}, {})", var, theta, a, b),
            Evaluable::Ramp { var, low, high, a, b } => write!(f, "Ramp({}, {}, {}, {}, {})", var, low, high, a, b),
            Evaluable::Explicit { var, points } => write!(f, "Explicit({}, {} points)", var, points.len()),
        }
    }
}

/// One monomial of a derivative: `constant * Π variables * Π evaluables [* parameter]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Summand {
    pub constant: f64,
    pub variable_indices: Vec<usize>,
    pub evaluables: Vec<Evaluable>,
    pub param_index: Option<usize>,
}

impl Summand {
    pub fn constant(value: f64) -> Self {
        Summand {
            constant: value,
            variable_indices: Vec::new(),
            evaluables: Vec::new(),
            param_index: None,
        }
    }

    pub fn with_variable(mut self, var: usize) -> Self {
        self.variable_indices.push(var);
        self
    }

    pub fn with_evaluable(mut self, evaluable: Evaluable) -> Self {
        self.evaluables.push(evaluable);
        self
    }

    pub fn with_param(mut self, param: usize) -> Self {
        self.param_index = Some(param);
        self
    }

    pub fn has_param(&self) -> bool {
        self.param_index.is_some()
    }

    /// Variables this monomial reads, directly or through a transfer function.
    pub fn dependencies(&self) -> impl Iterator<Item = usize> + '_ {
        self.variable_indices
            .iter()
            .copied()
            .chain(self.evaluables.iter().map(Evaluable::var))
    }

    /// Evaluates the parameter-free part of the monomial, reading variable values from `value`.
    pub fn eval(&self, value: impl Fn(usize) -> f64) -> f64 {
        let mut partial = self.constant;
        for &v in &self.variable_indices {
            partial *= value(v);
        }
        if partial != 0.0 {
            for evaluable in &self.evaluables {
                partial *= evaluable.eval(value(evaluable.var()));
            }
        }
        partial
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub range: (f64, f64),
}

impl Parameter {
    pub fn new(name: impl Into<String>, range: (f64, f64)) -> Self {
        Parameter {
            name: name.into(),
            range,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub range: (f64, f64),
    pub thresholds: Vec<f64>,
    pub equation: Vec<Summand>,
}

impl Variable {
    /// Creates a variable whose range spans its outermost thresholds.
    pub fn new(name: impl Into<String>, thresholds: Vec<f64>, equation: Vec<Summand>) -> Self {
        let range = match (thresholds.first(), thresholds.last()) {
            (Some(&lo), Some(&hi)) => (lo, hi),
            _ => (0.0, 0.0),
        };
        Variable {
            name: name.into(),
            range,
            thresholds,
            equation,
        }
    }

    /// Number of grid cells along this variable.
    pub fn cell_count(&self) -> usize {
        self.thresholds.len().saturating_sub(1)
    }

    /// The single parameter this equation is linear in, if any.
    pub fn param(&self) -> Option<usize> {
        self.equation.iter().find_map(|s| s.param_index)
    }
}

/// A validated grid model.
///
/// Immutable after construction, so it can be shared between workers behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct OdeModel {
    variables: Vec<Variable>,
    parameters: Vec<Parameter>,
}

impl OdeModel {
    pub fn new(variables: Vec<Variable>, parameters: Vec<Parameter>) -> Result<Self> {
        if variables.is_empty() {
            return Err(Error::InvalidModel("model has no variables".to_string()));
        }
        for p in &parameters {
            let (lo, hi) = p.range;
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(Error::InvalidModel(format!(
                    "parameter {} has invalid range [{}, {}]",
                    p.name, lo, hi
                )));
            }
        }
        for var in &variables {
            if var.thresholds.len() < 2 {
                return Err(Error::InvalidModel(format!(
                    "variable {} needs at least two thresholds",
                    var.name
                )));
            }
            if var.thresholds.windows(2).any(|w| !(w[0] < w[1])) {
                return Err(Error::InvalidModel(format!(
                    "thresholds of variable {} are not strictly ascending",
                    var.name
                )));
            }
            let mut params = BTreeSet::new();
            for summand in &var.equation {
                if let Some(v) = summand.dependencies().find(|&v| v >= variables.len()) {
                    return Err(Error::InvalidModel(format!(
                        "equation of {} references unknown variable {}",
                        var.name, v
                    )));
                }
                if let Some(p) = summand.param_index {
                    if p >= parameters.len() {
                        return Err(Error::InvalidModel(format!(
                            "equation of {} references unknown parameter {}",
                            var.name, p
                        )));
                    }
                    params.insert(p);
                }
            }
            if params.len() > 1 {
                return Err(Error::InvalidModel(format!(
                    "equation of {} is linear in more than one parameter: {:?}",
                    var.name, params
                )));
            }
        }
        Ok(OdeModel { variables, parameters })
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn dimensions(&self) -> usize {
        self.variables.len()
    }

    /// Lower and upper bounds of every parameter, in parameter order.
    pub fn parameter_bounds(&self) -> Vec<(f64, f64)> {
        self.parameters.iter().map(|p| p.range).collect()
    }

    /// Variables the equation of `var` depends on.
    pub fn dependencies(&self, var: usize) -> BTreeSet<usize> {
        self.variables[var].equation.iter().flat_map(Summand::dependencies).collect()
    }
}

impl fmt::Display for OdeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.parameters {
            writeln!(f, "param {} in [{}, {}]", p.name, p.range.0, p.range.1)?;
        }
        for var in &self.variables {
            write!(f, "d{}/dt =", var.name)?;
            for (i, s) in var.equation.iter().enumerate() {
                if i > 0 {
                    write!(f, " +")?;
                }
                write!(f, " {}", s.constant)?;
                for &v in &s.variable_indices {
                    write!(f, "*{}", self.variables[v].name)?;
                }
                for e in &s.evaluables {
                    write!(f, "*{}", e)?;
                }
                if let Some(p) = s.param_index {
                    write!(f, "*{}", self.parameters[p].name)?;
                }
            }
            writeln!(f, "  ({} thresholds)", var.thresholds.len())?;
        }
        Ok(())
    }
}
