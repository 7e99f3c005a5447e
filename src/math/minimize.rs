//! Bounded quasi-Newton minimization on top of `argmin`.
//!
//! Every bootstrap sample is fitted by minimizing a chisq/dof objective over a handful
//! of parameters with a simple box constraint (`kappa >= 0`). The objective is a black
//! box that may return `+∞` for infeasible points, so:
//!
//! - the solver is `argmin`'s L-BFGS with a More–Thuente line search
//! - the box is handled by projection: the solver sees `f(clamp(x))`, which is flat
//!   outside the box, and the returned point is clamped
//! - gradients are forward differences of the projected function, switching to
//!   backward differences when the forward point is infeasible
//! - infeasible points cost [`INFEASIBLE_COST`] so the line search backs off
//!
//! The best finite point seen during the run is returned even when the solver stops
//! with an error (e.g. a failed line search).

use std::cell::{Cell, RefCell};

use argmin::core::{CostFunction, Error, Executor, Gradient, State, TerminationReason, TerminationStatus};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use nalgebra::DVector;

/// Cost reported to the solver for points where the objective is not finite.
pub const INFEASIBLE_COST: f64 = 1e30;

/// Lower/upper bound for one parameter. Use infinities for "unbounded".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub lower: f64,
    pub upper: f64,
}

impl Bound {
    pub const FREE: Bound = Bound {
        lower: f64::NEG_INFINITY,
        upper: f64::INFINITY,
    };

    pub const NON_NEGATIVE: Bound = Bound {
        lower: 0.0,
        upper: f64::INFINITY,
    };

    fn clamp(self, v: f64) -> f64 {
        v.max(self.lower).min(self.upper)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MinimizerOptions {
    /// Stop when the cost changes by less than this between iterations.
    pub ftol: f64,
    /// Stop when the gradient's L2 norm drops below this.
    pub gtol: f64,
    pub max_iter: u64,
    /// L-BFGS history length.
    pub memory: usize,
    /// Relative finite-difference step.
    pub fd_step: f64,
}

impl Default for MinimizerOptions {
    fn default() -> Self {
        Self {
            ftol: 1e-6,
            gtol: 1e-5,
            max_iter: 15_000,
            memory: 10,
            fd_step: 1e-8,
        }
    }
}

/// Why the minimizer stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Cost or gradient tolerance reached.
    Converged,
    MaxIterations,
    /// The solver gave up, e.g. the line search found no acceptable step.
    Stopped(String),
    /// The starting point itself was infeasible.
    InfeasibleStart,
}

impl Termination {
    fn from_status(status: &TerminationStatus) -> Self {
        match status {
            TerminationStatus::Terminated(TerminationReason::SolverConverged) => Termination::Converged,
            TerminationStatus::Terminated(TerminationReason::MaxItersReached) => Termination::MaxIterations,
            TerminationStatus::Terminated(reason) => Termination::Stopped(format!("{reason:?}")),
            TerminationStatus::NotTerminated => Termination::Stopped("not terminated".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub f: f64,
    pub iterations: u64,
    pub evaluations: usize,
    pub termination: Termination,
}

impl Minimum {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// `f` seen through the box projection, with evaluation bookkeeping.
struct Projected<'a, F> {
    f: &'a F,
    bounds: &'a [Bound],
    fd_step: f64,
    evaluations: &'a Cell<usize>,
    best: &'a RefCell<(Vec<f64>, f64)>,
}

impl<F> Projected<'_, F>
where
    F: Fn(&[f64]) -> f64,
{
    fn project(&self, x: &[f64]) -> Vec<f64> {
        x.iter().zip(self.bounds).map(|(v, b)| b.clamp(*v)).collect()
    }

    fn eval(&self, x: &[f64]) -> f64 {
        let p = self.project(x);
        self.evaluations.set(self.evaluations.get() + 1);
        let v = (self.f)(&p);
        if v.is_finite() {
            let mut best = self.best.borrow_mut();
            if v < best.1 {
                *best = (p, v);
            }
        }
        v
    }

    fn fd_gradient(&self, x: &[f64]) -> Vec<f64> {
        let fx = self.eval(x);
        if !fx.is_finite() {
            return vec![0.0; x.len()];
        }
        let mut grad = vec![0.0; x.len()];
        let mut shifted = x.to_vec();
        for i in 0..x.len() {
            let h = self.fd_step * x[i].abs().max(1.0);
            shifted[i] = x[i] + h;
            let f1 = self.eval(&shifted);
            grad[i] = if f1.is_finite() {
                (f1 - fx) / h
            } else {
                shifted[i] = x[i] - h;
                let f0 = self.eval(&shifted);
                if f0.is_finite() { (fx - f0) / h } else { 0.0 }
            };
            shifted[i] = x[i];
        }
        grad
    }
}

impl<F> CostFunction for Projected<'_, F>
where
    F: Fn(&[f64]) -> f64,
{
    type Param = DVector<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, Error> {
        let v = self.eval(p.as_slice());
        Ok(if v.is_finite() { v } else { INFEASIBLE_COST })
    }
}

impl<F> Gradient for Projected<'_, F>
where
    F: Fn(&[f64]) -> f64,
{
    type Param = DVector<f64>;
    type Gradient = DVector<f64>;

    fn gradient(&self, p: &Self::Param) -> Result<Self::Gradient, Error> {
        Ok(DVector::from_vec(self.fd_gradient(p.as_slice())))
    }
}

/// Minimize `f` starting at `x0` subject to `bounds`.
///
/// # Panics
/// Panics if `bounds.len() != x0.len()`.
pub fn minimize_bounded<F>(f: F, x0: &[f64], bounds: &[Bound], opts: &MinimizerOptions) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    assert_eq!(x0.len(), bounds.len(), "one bound per parameter");

    let evaluations = Cell::new(0);
    let best = RefCell::new((Vec::new(), f64::INFINITY));
    let problem = Projected {
        f: &f,
        bounds,
        fd_step: opts.fd_step,
        evaluations: &evaluations,
        best: &best,
    };

    let start = problem.project(x0);
    let f0 = problem.eval(&start);
    if !f0.is_finite() {
        return Minimum {
            x: start,
            f: f0,
            iterations: 0,
            evaluations: evaluations.get(),
            termination: Termination::InfeasibleStart,
        };
    }

    let (iterations, termination) = match run_lbfgs(problem, start, opts) {
        Ok(done) => done,
        Err(e) => (0, Termination::Stopped(e.to_string())),
    };

    let (x, f) = best.into_inner();
    Minimum {
        x,
        f,
        iterations,
        evaluations: evaluations.get(),
        termination,
    }
}

fn run_lbfgs<F>(problem: Projected<'_, F>, start: Vec<f64>, opts: &MinimizerOptions) -> Result<(u64, Termination), Error>
where
    F: Fn(&[f64]) -> f64,
{
    let solver = LBFGS::new(MoreThuenteLineSearch::new(), opts.memory.max(1))
        .with_tolerance_cost(opts.ftol)?
        .with_tolerance_grad(opts.gtol)?;

    let result = Executor::new(problem, solver)
        .configure(|state| state.param(DVector::from_vec(start)).max_iters(opts.max_iter))
        .run()?;

    let state = result.state();
    Ok((state.get_iter(), Termination::from_status(state.get_termination_status())))
}
