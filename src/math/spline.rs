//! Cubic interpolating spline over a bounded domain.
//!
//! The UV reference curve is only known on a frequency grid; the forward transform
//! needs it at arbitrary `ω/T`. We interpolate once with a not-a-knot cubic spline
//! (`S'''` continuous at the second and second-to-last nodes) and refuse to
//! extrapolate: evaluating outside `[x_0, x_{n-1}]` is a [`SpfError::Domain`] error,
//! never a clamped value.
//!
//! Three nodes give the interpolating parabola and two give a straight line.

use crate::error::SpfError;

/// Once-fit cubic interpolant. Immutable after construction.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives at the nodes.
    m: Vec<f64>,
}

impl CubicSpline {
    /// Fit a not-a-knot cubic spline through `(x_i, y_i)`.
    ///
    /// `x` must be strictly increasing and all values finite.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, SpfError> {
        validate_xy(&x, &y)?;
        let m = not_a_knot_second_derivatives(&x, &y);
        Ok(Self { x, y, m })
    }

    /// Lower end of the domain.
    pub fn min_x(&self) -> f64 {
        self.x[0]
    }

    /// Upper end of the domain.
    pub fn max_x(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    /// Interpolation nodes.
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// Node values.
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Evaluate the spline at `xq`.
    pub fn value(&self, xq: f64) -> Result<f64, SpfError> {
        let i = self.segment(xq)?;
        let h = self.x[i + 1] - self.x[i];
        let t = xq - self.x[i];
        let (y0, y1) = (self.y[i], self.y[i + 1]);
        let (m0, m1) = (self.m[i], self.m[i + 1]);

        let b = (y1 - y0) / h - h * (2.0 * m0 + m1) / 6.0;
        let c = m0 / 2.0;
        let d = (m1 - m0) / (6.0 * h);
        Ok(y0 + t * (b + t * (c + t * d)))
    }

    fn segment(&self, xq: f64) -> Result<usize, SpfError> {
        let n = self.x.len();
        if !(xq >= self.x[0] && xq <= self.x[n - 1]) {
            return Err(SpfError::Domain {
                omega: xq,
                min: self.x[0],
                max: self.x[n - 1],
            });
        }
        let idx = self.x.partition_point(|v| *v <= xq);
        Ok(idx.saturating_sub(1).min(n - 2))
    }
}

fn validate_xy(x: &[f64], y: &[f64]) -> Result<(), SpfError> {
    if x.len() != y.len() {
        return Err(SpfError::Interpolation("x and y must have the same length"));
    }
    if x.len() < 2 {
        return Err(SpfError::Interpolation("need at least two interpolation nodes"));
    }
    if x.iter().any(|v| !v.is_finite()) || y.iter().any(|v| !v.is_finite()) {
        return Err(SpfError::Interpolation("x and y must be finite"));
    }
    if x.windows(2).any(|w| w[1] <= w[0]) {
        return Err(SpfError::Interpolation("x must be strictly increasing"));
    }
    Ok(())
}

/// Second derivatives at the nodes under not-a-knot end conditions.
///
/// The end conditions `d_0 = d_1` and `d_{n-3} = d_{n-2}` (with `d_i` the constant
/// third derivative on segment `i`) are used to eliminate `m_0` and `m_{n-1}`, which
/// leaves a tridiagonal system in the interior second derivatives.
fn not_a_knot_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let slope: Vec<f64> = y.windows(2).zip(&h).map(|(w, hi)| (w[1] - w[0]) / hi).collect();

    match n {
        2 => return vec![0.0; 2],
        3 => return vec![2.0 * (slope[1] - slope[0]) / (h[0] + h[1]); 3],
        _ => {}
    }

    let k = n - 2;
    let mut lower = vec![0.0; k];
    let mut diag = vec![0.0; k];
    let mut upper = vec![0.0; k];
    let mut rhs = vec![0.0; k];
    for j in 0..k {
        let (h0, h1) = (h[j], h[j + 1]);
        lower[j] = h0;
        diag[j] = 2.0 * (h0 + h1);
        upper[j] = h1;
        rhs[j] = 6.0 * (slope[j + 1] - slope[j]);
    }

    let (h0, h1) = (h[0], h[1]);
    diag[0] = (h0 + h1) * (h0 + 2.0 * h1) / h1;
    upper[0] = (h1 * h1 - h0 * h0) / h1;

    let (a, b) = (h[n - 3], h[n - 2]);
    lower[k - 1] = (a * a - b * b) / a;
    diag[k - 1] = (a + b) * (2.0 * a + b) / a;

    let interior = solve_tridiagonal(&lower, &diag, &upper, &rhs);

    let mut m = vec![0.0; n];
    m[1..n - 1].copy_from_slice(&interior);
    m[0] = ((h0 + h1) * m[1] - h0 * m[2]) / h1;
    m[n - 1] = ((a + b) * m[n - 2] - b * m[n - 3]) / a;
    m
}

/// Thomas algorithm; `lower[0]` and `upper[k - 1]` are ignored.
fn solve_tridiagonal(lower: &[f64], diag: &[f64], upper: &[f64], rhs: &[f64]) -> Vec<f64> {
    let k = diag.len();
    let mut diag = diag.to_vec();
    let mut rhs = rhs.to_vec();
    for j in 1..k {
        let w = lower[j] / diag[j - 1];
        diag[j] -= w * upper[j - 1];
        rhs[j] -= w * rhs[j - 1];
    }

    let mut sol = vec![0.0; k];
    sol[k - 1] = rhs[k - 1] / diag[k - 1];
    for j in (0..k - 1).rev() {
        sol[j] = (rhs[j] - upper[j] * sol[j + 1]) / diag[j];
    }
    sol
}
