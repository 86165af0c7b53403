// src/colour/optimize.rs

//! Dense Levenberg–Marquardt for small non-linear least squares problems.
//!
//! Minimises `0.5 * Σ rᵢ(p)²`. The Jacobian is estimated with central
//! differences, which is plenty for the handful of parameters the IDT fit
//! uses.

use tracing::trace;

#[derive(Debug, Clone, Copy)]
pub struct LmOptions {
    pub max_iterations: usize,
    pub function_tolerance: f64,
    pub parameter_tolerance: f64,
    pub gradient_tolerance: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 300,
            function_tolerance: 1e-17,
            parameter_tolerance: 1e-17,
            gradient_tolerance: 1e-10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmSummary {
    pub iterations: usize,
    pub successful_steps: usize,
    /// A tolerance was met, as opposed to running out of iterations or
    /// failing to make progress.
    pub converged: bool,
    pub initial_cost: f64,
    pub final_cost: f64,
}

fn cost_of(residuals: &[f64]) -> f64 {
    0.5 * residuals.iter().map(|r| r * r).sum::<f64>()
}

fn jacobian<F>(f: &F, params: &[f64], n_residuals: usize) -> Vec<Vec<f64>>
where
    F: Fn(&[f64], &mut [f64]),
{
    let mut jac = vec![vec![0.0; params.len()]; n_residuals];
    let mut plus = vec![0.0; n_residuals];
    let mut minus = vec![0.0; n_residuals];
    let mut probe = params.to_vec();

    for j in 0..params.len() {
        let h = 1e-7 * params[j].abs().max(1.0);
        probe[j] = params[j] + h;
        f(&probe, &mut plus);
        probe[j] = params[j] - h;
        f(&probe, &mut minus);
        probe[j] = params[j];
        for i in 0..n_residuals {
            jac[i][j] = (plus[i] - minus[i]) / (2.0 * h);
        }
    }
    jac
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))?;
        if a[pivot][col].abs() < 1e-300 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Minimise the residuals produced by `f` starting from `params`, which is
/// updated in place.
pub fn levenberg_marquardt<F>(
    f: F,
    n_residuals: usize,
    params: &mut [f64],
    options: &LmOptions,
) -> LmSummary
where
    F: Fn(&[f64], &mut [f64]),
{
    let n = params.len();
    let mut residuals = vec![0.0; n_residuals];
    f(params, &mut residuals);
    let mut cost = cost_of(&residuals);

    let mut summary = LmSummary {
        iterations: 0,
        successful_steps: 0,
        converged: false,
        initial_cost: cost,
        final_cost: cost,
    };

    if !cost.is_finite() {
        return summary;
    }

    let mut lambda = 1e-4;
    let mut candidate = vec![0.0; n];
    let mut candidate_residuals = vec![0.0; n_residuals];

    while summary.iterations < options.max_iterations {
        summary.iterations += 1;

        let jac = jacobian(&f, params, n_residuals);

        let mut jtj = vec![vec![0.0; n]; n];
        let mut gradient = vec![0.0; n];
        for (i, row) in jac.iter().enumerate() {
            for a in 0..n {
                gradient[a] += row[a] * residuals[i];
                for b in 0..n {
                    jtj[a][b] += row[a] * row[b];
                }
            }
        }

        if gradient.iter().all(|g| g.abs() <= options.gradient_tolerance) {
            summary.converged = true;
            break;
        }

        let mut damped = jtj.clone();
        for (k, row) in damped.iter_mut().enumerate() {
            row[k] += lambda * jtj[k][k].max(1e-12);
        }
        let neg_gradient: Vec<f64> = gradient.iter().map(|g| -g).collect();

        let Some(step) = solve(damped, neg_gradient) else {
            lambda *= 10.0;
            if lambda > 1e16 {
                break;
            }
            continue;
        };

        for k in 0..n {
            candidate[k] = params[k] + step[k];
        }
        f(&candidate, &mut candidate_residuals);
        let new_cost = cost_of(&candidate_residuals);

        trace!(iteration = summary.iterations, cost, new_cost, lambda, "lm step");

        if new_cost.is_finite() && new_cost < cost {
            let step_norm = step.iter().map(|s| s * s).sum::<f64>().sqrt();
            let param_norm = params.iter().map(|p| p * p).sum::<f64>().sqrt();

            params.copy_from_slice(&candidate);
            std::mem::swap(&mut residuals, &mut candidate_residuals);
            let decrease = cost - new_cost;
            cost = new_cost;
            summary.successful_steps += 1;
            lambda = (lambda * 0.1).max(1e-15);

            if decrease <= options.function_tolerance * cost
                || step_norm <= options.parameter_tolerance * (param_norm + options.parameter_tolerance)
            {
                summary.converged = true;
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > 1e16 {
                break;
            }
        }
    }

    summary.final_cost = cost;
    summary
}
