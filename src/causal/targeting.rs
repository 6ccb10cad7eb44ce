//! Targeted Updating Loop
//!
//! Each iteration fluctuates the outcome, mediator and exposure predictions in
//! that order, each fit on the observed-mediator rows and folded additively
//! into the logit of every expanded row. The loop stops once the absolute
//! empirical mean of `eic0` falls under `se0 / (ln(n) * sqrt(n))`, computed
//! from the initial influence curve, or when the iteration cap is reached.
//!
//! `psi_0` depends only on the outcome and mediator predictions, so psi0
//! is unchanged by the exposure fluctuation.
use crate::causal::counterfactual::ExpandedDataset;
use crate::causal::fluctuation::fit_fluctuation;
use crate::causal::influence::{eic0_row, mediator_covariate, mediator_weight, outcome_weight, psi0_estimate, InitialEstimate};
use crate::errors::DisparityError;
use crate::utils::{bound_probability, expit, logit};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// State of the targeting loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopState {
    Iterating,
    /// The estimating equation statistic met the tolerance.
    Converged,
    /// The iteration cap was reached first. Not an error.
    Exhausted,
}

/// Transition after an iteration has produced `statistic`.
pub fn next_state(statistic: f64, tolerance: f64, iteration: usize, max_iterations: usize) -> LoopState {
    if statistic <= tolerance {
        LoopState::Converged
    } else if iteration >= max_iterations {
        LoopState::Exhausted
    } else {
        LoopState::Iterating
    }
}

/// Fluctuation parameters and estimate of one iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationTrace {
    pub iteration: usize,
    pub eps_y: f64,
    pub eps_z: f64,
    pub eps_a: f64,
    pub estimate: f64,
    pub statistic: f64,
}

/// How the targeting loop ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Convergence {
    pub state: LoopState,
    pub iterations: usize,
    pub statistic: f64,
    pub tolerance: f64,
    pub trace: Vec<IterationTrace>,
}

/// Targeted psi0 and the convergence record.
#[derive(Debug, Clone)]
pub struct TargetedEstimate {
    pub psi0: f64,
    pub convergence: Convergence,
}

/// Stopping tolerance for `n` observations and initial standard error `se0`.
pub fn tolerance(se0: f64, n: usize) -> f64 {
    let n = n as f64;
    se0 / (n.ln() * n.sqrt())
}

fn shift(p: f64, delta: f64, bound: f64) -> f64 {
    bound_probability(expit(logit(p, bound) + delta), bound)
}

fn fluctuate_outcome(ex: &mut ExpandedDataset, observed: &[usize], pibar: f64, bound: f64) -> Result<f64, DisparityError> {
    let target: Vec<f64> = observed.iter().map(|&i| ex.y[i]).collect();
    let offset: Vec<f64> = observed.iter().map(|&i| logit(ex.qhat[i], bound)).collect();
    let weights: Vec<f64> = observed.iter().map(|&i| outcome_weight(ex, i, pibar)).collect();
    let eps = fit_fluctuation(&target, &offset, None, Some(&weights))?;
    for q in [&mut ex.qhat, &mut ex.qhat_a1, &mut ex.qhat_a1_z0, &mut ex.qhat_a1_z1] {
        q.iter_mut().for_each(|p| *p = shift(*p, eps, bound));
    }
    Ok(eps)
}

fn fluctuate_mediator(ex: &mut ExpandedDataset, observed: &[usize], pibar: f64, bound: f64) -> Result<f64, DisparityError> {
    let target: Vec<f64> = observed.iter().map(|&i| ex.z_obs[i]).collect();
    let offset: Vec<f64> = observed.iter().map(|&i| logit(ex.gammahat[i], bound)).collect();
    let covariate: Vec<f64> = observed.iter().map(|&i| mediator_covariate(ex, i)).collect();
    let weights: Vec<f64> = observed.iter().map(|&i| mediator_weight(ex, i, pibar)).collect();
    let eps = fit_fluctuation(&target, &offset, Some(&covariate), Some(&weights))?;
    for i in 0..ex.len() {
        let delta = eps * mediator_covariate(ex, i);
        ex.gammahat[i] = shift(ex.gammahat[i], delta, bound);
        ex.gammahat_a0[i] = shift(ex.gammahat_a0[i], delta, bound);
        ex.gammahat_a1[i] = shift(ex.gammahat_a1[i], delta, bound);
    }
    Ok(eps)
}

fn fluctuate_exposure(
    ex: &mut ExpandedDataset,
    observed: &[usize],
    pibar: f64,
    estimate: f64,
    bound: f64,
) -> Result<f64, DisparityError> {
    let target: Vec<f64> = observed.iter().map(|&i| ex.a[i]).collect();
    let offset: Vec<f64> = observed.iter().map(|&i| logit(ex.pihat[i], bound)).collect();
    let covariate: Vec<f64> = observed.iter().map(|&i| (ex.psi_0[i] - estimate) / pibar).collect();
    let eps = fit_fluctuation(&target, &offset, Some(&covariate), None)?;
    for i in 0..ex.len() {
        let delta = eps * (ex.psi_0[i] - estimate) / pibar;
        ex.pihat[i] = shift(ex.pihat[i], delta, bound);
    }
    Ok(eps)
}

/// Absolute empirical mean of `eic0` at the current predictions.
pub fn estimating_equation(ex: &ExpandedDataset, observed: &[usize], pibar: f64, psi0: f64) -> f64 {
    let total: f64 = observed.iter().map(|&i| eic0_row(ex, i, pibar, psi0)).sum();
    (total / observed.len() as f64).abs()
}

/// Run the targeting loop on `ex`, updating its predictions in place.
///
/// * `ex` - Expanded table built from the initial nuisance fits.
/// * `observed` - Observed-mediator rows of `ex`.
/// * `initial` - Un-targeted estimates; supplies `pibar` and `se0`.
/// * `max_iterations` - Iteration cap, at least 1.
/// * `bound` - Probability clipping bound.
pub fn target_psi0(
    ex: &mut ExpandedDataset,
    observed: &[usize],
    initial: &InitialEstimate,
    max_iterations: usize,
    bound: f64,
) -> Result<TargetedEstimate, DisparityError> {
    let pibar = initial.pibar;
    let tolerance = tolerance(initial.se0, observed.len());
    let mut psi0 = initial.psi0;
    let mut state = LoopState::Iterating;
    let mut trace = Vec::new();
    let mut statistic = f64::NAN;

    let mut iteration = 0;
    while state == LoopState::Iterating {
        iteration += 1;
        let eps_y = fluctuate_outcome(ex, observed, pibar, bound)?;
        let eps_z = fluctuate_mediator(ex, observed, pibar, bound)?;
        ex.update_psi();
        psi0 = psi0_estimate(ex, observed, pibar);
        let eps_a = fluctuate_exposure(ex, observed, pibar, psi0, bound)?;

        statistic = estimating_equation(ex, observed, pibar, psi0);
        debug!(
            "Targeting iteration {}: eps_y {:.6e}, eps_z {:.6e}, eps_a {:.6e}, psi0 {:.6}, statistic {:.3e}, tolerance {:.3e}",
            iteration, eps_y, eps_z, eps_a, psi0, statistic, tolerance
        );
        trace.push(IterationTrace {
            iteration,
            eps_y,
            eps_z,
            eps_a,
            estimate: psi0,
            statistic,
        });
        state = next_state(statistic, tolerance, iteration, max_iterations);
    }

    match state {
        LoopState::Exhausted => warn!(
            "Targeting did not converge in {} iterations (statistic {:.3e} > tolerance {:.3e}); reporting the last estimate.",
            iteration, statistic, tolerance
        ),
        _ => info!("Targeting converged after {} iterations.", iteration),
    }

    Ok(TargetedEstimate {
        psi0,
        convergence: Convergence {
            state,
            iterations: iteration,
            statistic,
            tolerance,
            trace,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_next_state() {
        assert_eq!(next_state(0.01, 0.1, 1, 10), LoopState::Converged);
        assert_eq!(next_state(0.1, 0.1, 10, 10), LoopState::Converged);
        assert_eq!(next_state(0.5, 0.1, 3, 10), LoopState::Iterating);
        assert_eq!(next_state(0.5, 0.1, 10, 10), LoopState::Exhausted);
        assert_eq!(next_state(f64::NAN, 0.1, 10, 10), LoopState::Exhausted);
    }

    #[test]
    fn test_tolerance() {
        let n = 100;
        let expected = 0.5 / (100f64.ln() * 10.0);
        assert!((tolerance(0.5, n) - expected).abs() < 1e-15);
    }

    /// Expanded table with deliberately biased predictions.
    fn biased_table(n: usize, seed: u64) -> ExpandedDataset {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ex = ExpandedDataset::default();
        let mut rows = Vec::with_capacity(n);
        for _ in 0..n {
            let w: f64 = rng.gen_range(-1.0..1.0);
            let a = if rng.gen::<f64>() < expit(0.5 * w) { 1.0 } else { 0.0 };
            let z = if rng.gen::<f64>() < expit(0.3 - 0.8 * a + w) { 1.0 } else { 0.0 };
            let y = if rng.gen::<f64>() < expit(-0.5 + 0.7 * a - 1.0 * z + w) { 1.0 } else { 0.0 };
            rows.push((w, a, z, y));
        }
        for replica in [0.0, 1.0] {
            for (id, &(w, a, z_obs, y)) in rows.iter().enumerate() {
                ex.id.push(id);
                ex.a.push(a);
                ex.z.push(replica);
                ex.z_obs.push(z_obs);
                ex.y.push(y);
                ex.pihat.push(expit(0.2 * w));
                let g0 = expit(0.1 + 0.5 * w);
                let g1 = expit(-0.4 + 0.5 * w);
                ex.gammahat_a0.push(g0);
                ex.gammahat_a1.push(g1);
                ex.gammahat.push(if a == 1.0 { g1 } else { g0 });
                let q = |a: f64, z: f64| expit(-0.3 + 0.4 * a - 0.6 * z + 0.5 * w);
                ex.qhat.push(q(a, replica));
                ex.qhat_a1.push(q(1.0, replica));
                ex.qhat_a1_z0.push(q(1.0, 0.0));
                ex.qhat_a1_z1.push(q(1.0, 1.0));
            }
        }
        ex.psi_0 = vec![0.0; 2 * n];
        ex.psi_1 = vec![0.0; 2 * n];
        ex.update_psi();
        ex
    }

    #[test]
    fn test_targeting_solves_estimating_equation() {
        let mut ex = biased_table(400, 7);
        let observed = ex.observed();
        let initial = InitialEstimate::new(&ex, &observed);
        let targeted = target_psi0(&mut ex, &observed, &initial, 50, 1e-6).unwrap();

        let c = &targeted.convergence;
        assert!(targeted.psi0.is_finite());
        assert_eq!(c.trace.len(), c.iterations);
        assert_eq!(c.trace.last().unwrap().estimate, targeted.psi0);
        assert!(c.state != LoopState::Iterating);
        if c.state == LoopState::Converged {
            assert!(c.statistic <= c.tolerance);
            let stat = estimating_equation(&ex, &observed, initial.pibar, targeted.psi0);
            assert!(stat <= c.tolerance);
        }
        assert!(ex.pihat.iter().all(|p| *p > 0.0 && *p < 1.0));
    }

    #[test]
    fn test_outcome_fluctuation_solves_its_score() {
        let mut ex = biased_table(300, 11);
        let observed = ex.observed();
        let pibar = InitialEstimate::new(&ex, &observed).pibar;
        fluctuate_outcome(&mut ex, &observed, pibar, 1e-6).unwrap();
        let score: f64 = observed
            .iter()
            .map(|&i| outcome_weight(&ex, i, pibar) * (ex.y[i] - ex.qhat[i]))
            .sum::<f64>()
            / observed.len() as f64;
        assert!(score.abs() < 1e-6);
    }

    #[test]
    fn test_exposure_fluctuation_leaves_psi0_unchanged() {
        let mut ex = biased_table(300, 5);
        let observed = ex.observed();
        let pibar = InitialEstimate::new(&ex, &observed).pibar;
        let psi0 = psi0_estimate(&ex, &observed, pibar);
        let psi_0 = ex.psi_0.clone();
        fluctuate_exposure(&mut ex, &observed, pibar, psi0, 1e-6).unwrap();
        ex.update_psi();
        assert_eq!(ex.psi_0, psi_0);
        assert_eq!(psi0_estimate(&ex, &observed, pibar), psi0);
    }

    #[test]
    fn test_single_iteration_cap_is_exhausted_or_converged() {
        let mut ex = biased_table(200, 3);
        let observed = ex.observed();
        let initial = InitialEstimate::new(&ex, &observed);
        let targeted = target_psi0(&mut ex, &observed, &initial, 1, 1e-6).unwrap();
        assert_eq!(targeted.convergence.iterations, 1);
        assert!(matches!(
            targeted.convergence.state,
            LoopState::Converged | LoopState::Exhausted
        ));
    }
}
