//! Trajectory and explanation bookkeeping shared by every solver.

use super::convergence::displacement;
use super::solvers::traits::{IterationObserver, IterationSnapshot, Problem};
use crate::types::{Method, OptimizationResult, TerminationReason};
use tracing::{debug, info, warn};

/// What one solver step produced.
pub(crate) enum Step {
    /// Candidate point over the full variable set.
    Candidate {
        gradient: Vec<f64>,
        next: Vec<f64>,
        explanation: String,
    },
    /// The step could not be computed; end the run with this reason.
    Halt {
        termination: TerminationReason,
        note: String,
    },
}

/// Loop limits shared by the fixed-step solvers.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Limits {
    pub max_iterations: u32,
    pub tolerance: f64,
}

/// Append-only record of a run, projected onto the caller's variables.
pub(crate) struct RunRecorder {
    method: Method,
    width: usize,
    trajectory: Vec<Vec<f64>>,
    explanations: Vec<String>,
}

impl RunRecorder {
    pub fn new(method: Method, start: &[f64], width: usize) -> Self {
        Self {
            method,
            width,
            trajectory: vec![start[..width].to_vec()],
            explanations: Vec::new(),
        }
    }

    pub fn accept(&mut self, next: &[f64], explanation: String) {
        self.trajectory.push(next[..self.width].to_vec());
        self.explanations.push(explanation);
    }

    pub fn finish(mut self, termination: TerminationReason, note: String) -> OptimizationResult {
        self.explanations.push(note);
        let iterations = self.trajectory.len() - 1;
        let solution = self.trajectory[iterations].clone();

        OptimizationResult {
            method: self.method.display_name().to_string(),
            solution,
            trajectory: self.trajectory,
            explanations: self.explanations,
            iterations,
            termination,
        }
    }
}

/// Drive `step` from the problem's initial point until convergence, the
/// iteration limit, a halt, or an observer stop.
///
/// Each candidate is appended exactly once; convergence is tested on the
/// full (possibly augmented) displacement and only prevents further steps.
pub(crate) fn iterate<F>(
    method: Method,
    problem: &dyn Problem,
    observer: &mut dyn IterationObserver,
    limits: Limits,
    mut step: F,
) -> OptimizationResult
where
    F: FnMut(usize, &[f64]) -> Step,
{
    let mut current = problem.initial_point().to_vec();
    let mut recorder = RunRecorder::new(method, &current, problem.primal_count());

    debug!("{:>4}  {:>13}  {:>13}", "iter", "|gradient|", "|step|");

    for iter in 0..limits.max_iterations as usize {
        if observer.should_stop() {
            info!(method = method.as_str(), iteration = iter, "stopped by observer");
            return recorder.finish(
                TerminationReason::Stopped,
                format!("Stopped at step {} by request.", iter),
            );
        }

        let (gradient, next, explanation) = match step(iter, &current) {
            Step::Candidate {
                gradient,
                next,
                explanation,
            } => (gradient, next, explanation),
            Step::Halt { termination, note } => {
                warn!(method = method.as_str(), iteration = iter, %termination, "{}", note);
                return recorder.finish(termination, note);
            }
        };

        if next.iter().any(|v| !v.is_finite()) {
            let note = format!("Step {} produced a non-finite point; stopping.", iter);
            warn!(method = method.as_str(), iteration = iter, "{}", note);
            return recorder.finish(TerminationReason::Diverged, note);
        }

        let step_norm = displacement(&current, &next);
        let grad_norm = gradient.iter().map(|g| g * g).sum::<f64>().sqrt();
        debug!("{:>4}  {:>13.6e}  {:>13.6e}", iter, grad_norm, step_norm);

        observer.on_iteration(&IterationSnapshot {
            iteration: iter,
            method,
            point: &current,
            gradient: &gradient,
            next: &next,
            displacement: step_norm,
        });

        recorder.accept(&next, explanation);
        current = next;

        if step_norm < limits.tolerance {
            info!(method = method.as_str(), iterations = iter + 1, "converged");
            return recorder.finish(
                TerminationReason::Converged,
                format!("Converged at step {} with tolerance {}.", iter, limits.tolerance),
            );
        }
    }

    info!(
        method = method.as_str(),
        iterations = limits.max_iterations,
        "iteration limit reached"
    );
    recorder.finish(
        TerminationReason::MaxIterations,
        format!(
            "Reached the maximum of {} iterations without converging.",
            limits.max_iterations
        ),
    )
}

/// `[a, b, c]` with values printed as-is.
pub(crate) fn format_point(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

/// `[a, b, c]` with four decimals.
pub(crate) fn format_fixed(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{:.4}", v)).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_projects_and_counts() {
        let mut rec = RunRecorder::new(Method::Lagrangian, &[0.5, 0.5, 1.0], 2);
        rec.accept(&[0.3, 0.3, 1.0], "step 0".into());
        let result = rec.finish(TerminationReason::MaxIterations, "done".into());

        assert_eq!(result.method, "Lagrangian");
        assert_eq!(result.trajectory, vec![vec![0.5, 0.5], vec![0.3, 0.3]]);
        assert_eq!(result.solution, vec![0.3, 0.3]);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.explanations, vec!["step 0", "done"]);
    }

    #[test]
    fn point_formatting() {
        assert_eq!(format_point(&[0.0, 2.5]), "[0, 2.5]");
        assert_eq!(format_fixed(&[-4.0, 1.0 / 3.0]), "[-4.0000, 0.3333]");
    }
}
