pub mod callback;
pub mod convergence;
pub mod problem;
pub(crate) mod record;
pub mod solvers;

pub use callback::{CancelToken, Cancellable, ChannelObserver, HistoryObserver, IterationRecord, NoopObserver};
pub use convergence::{displacement, has_converged};
pub use problem::{multiplier_names, SymbolicProblem, MULTIPLIER_START};
pub use solvers::{build_solver, select_method, GradientDescent, LagrangianOptimizer, NewtonOptimizer};
pub use solvers::{IterationObserver, IterationSnapshot, Problem, Solver};
