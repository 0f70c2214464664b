mod changes;
mod context;
mod diff;
mod engine;
mod outcome;

pub use changes::{Changes, ValueChange};
pub use context::ExecutionContext;
pub use diff::{compute_diff, resolve_python_path, Diff};
pub use engine::{Engine, OutdatedReport};
pub use outcome::StateResult;

#[cfg(test)]
mod tests;
