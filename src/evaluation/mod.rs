pub mod model;
pub mod walk_forward;

pub use model::{ClassPriorModel, SignalModel};
pub use walk_forward::{EvaluationData, FoldOutcome, WalkForwardEvaluator, WalkForwardReport};
