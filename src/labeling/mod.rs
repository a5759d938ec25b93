pub mod triple_barrier;

pub use triple_barrier::{LabelDistribution, LabeledEvents, TripleBarrierLabeler};
