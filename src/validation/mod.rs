pub mod purged_kfold;

pub use purged_kfold::{DataSplitter, FoldSplit, PurgedKFold};
