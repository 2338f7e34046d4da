//! Model dispatch, splitting, search and evaluation

pub mod estimator;
pub mod metrics;
pub mod model;
pub mod search;
pub mod split;
pub mod target;

pub use self::estimator::FittedEstimator;
pub use self::model::FittedPipeline;
pub use self::search::{cross_val_score, grid_search, clustering_search, SearchOutcome};
pub use self::split::{k_fold_indices, train_test_indices, DEFAULT_SEED, DEFAULT_TEST_FRACTION};
pub use self::target::TargetValues;
