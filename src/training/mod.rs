//! Model training
//!
//! CART trees, bootstrap forests, a multiclass gradient-boosted
//! classifier, and the train/test split and grid-search machinery the
//! services use at startup. All randomness is seeded so a retrain on the
//! same dataset reproduces the same models.

pub mod decision_tree;
pub mod gradient_boosting;
pub mod metrics;
pub mod random_forest;
pub mod search;

pub use decision_tree::{DecisionTree, Task, TreeParams};
pub use gradient_boosting::{BoostedClassifier, BoostingParams};
pub use metrics::{accuracy, mean_squared_error};
pub use random_forest::{ForestParams, MultiOutputForest, RandomForest};
pub use search::{train_test_split, ForestParamGrid, GridSearch, KFold};
