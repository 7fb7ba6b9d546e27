mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from fenjian for tests
pub use fenjian::{
  BatchError, BatchReport, Classifier, ClassifierConfig, ImageOutcome, StartupError,
  label::LabelSet,
  model::{Detector, RawDetection},
};
