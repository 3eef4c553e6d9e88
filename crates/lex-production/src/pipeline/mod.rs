//! Pipeline module.
//!
//! This module provides the cleaning pipeline, its outlier stage, and the
//! progress and cancellation plumbing around it.

mod builder;
pub mod outliers;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder};
pub use outliers::{OutlierDetection, OutlierHandler};
pub use progress::{
    CancellationToken, CleaningStage, ClosureProgressReporter, ProgressReporter, ProgressUpdate,
};
