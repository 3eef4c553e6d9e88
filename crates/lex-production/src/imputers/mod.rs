//! Imputation module for handling missing values.
//!
//! This module provides the two strategies of the cleaning run:
//! - Skewness-conditioned mean/median or forward/backward fill for production
//! - Linear interpolation for sensor readings

mod interpolation;
mod statistical;

pub use interpolation::{LinearInterpolator, fill_linear, fill_linear_nearest_edges};
pub use statistical::ProductionImputer;
