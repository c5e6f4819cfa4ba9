pub mod vector;

pub use vector::{distance_to_segment, CurveVector};

/// 2D vector type, used for cross-section profiles.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 3D vector type, used for sweep paths.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;
