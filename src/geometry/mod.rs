pub mod curve;

pub use curve::{CubicBezier, Curve, CurveDomain};
