pub mod orientation;

pub use orientation::{AttitudeEstimate, GyroAxisCorrection, GyroCorrections, OrientationEstimator};
