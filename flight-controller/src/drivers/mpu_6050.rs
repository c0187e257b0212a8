pub mod calibration;
pub mod device;
pub mod fifo;
pub mod registers;

pub use calibration::CalibrationBaseline;
pub use device::{DriverState, MPU6050Sensor};
