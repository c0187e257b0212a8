pub mod imu_sensors;
#[cfg(any(test, feature = "mock"))]
pub mod mock_bus;
pub mod mpu_6050;
pub mod register_bus;
