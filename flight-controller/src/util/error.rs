use core::fmt::{self, Debug, Display, Formatter};

/// Failures reported by the IMU driver. `E` is the bus error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImuError<E> {
    /// A register read or write did not complete.
    BusTransactionFailure(E),
    /// Used before `configure()` and calibration completed, or after a failed configure.
    UninitializedSensor,
    /// Range selector outside `0..=3`.
    RangeMisconfiguration(u8),
    /// A register read back a different value than the one just written.
    VerificationFailed {
        register: u8,
        expected: u8,
        found: u8,
    },
    /// FIFO contents may be stale, `fifo_reset()` must run before reading it.
    FifoNotSynchronised,
}

impl<E> Display for ImuError<E>
where
    E: Debug,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ImuError::BusTransactionFailure(error) => {
                write!(f, "Bus transaction failed {:?}", error)
            }
            ImuError::UninitializedSensor => write!(f, "Sensor used before configuration"),
            ImuError::RangeMisconfiguration(selector) => {
                write!(f, "Unsupported range selector {}", selector)
            }
            ImuError::VerificationFailed {
                register,
                expected,
                found,
            } => write!(
                f,
                "Register {:#04x} verification failed, expected {:#04x} found {:#04x}",
                register, expected, found
            ),
            ImuError::FifoNotSynchronised => write!(f, "FIFO read without a prior reset"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmError {
    /// IMU configuration or calibration could not be verified.
    SensorNotReady,
    ThrottleNotIdle,
}

impl Display for ArmError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ArmError::SensorNotReady => write!(f, "IMU is not ready"),
            ArmError::ThrottleNotIdle => write!(f, "Throttle above arming threshold"),
        }
    }
}
