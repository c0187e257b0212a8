use crate::control::scheduler::UpdateFlag;

/// Raised by the loop timer interrupt, taken by the control loop.
pub static CONTROL_LOOP_TICK: UpdateFlag = UpdateFlag::new();

/// Timer overflow interrupt body. Sets the flag and returns, no bus access or control math.
pub fn on_timer_overflow() {
    CONTROL_LOOP_TICK.raise();
}
