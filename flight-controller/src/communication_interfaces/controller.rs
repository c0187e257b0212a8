use shared_definitions::controller::{RadioChannelSet, RADIO_CHANNELS};

/// Pilot input, polled once per control cycle.
pub trait RadioInput {
    /// `None` when no valid frame is available, which the control loop treats as signal loss.
    fn read_channels(&mut self) -> Option<RadioChannelSet>;
}

/// Receiver that reports raw pulse widths in microseconds.
pub trait PulseWidthSource {
    fn read_pulse_widths(&mut self) -> Option<[u16; RADIO_CHANNELS]>;
}
