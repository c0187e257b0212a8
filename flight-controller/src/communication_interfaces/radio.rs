use log::{info, warn};
use shared_definitions::controller::{AuxFlags, RadioChannel, RadioChannelSet, RADIO_CHANNELS};

use super::controller::{PulseWidthSource, RadioInput};

pub const CHANNEL_MIN_POINT: u16 = 1000;
pub const CHANNEL_MAX_POINT: u16 = 2000;
/// Narrower sweeps are treated as a channel that was not moved during calibration.
pub const MIN_CALIBRATION_SPAN_US: u16 = 200;
/// Normalized position above which a switch counts as on.
pub const AUX_SWITCH_ON_THRESHOLD: f32 = 0.5;

/// Pulse width endpoints of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRange {
    pub min: u16,
    pub max: u16,
}

impl ChannelRange {
    pub const NOMINAL: Self = Self {
        min: CHANNEL_MIN_POINT,
        max: CHANNEL_MAX_POINT,
    };

    pub fn span(&self) -> u16 {
        self.max.saturating_sub(self.min)
    }

    /// Maps the pulse width to `-1.0..=1.0` with the midpoint at `0.0`.
    pub fn normalize(&self, pulse_width: u16) -> f32 {
        let half_span = self.span() as f32 / 2.0;
        if half_span <= 0.0 {
            return 0.0;
        }
        let center = (self.min as f32 + self.max as f32) / 2.0;
        ((pulse_width as f32 - center) / half_span).clamp(-1.0, 1.0)
    }
}

impl Default for ChannelRange {
    fn default() -> Self {
        Self::NOMINAL
    }
}

/// Per-channel endpoints learned by sweeping every stick and switch to both ends.
#[derive(Debug, Clone, PartialEq)]
pub struct RadioCalibration {
    ranges: [ChannelRange; RADIO_CHANNELS],
    observed: Option<[ChannelRange; RADIO_CHANNELS]>,
}

impl Default for RadioCalibration {
    fn default() -> Self {
        Self {
            ranges: [ChannelRange::NOMINAL; RADIO_CHANNELS],
            observed: None,
        }
    }
}

impl RadioCalibration {
    pub fn start(&mut self) {
        info!("Radio calibration started, move every stick and switch to both ends");
        self.observed = Some(
            [ChannelRange {
                min: u16::MAX,
                max: u16::MIN,
            }; RADIO_CHANNELS],
        );
    }

    pub fn is_recording(&self) -> bool {
        self.observed.is_some()
    }

    pub fn record(&mut self, pulse_widths: &[u16; RADIO_CHANNELS]) {
        if let Some(observed) = self.observed.as_mut() {
            for (range, pulse_width) in observed.iter_mut().zip(pulse_widths) {
                range.min = range.min.min(*pulse_width);
                range.max = range.max.max(*pulse_width);
            }
        }
    }

    /// Keeps the observed endpoints of every channel that moved far enough, the rest fall
    /// back to the nominal range. Returns how many channels were calibrated.
    pub fn finish(&mut self) -> usize {
        let Some(observed) = self.observed.take() else {
            return 0;
        };

        let mut calibrated = 0;
        for (index, (range, seen)) in self.ranges.iter_mut().zip(observed).enumerate() {
            if seen.span() >= MIN_CALIBRATION_SPAN_US {
                *range = seen;
                calibrated += 1;
            } else {
                warn!("Radio channel {} barely moved, keeping nominal range", index);
                *range = ChannelRange::NOMINAL;
            }
        }
        info!("Radio calibration done, {} channels calibrated", calibrated);
        calibrated
    }

    pub fn range(&self, channel: RadioChannel) -> ChannelRange {
        self.ranges[channel as usize]
    }

    /// Normalizes every channel and derives the switch flags.
    pub fn map_pulse_widths(&self, pulse_widths: &[u16; RADIO_CHANNELS]) -> RadioChannelSet {
        let mut channels = [0.0_f32; RADIO_CHANNELS];
        for (index, value) in channels.iter_mut().enumerate() {
            *value = self.ranges[index].normalize(pulse_widths[index]);
        }

        let mut flags = AuxFlags::empty();
        flags.set(
            AuxFlags::ARMED,
            channels[RadioChannel::ArmSwitch as usize] > AUX_SWITCH_ON_THRESHOLD,
        );
        flags.set(
            AuxFlags::AUTO_LEVEL,
            channels[RadioChannel::FlightModeSwitch as usize] > AUX_SWITCH_ON_THRESHOLD,
        );
        RadioChannelSet::new(channels, flags)
    }
}

/// Turns a pulse width receiver into [`RadioInput`].
pub struct CalibratedRadio<S>
where
    S: PulseWidthSource,
{
    source: S,
    calibration: RadioCalibration,
}

impl<S> CalibratedRadio<S>
where
    S: PulseWidthSource,
{
    pub fn new(source: S) -> Self {
        Self::with_calibration(source, RadioCalibration::default())
    }

    pub fn with_calibration(source: S, calibration: RadioCalibration) -> Self {
        Self {
            source,
            calibration,
        }
    }

    pub fn calibration(&self) -> &RadioCalibration {
        &self.calibration
    }

    pub fn calibration_mut(&mut self) -> &mut RadioCalibration {
        &mut self.calibration
    }
}

impl<S> RadioInput for CalibratedRadio<S>
where
    S: PulseWidthSource,
{
    fn read_channels(&mut self) -> Option<RadioChannelSet> {
        let pulse_widths = self.source.read_pulse_widths()?;
        if self.calibration.is_recording() {
            self.calibration.record(&pulse_widths);
            // Sweeping the switches must not arm anything.
            let mut channels = self.calibration.map_pulse_widths(&pulse_widths);
            channels.flags = AuxFlags::empty();
            return Some(channels);
        }
        Some(self.calibration.map_pulse_widths(&pulse_widths))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    struct ScriptedReceiver {
        frames: VecDeque<Option<[u16; RADIO_CHANNELS]>>,
    }

    impl PulseWidthSource for ScriptedReceiver {
        fn read_pulse_widths(&mut self) -> Option<[u16; RADIO_CHANNELS]> {
            self.frames.pop_front().flatten()
        }
    }

    const CENTERED: [u16; RADIO_CHANNELS] = [1500, 1500, 1000, 1500, 1000, 1000, 1000, 1000];

    #[test]
    fn nominal_range_maps_to_unit_interval() {
        let range = ChannelRange::NOMINAL;
        assert!((range.normalize(1000) + 1.0).abs() < 1e-4);
        assert!(range.normalize(1500).abs() < 1e-4);
        assert!((range.normalize(1750) - 0.5).abs() < 1e-4);
        assert!((range.normalize(2000) - 1.0).abs() < 1e-4);
        assert!((range.normalize(2300) - 1.0).abs() < 1e-4);
        assert!((range.normalize(0) + 1.0).abs() < 1e-4);
    }

    #[test]
    fn switches_become_flags() {
        let calibration = RadioCalibration::default();
        let mut pulses = CENTERED;
        assert_eq!(calibration.map_pulse_widths(&pulses).flags, AuxFlags::empty());

        pulses[RadioChannel::ArmSwitch as usize] = 2000;
        pulses[RadioChannel::FlightModeSwitch as usize] = 1900;
        let channels = calibration.map_pulse_widths(&pulses);
        assert!(channels.is_armed());
        assert!(channels.auto_level());
        assert!(channels.throttle().abs() < 1e-4);
        assert!(channels.roll().abs() < 1e-4);
    }

    #[test]
    fn calibration_uses_observed_endpoints() {
        let mut calibration = RadioCalibration::default();
        calibration.start();
        calibration.record(&[1100, 1500, 1050, 1500, 990, 1500, 1500, 1500]);
        calibration.record(&[1900, 1510, 1950, 1500, 2010, 1500, 1500, 1500]);

        assert_eq!(calibration.finish(), 3);
        assert!(!calibration.is_recording());
        assert_eq!(
            calibration.range(RadioChannel::Roll),
            ChannelRange {
                min: 1100,
                max: 1900
            }
        );
        // Pitch moved 10 µs only.
        assert_eq!(calibration.range(RadioChannel::Pitch), ChannelRange::NOMINAL);

        let channels =
            calibration.map_pulse_widths(&[1900, 1500, 1500, 1500, 1000, 1000, 1000, 1000]);
        assert!((channels.roll() - 1.0).abs() < 1e-4);
        assert!((channels.throttle() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn finish_without_start_changes_nothing() {
        let mut calibration = RadioCalibration::default();
        calibration.record(&[1200; RADIO_CHANNELS]);
        assert_eq!(calibration.finish(), 0);
        assert_eq!(calibration, RadioCalibration::default());
    }

    #[test]
    fn radio_reports_signal_loss_and_never_arms_while_calibrating() {
        let mut armed = CENTERED;
        armed[RadioChannel::ArmSwitch as usize] = 2000;
        let mut radio = CalibratedRadio::new(ScriptedReceiver {
            frames: VecDeque::from([None, Some(armed), Some(armed)]),
        });

        assert_eq!(radio.read_channels(), None);

        radio.calibration_mut().start();
        assert!(!radio.read_channels().unwrap().is_armed());

        radio.calibration_mut().finish();
        assert!(radio.read_channels().unwrap().is_armed());
    }
}
