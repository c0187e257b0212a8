use bitflags::bitflags;

pub const RADIO_CHANNELS: usize = 8;

bitflags! {
    /// Switch states decoded from the auxiliary channels.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AuxFlags: u8 {
        const ARMED = 0b0000_0001;
        /// Cascaded angle mode, sticks command attitude instead of rotation rate.
        const AUTO_LEVEL = 0b0000_0010;
    }
}

#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioChannel {
    Roll = 0,
    Pitch = 1,
    Throttle = 2,
    Yaw = 3,
    ArmSwitch = 4,
    FlightModeSwitch = 5,
    Aux3 = 6,
    Aux4 = 7,
}

/// Pilot input for one control cycle.
///
/// Every channel is normalized to `-1.0..=1.0` with the stick center at `0.0`,
/// throttle included. Use [`RadioChannelSet::throttle`] to get it as `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RadioChannelSet {
    pub channels: [f32; RADIO_CHANNELS],
    pub flags: AuxFlags,
}

impl RadioChannelSet {
    pub fn new(channels: [f32; RADIO_CHANNELS], flags: AuxFlags) -> Self {
        Self { channels, flags }
    }

    pub fn channel(&self, channel: RadioChannel) -> f32 {
        self.channels[channel as usize]
    }

    pub fn roll(&self) -> f32 {
        self.channel(RadioChannel::Roll)
    }

    pub fn pitch(&self) -> f32 {
        self.channel(RadioChannel::Pitch)
    }

    pub fn yaw(&self) -> f32 {
        self.channel(RadioChannel::Yaw)
    }

    pub fn throttle(&self) -> f32 {
        ((self.channel(RadioChannel::Throttle) + 1.0) / 2.0).clamp(0.0, 1.0)
    }

    pub fn is_armed(&self) -> bool {
        self.flags.contains(AuxFlags::ARMED)
    }

    pub fn auto_level(&self) -> bool {
        self.flags.contains(AuxFlags::AUTO_LEVEL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PIDTuneConfig {
    pub proportional_multiplier: f32,
    pub integral_multiplier: f32,
    pub derivative_multiplier: f32,
    pub max_accumulated_error: f32,
}

impl PIDTuneConfig {
    pub const fn new(
        proportional_multiplier: f32,
        integral_multiplier: f32,
        derivative_multiplier: f32,
        max_accumulated_error: f32,
    ) -> Self {
        Self {
            proportional_multiplier,
            integral_multiplier,
            derivative_multiplier,
            max_accumulated_error,
        }
    }
}
