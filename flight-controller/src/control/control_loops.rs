use log::{debug, trace, warn};
use shared_definitions::controller::{PIDTuneConfig, RadioChannelSet};

use crate::{
    communication_interfaces::controller::RadioInput,
    config::{
        constants::{IDLE_MOTOR_POWER, MAX_MOTOR_POWER, MIN_MOTOR_POWER, PID_OUTPUT_SCALE},
        tuning::FlightControllerConfig,
    },
    control::{
        arming::{ArmTransition, ArmingState},
        flight_controllers::{
            AngleModeControllerInput, CascadedFlightController, RotationRateControllerInput,
        },
        pid::{PidAxis, PidBank},
        scheduler::Scheduler,
    },
    drivers::imu_sensors::{CombinedGyroscopeAccelerometer, ImuSample},
    inertial_measurement::{AttitudeEstimate, OrientationEstimator},
    output::{
        motors_state_manager::{MotorOutput, QuadcopterMotorsStateManager},
        vehicle_movement_mappers::{FlyingVehicleMovementMapper, MotorCommandSet, Quadcopter},
    },
    util::math::vectors::{RotationVector2D, RotationVector3D},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MainControlLoopOutCommands {
    /// No usable sample or no radio frame, motors were sent to idle.
    KillMotors,
    UpdateFlightState(FlightStabilizerOut),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightStabilizerOut {
    pub armed: bool,
    pub throttle: f32,
    pub attitude: AttitudeEstimate,
    pub rotation_output_command: RotationVector3D,
    /// What the motors were actually given, idle while disarmed.
    pub motor_command: MotorCommandSet,
}

/// One fixed-period cycle: sample, estimate, stabilize, rate control, mix and output.
pub struct ControlLoop<S, R, M>
where
    S: CombinedGyroscopeAccelerometer,
    R: RadioInput,
    M: MotorOutput,
{
    imu: S,
    estimator: OrientationEstimator,
    radio: R,
    motors: QuadcopterMotorsStateManager<M>,
    mixer: Quadcopter,
    flight_controller: CascadedFlightController,
    arming: ArmingState,
    config: FlightControllerConfig,
    iteration_time: f32,
    last_sample: Option<ImuSample>,
    stale_cycles: u8,
    last_transition: ArmTransition,
}

impl<S, R, M> ControlLoop<S, R, M>
where
    S: CombinedGyroscopeAccelerometer,
    R: RadioInput,
    M: MotorOutput,
{
    pub fn new(
        imu: S,
        estimator: OrientationEstimator,
        radio: R,
        motors: M,
        config: FlightControllerConfig,
    ) -> Self {
        Self {
            imu,
            estimator,
            radio,
            motors: QuadcopterMotorsStateManager::new(motors, IDLE_MOTOR_POWER, MAX_MOTOR_POWER),
            mixer: Quadcopter::new(MIN_MOTOR_POWER, MAX_MOTOR_POWER, PID_OUTPUT_SCALE),
            flight_controller: CascadedFlightController::new(
                &config.pid_tunes,
                config.max_rotation_rate,
            ),
            arming: ArmingState::default(),
            iteration_time: config.loop_timer.period_seconds(),
            config,
            last_sample: None,
            stale_cycles: 0,
            last_transition: ArmTransition::None,
        }
    }

    /// Runs one cycle per timer period, forever.
    pub fn run(&mut self, scheduler: &Scheduler) -> ! {
        self.follow_scheduler(scheduler);
        loop {
            if scheduler.poll() {
                self.run_cycle();
            } else {
                core::hint::spin_loop();
            }
        }
    }

    /// Takes the PID time base from the timer that paces the cycles.
    pub fn follow_scheduler(&mut self, scheduler: &Scheduler) {
        self.config.loop_timer = scheduler.timer();
        self.iteration_time = scheduler.period_seconds();
    }

    pub fn iteration_time(&self) -> f32 {
        self.iteration_time
    }

    pub fn run_cycle(&mut self) -> MainControlLoopOutCommands {
        let sample = self.acquire_sample();
        let radio_input = self.radio.read_channels();

        // Arming needs a fresh sample, an armed aircraft rides out the stale window.
        let sample_usable = sample.is_some() && (self.stale_cycles == 0 || self.arming.is_armed());
        let transition = match radio_input {
            Some(channels) => {
                self.arming.signal_restored();
                self.arming.update(
                    channels.is_armed(),
                    channels.throttle(),
                    self.config.arm_throttle_threshold,
                    self.imu.is_ready() && sample_usable,
                )
            }
            None => self.arming.signal_loss(),
        };
        if matches!(transition, ArmTransition::Armed | ArmTransition::Disarmed) {
            self.flight_controller.reset();
        }
        self.last_transition = transition;

        let (Some(sample), Some(channels)) = (sample, radio_input) else {
            self.arming.disarm();
            self.flight_controller.reset();
            self.motors.kill_motors();
            return MainControlLoopOutCommands::KillMotors;
        };

        let armed = self.arming.is_armed();
        let attitude = self.estimator.estimate(&sample);
        let throttle = channels.throttle() * self.config.max_throttle;
        let rotation_output_command = self.stabilize(&attitude, &channels);

        let command = self
            .mixer
            .map_controller_output_to_actuators_input(throttle, rotation_output_command);
        self.motors.set_motor_power(command, armed);

        if !armed {
            // Nothing may wind up while the aircraft sits on the ground.
            self.flight_controller.reset();
        }

        trace!(
            "Attitude {:?} correction {:?} motors {:?}",
            attitude,
            rotation_output_command,
            self.motors.last_command()
        );

        MainControlLoopOutCommands::UpdateFlightState(FlightStabilizerOut {
            armed,
            throttle,
            attitude,
            rotation_output_command,
            motor_command: self.motors.last_command(),
        })
    }

    fn acquire_sample(&mut self) -> Option<ImuSample> {
        match self.imu.update_cached_sample() {
            Ok(sample) => {
                let (accel_range, gyro_range) = self.imu.ranges();
                self.estimator.set_ranges(accel_range, gyro_range);
                self.stale_cycles = 0;
                self.last_sample = Some(sample);
                Some(sample)
            }
            Err(read_error) => {
                self.stale_cycles = self.stale_cycles.saturating_add(1);
                if self.stale_cycles > self.config.max_stale_cycles {
                    if self.last_sample.take().is_some() {
                        warn!(
                            "IMU read failed {} times in a row: {:?}",
                            self.stale_cycles, read_error
                        );
                    }
                    return None;
                }
                debug!("IMU read failed, reusing previous sample: {:?}", read_error);
                self.last_sample
            }
        }
    }

    fn stabilize(
        &mut self,
        attitude: &AttitudeEstimate,
        channels: &RadioChannelSet,
    ) -> RotationVector3D {
        let desired_yaw_rate = channels.yaw() * self.config.max_yaw_rate;

        let desired_rotation_rate = if channels.auto_level() {
            let desired_rotation = RotationVector2D {
                roll: channels.roll() * self.config.max_inclination,
                pitch: channels.pitch() * self.config.max_inclination,
            };
            let desired_rate_2d =
                self.flight_controller
                    .get_stabilize_output(AngleModeControllerInput {
                        desired_rotation,
                        measured_rotation: attitude.angles(),
                        iteration_time: self.iteration_time,
                    });
            RotationVector3D::from_2d(&desired_rate_2d, desired_yaw_rate)
        } else {
            self.flight_controller.reset_stabilize();
            RotationVector3D {
                roll: channels.roll() * self.config.max_rotation_rate,
                pitch: channels.pitch() * self.config.max_rotation_rate,
                yaw: desired_yaw_rate,
            }
        };

        self.flight_controller
            .get_rotation_rate_output(RotationRateControllerInput {
                desired_rotation_rate,
                measured_rotation_rate: attitude.rates,
                iteration_time: self.iteration_time,
            })
    }

    pub fn set_pid_tune(&mut self, axis: PidAxis, tune: PIDTuneConfig) {
        self.config.pid_tunes[axis as usize] = tune;
        self.flight_controller.set_pid_tune(axis, &tune);
    }

    pub fn is_armed(&self) -> bool {
        self.arming.is_armed()
    }

    pub fn last_transition(&self) -> ArmTransition {
        self.last_transition
    }

    pub fn pids(&self) -> &PidBank {
        self.flight_controller.pids()
    }

    pub fn config(&self) -> &FlightControllerConfig {
        &self.config
    }

    pub fn imu(&self) -> &S {
        &self.imu
    }

    pub fn imu_mut(&mut self) -> &mut S {
        &mut self.imu
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn motors(&self) -> &M {
        self.motors.output()
    }
}

#[cfg(test)]
mod tests {
    use shared_definitions::controller::{AuxFlags, RADIO_CHANNELS};

    use super::*;
    use crate::drivers::mock_bus::{MockDelay, MockMpuBus};
    use crate::control::scheduler::{LoopTimerConfig, UpdateFlag};
    use crate::drivers::mpu_6050::{
        registers::{MpuGyroRange, DEFAULT_SLAVE_ADDR},
        MPU6050Sensor,
    };
    use crate::inertial_measurement::GyroCorrections;
    use crate::util::error::ArmError;

    struct FixedRadio {
        channels: Option<RadioChannelSet>,
    }

    impl RadioInput for FixedRadio {
        fn read_channels(&mut self) -> Option<RadioChannelSet> {
            self.channels
        }
    }

    #[derive(Default)]
    struct RecordingMotors {
        writes: std::vec::Vec<[f32; 4]>,
    }

    impl MotorOutput for RecordingMotors {
        fn set_motor_power(&mut self, values: [f32; 4]) {
            self.writes.push(values);
        }
    }

    type TestLoop = ControlLoop<MPU6050Sensor<MockMpuBus>, FixedRadio, RecordingMotors>;

    const ONE_G: i16 = 16_384;

    fn sticks(roll: f32, pitch: f32, throttle: f32, yaw: f32, flags: AuxFlags) -> RadioChannelSet {
        let mut channels = [-1.0_f32; RADIO_CHANNELS];
        channels[0] = roll;
        channels[1] = pitch;
        channels[2] = throttle;
        channels[3] = yaw;
        RadioChannelSet::new(channels, flags)
    }

    fn centered(flags: AuxFlags) -> RadioChannelSet {
        sticks(0.0, 0.0, -1.0, 0.0, flags)
    }

    fn configured_sensor() -> MPU6050Sensor<MockMpuBus> {
        let mut bus = MockMpuBus::new(DEFAULT_SLAVE_ADDR);
        bus.set_measurements([0, 0, ONE_G], 0, [0, 0, 0]);
        let mut sensor = MPU6050Sensor::new(bus);
        sensor.configure(&mut MockDelay::default()).unwrap();
        sensor
    }

    fn build_loop(
        sensor: MPU6050Sensor<MockMpuBus>,
        radio: Option<RadioChannelSet>,
    ) -> TestLoop {
        let estimator = OrientationEstimator::new(sensor.accel_range(), sensor.gyro_range())
            .with_corrections(GyroCorrections::NONE);
        ControlLoop::new(
            sensor,
            estimator,
            FixedRadio { channels: radio },
            RecordingMotors::default(),
            FlightControllerConfig::default(),
        )
    }

    fn flight_state(command: MainControlLoopOutCommands) -> FlightStabilizerOut {
        match command {
            MainControlLoopOutCommands::UpdateFlightState(state) => state,
            MainControlLoopOutCommands::KillMotors => panic!("motors were killed"),
        }
    }

    #[test]
    fn level_aircraft_at_rest_commands_no_correction() {
        let mut control_loop = build_loop(
            configured_sensor(),
            Some(centered(AuxFlags::ARMED | AuxFlags::AUTO_LEVEL)),
        );

        for _ in 0..200 {
            let state = flight_state(control_loop.run_cycle());
            assert!(state.armed);
            assert_eq!(state.attitude.roll, 0.0);
            assert_eq!(state.attitude.pitch, 0.0);
            assert_eq!(state.rotation_output_command, RotationVector3D::default());
            for (_, pid) in control_loop.pids().iter() {
                assert_eq!(pid.last_output(), 0.0);
                assert_eq!(pid.accumulated_error(), 0.0);
            }
        }
        let last = control_loop.motors().writes.last().copied().unwrap();
        assert_eq!(last, [MIN_MOTOR_POWER; 4]);
    }

    #[test]
    fn disarmed_forces_idle_whatever_the_correction() {
        let mut sensor = configured_sensor();
        sensor
            .bus_mut()
            .set_measurements([0, ONE_G / 2, ONE_G], 0, [3000, -3000, 500]);
        let mut control_loop = build_loop(
            sensor,
            Some(sticks(0.8, -0.6, 0.6, 0.4, AuxFlags::AUTO_LEVEL)),
        );

        for _ in 0..20 {
            let state = flight_state(control_loop.run_cycle());
            assert!(!state.armed);
            assert!(state.rotation_output_command.roll.abs() > 1.0);
            assert!(state.rotation_output_command.pitch.abs() > 1.0);
            assert_eq!(state.motor_command, MotorCommandSet::from(IDLE_MOTOR_POWER));
        }
        assert!(control_loop
            .motors()
            .writes
            .iter()
            .all(|values| *values == [IDLE_MOTOR_POWER; 4]));
    }

    #[test]
    fn arming_is_refused_when_the_imu_is_not_ready() {
        let sensor = MPU6050Sensor::new(MockMpuBus::new(DEFAULT_SLAVE_ADDR));
        let mut control_loop = build_loop(sensor, Some(centered(AuxFlags::ARMED)));

        assert_eq!(control_loop.run_cycle(), MainControlLoopOutCommands::KillMotors);
        assert_eq!(
            control_loop.last_transition(),
            ArmTransition::Refused(ArmError::SensorNotReady)
        );
        assert!(!control_loop.is_armed());
        assert_eq!(control_loop.motors().writes, vec![[IDLE_MOTOR_POWER; 4]]);
    }

    #[test]
    fn arming_is_refused_with_throttle_up() {
        let mut control_loop = build_loop(
            configured_sensor(),
            Some(sticks(0.0, 0.0, 0.0, 0.0, AuxFlags::ARMED)),
        );
        let state = flight_state(control_loop.run_cycle());
        assert!(!state.armed);
        assert_eq!(
            control_loop.last_transition(),
            ArmTransition::Refused(ArmError::ThrottleNotIdle)
        );
    }

    #[test]
    fn stale_samples_are_reused_then_motors_are_cut() {
        let mut control_loop = build_loop(
            configured_sensor(),
            Some(centered(AuxFlags::ARMED | AuxFlags::AUTO_LEVEL)),
        );
        assert!(flight_state(control_loop.run_cycle()).armed);

        control_loop.imu_mut().bus_mut().fail_reads(true);
        let max_stale = control_loop.config().max_stale_cycles;
        for _ in 0..max_stale {
            assert!(flight_state(control_loop.run_cycle()).armed);
        }
        assert_eq!(control_loop.run_cycle(), MainControlLoopOutCommands::KillMotors);
        assert!(!control_loop.is_armed());
        assert_eq!(control_loop.last_transition(), ArmTransition::Disarmed);

        // Sensor back, the switch has to be cycled before arming again.
        control_loop.imu_mut().bus_mut().fail_reads(false);
        assert!(!flight_state(control_loop.run_cycle()).armed);
        control_loop.radio_mut().channels = Some(centered(AuxFlags::AUTO_LEVEL));
        control_loop.run_cycle();
        control_loop.radio_mut().channels =
            Some(centered(AuxFlags::ARMED | AuxFlags::AUTO_LEVEL));
        assert!(flight_state(control_loop.run_cycle()).armed);
    }

    #[test]
    fn radio_loss_disarms() {
        let mut control_loop = build_loop(
            configured_sensor(),
            Some(centered(AuxFlags::ARMED | AuxFlags::AUTO_LEVEL)),
        );
        assert!(flight_state(control_loop.run_cycle()).armed);

        control_loop.radio_mut().channels = None;
        assert_eq!(control_loop.run_cycle(), MainControlLoopOutCommands::KillMotors);
        assert!(!control_loop.is_armed());
        assert_eq!(
            control_loop.motors().writes.last(),
            Some(&[IDLE_MOTOR_POWER; 4])
        );
    }

    #[test]
    fn rate_mode_follows_sticks_and_idles_the_outer_stage() {
        let mut control_loop = build_loop(configured_sensor(), Some(centered(AuxFlags::ARMED)));
        assert!(flight_state(control_loop.run_cycle()).armed);

        control_loop.radio_mut().channels = Some(sticks(0.5, 0.0, -1.0, 0.0, AuxFlags::ARMED));
        let state = flight_state(control_loop.run_cycle());

        assert!(state.armed);
        // Roll rate error of 37.5 °/s through P = 0.5, plus the integral clamped at 0.5.
        assert!((state.rotation_output_command.roll - (37.5 * 0.5 + 0.5)).abs() < 1e-4);
        for axis in PidAxis::STABILIZE {
            assert_eq!(control_loop.pids()[axis].last_output(), 0.0);
        }
        let motors = state.motor_command;
        assert!(motors.motor_front_left > motors.motor_front_right);
        assert!(motors.motor_rear_left > motors.motor_rear_right);
    }

    #[test]
    fn estimator_follows_a_range_change() {
        let mut control_loop =
            build_loop(configured_sensor(), Some(centered(AuxFlags::AUTO_LEVEL)));
        control_loop.run_cycle();

        let sensor = control_loop.imu_mut();
        sensor.set_gyro_range(MpuGyroRange::Deg2000).unwrap();
        sensor.calibrate(&mut MockDelay::default()).unwrap();
        // 164 counts at 16.4 LSB per °/s.
        sensor.bus_mut().queue_measurement([0, 0, ONE_G], 0, [164, 0, 0]);

        let state = flight_state(control_loop.run_cycle());
        assert!((state.attitude.rates.roll - 10.0).abs() < 1e-4);
    }

    #[test]
    fn arming_waits_for_a_fresh_sample() {
        let mut control_loop =
            build_loop(configured_sensor(), Some(centered(AuxFlags::AUTO_LEVEL)));
        control_loop.run_cycle();

        control_loop.imu_mut().bus_mut().fail_reads(true);
        control_loop.radio_mut().channels = Some(centered(AuxFlags::ARMED | AuxFlags::AUTO_LEVEL));
        let state = flight_state(control_loop.run_cycle());
        assert!(!state.armed);
        assert_eq!(
            control_loop.last_transition(),
            ArmTransition::Refused(ArmError::SensorNotReady)
        );

        control_loop.imu_mut().bus_mut().fail_reads(false);
        control_loop.radio_mut().channels = Some(centered(AuxFlags::AUTO_LEVEL));
        control_loop.run_cycle();
        control_loop.radio_mut().channels = Some(centered(AuxFlags::ARMED | AuxFlags::AUTO_LEVEL));
        assert!(flight_state(control_loop.run_cycle()).armed);
    }

    #[test]
    fn pid_time_base_follows_the_scheduler() {
        let mut control_loop = build_loop(configured_sensor(), Some(centered(AuxFlags::ARMED)));
        let flag = UpdateFlag::new();
        let slow_timer = LoopTimerConfig::new(16_000_000, 1024, 256);
        let scheduler = Scheduler::new(&flag, slow_timer);

        control_loop.follow_scheduler(&scheduler);
        assert_eq!(control_loop.iteration_time(), scheduler.period_seconds());
        assert_eq!(control_loop.config().loop_timer, slow_timer);
    }

    #[test]
    fn tuning_changes_the_next_cycle() {
        let mut control_loop = build_loop(
            configured_sensor(),
            Some(sticks(0.0, 0.0, -1.0, 1.0, AuxFlags::ARMED)),
        );
        control_loop.run_cycle();
        control_loop.set_pid_tune(PidAxis::RateYaw, PIDTuneConfig::new(0.0, 0.0, 0.0, 0.0));

        let state = flight_state(control_loop.run_cycle());
        assert_eq!(state.rotation_output_command.yaw, 0.0);
        assert_eq!(
            control_loop.config().tune(PidAxis::RateYaw),
            PIDTuneConfig::new(0.0, 0.0, 0.0, 0.0)
        );
    }
}
