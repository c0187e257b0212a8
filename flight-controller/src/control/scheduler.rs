//! Fixed cadence for the control loop.
//!
//! The timer interrupt raises an [`UpdateFlag`] and does nothing else. The main path polls
//! it and runs one control cycle each time it finds it raised.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

const US_IN_SECOND: u64 = 1_000_000;

/// Single-writer/single-reader pending flag shared between an interrupt and the main path.
///
/// Only atomic loads and stores are used, no read-modify-write, so it also works on cores
/// without compare-and-swap (thumbv6m). The overrun counter is written by the interrupt
/// side alone.
#[derive(Debug)]
pub struct UpdateFlag {
    pending: AtomicBool,
    overruns: AtomicU32,
}

impl UpdateFlag {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            overruns: AtomicU32::new(0),
        }
    }

    /// Interrupt side. A flag still raised from the previous period counts as an overrun.
    pub fn raise(&self) {
        if self.pending.load(Ordering::Relaxed) {
            let overruns = self.overruns.load(Ordering::Relaxed);
            self.overruns.store(overruns.saturating_add(1), Ordering::Relaxed);
        }
        self.pending.store(true, Ordering::Release);
    }

    /// Main side, test-and-clear. Everything written before the matching `raise` is visible.
    ///
    /// A raise landing between the load and the store is folded into this period, the
    /// interrupt has already counted it as an overrun.
    pub fn take(&self) -> bool {
        if !self.pending.load(Ordering::Acquire) {
            return false;
        }
        self.pending.store(false, Ordering::Relaxed);
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Relaxed)
    }

    /// Periods whose cycle never ran because the previous one was still pending.
    pub fn overruns(&self) -> u32 {
        self.overruns.load(Ordering::Relaxed)
    }
}

impl Default for UpdateFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Hardware timer that paces the loop, one counter overflow per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTimerConfig {
    pub clock_hz: u32,
    pub prescaler: u32,
    /// Counts until overflow, 256 for an 8 bit counter.
    pub counter_span: u32,
}

impl LoopTimerConfig {
    pub const fn new(clock_hz: u32, prescaler: u32, counter_span: u32) -> Self {
        Self {
            clock_hz,
            prescaler,
            counter_span,
        }
    }

    pub fn period_us(&self) -> u32 {
        if self.clock_hz == 0 {
            return 0;
        }
        let ticks = self.prescaler as u64 * self.counter_span as u64;
        (ticks * US_IN_SECOND / self.clock_hz as u64).min(u32::MAX as u64) as u32
    }

    /// Time base for the PID integral and derivative.
    pub fn period_seconds(&self) -> f32 {
        self.period_us() as f32 / US_IN_SECOND as f32
    }
}

pub struct Scheduler<'a> {
    flag: &'a UpdateFlag,
    timer: LoopTimerConfig,
}

impl<'a> Scheduler<'a> {
    pub fn new(flag: &'a UpdateFlag, timer: LoopTimerConfig) -> Self {
        Self { flag, timer }
    }

    /// Body of the timer overflow interrupt.
    pub fn on_timer_overflow(&self) {
        self.flag.raise();
    }

    /// True once per elapsed period.
    pub fn poll(&self) -> bool {
        self.flag.take()
    }

    pub fn period_seconds(&self) -> f32 {
        self.timer.period_seconds()
    }

    pub fn timer(&self) -> LoopTimerConfig {
        self.timer
    }

    pub fn overruns(&self) -> u32 {
        self.flag.overruns()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn flag_is_taken_once_per_raise() {
        let flag = UpdateFlag::new();
        assert!(!flag.take());

        flag.raise();
        assert!(flag.is_pending());
        assert!(flag.take());
        assert!(!flag.take());
        assert_eq!(flag.overruns(), 0);
    }

    #[test]
    fn missed_periods_are_counted() {
        let flag = UpdateFlag::new();
        flag.raise();
        flag.raise();
        flag.raise();

        assert!(flag.take());
        assert!(!flag.take());
        assert_eq!(flag.overruns(), 2);
    }

    #[test]
    fn timer_period_from_divider() {
        let timer = LoopTimerConfig::new(16_000_000, 64, 256);
        assert_eq!(timer.period_us(), 1024);
        assert!((timer.period_seconds() - 0.001024).abs() < 1e-8);

        let slow = LoopTimerConfig::new(16_000_000, 1024, 256);
        assert_eq!(slow.period_us(), 16_384);

        assert_eq!(LoopTimerConfig::new(0, 64, 256).period_us(), 0);
    }

    #[test]
    fn raise_from_another_context_is_seen_by_poll() {
        let flag = Arc::new(UpdateFlag::new());
        let interrupt_flag = Arc::clone(&flag);

        let interrupt = thread::spawn(move || {
            for _ in 0..1000 {
                interrupt_flag.raise();
            }
        });
        interrupt.join().unwrap();

        let scheduler = Scheduler::new(&flag, LoopTimerConfig::new(16_000_000, 64, 256));
        assert!(scheduler.poll());
        assert!(!scheduler.poll());
        assert_eq!(scheduler.overruns(), 999);
    }

    #[test]
    fn scheduler_overflow_raises_its_flag() {
        let flag = UpdateFlag::new();
        let scheduler = Scheduler::new(&flag, LoopTimerConfig::new(16_000_000, 64, 256));

        scheduler.on_timer_overflow();
        assert!(flag.is_pending());
        assert!(scheduler.poll());
    }
}
