// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Hardware agnostic interfaces for overflow counters and deadline timers.
//!
//! Two layers meet here:
//!
//! - [`TimebaseDriver`] is implemented by chips. It models one hardware
//!   counter of fixed width behind a set of selectable prescalers, each
//!   described by a [`Timebase`]. The driver can start a full counter period,
//!   load a shorter final period, and mask or unmask its "tick elapsed"
//!   interrupt. It reports each overflow or compare match to its
//!   [`TickClient`].
//!
//! - [`DeadlineTimer`] is implemented by the deadline scheduler capsule on top
//!   of a `TimebaseDriver`. It accepts delays of any magnitude in microseconds
//!   or seconds and calls a [`DeadlineClient`] once (timeout) or repeatedly
//!   (interval).

use crate::utilities::math::div_round_half_up;
use crate::ErrorCode;

/// Trait to represent clock frequency in Hz
///
/// This trait is used as a type parameter of chip drivers so the tick rate of
/// every prescaler setting is derived from the actual input clock.
pub trait Frequency {
    /// Returns frequency in Hz.
    fn frequency() -> u32;
}

/// 16MHz `Frequency`
#[derive(Debug)]
pub struct Freq16MHz;
impl Frequency for Freq16MHz {
    fn frequency() -> u32 {
        16_000_000
    }
}

/// 8MHz `Frequency`
#[derive(Debug)]
pub struct Freq8MHz;
impl Frequency for Freq8MHz {
    fn frequency() -> u32 {
        8_000_000
    }
}

/// 1MHz `Frequency`
#[derive(Debug)]
pub struct Freq1MHz;
impl Frequency for Freq1MHz {
    fn frequency() -> u32 {
        1_000_000
    }
}

/// Unit of a requested delay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeUnit {
    Microseconds,
    Seconds,
}

impl TimeUnit {
    /// How many of this unit make up one second.
    pub const fn per_second(self) -> u64 {
        match self {
            TimeUnit::Microseconds => 1_000_000,
            TimeUnit::Seconds => 1,
        }
    }
}

/// How a driver shortens the final period of a deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reload {
    /// The counter counts up from a preloaded value and raises its event on
    /// overflow. A partial period of `r` ticks is loaded as `N - r`. After the
    /// overflow the counter free-runs full periods again.
    Preload,
    /// The counter counts up from zero and raises its event when it matches a
    /// top value, then restarts from zero. A partial period of `r` ticks sets
    /// the top to `r - 1`, which stays in effect until a full period is armed
    /// again.
    Compare,
}

/// Description of one prescaler setting of a hardware counter.
///
/// The tick rate is the rational `clock_hz / divisor`, so prescalers that do
/// not divide the input clock evenly lose no precision. The counter is
/// `counter_bits` wide, giving a full period of `N = 2^counter_bits` ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timebase {
    clock_hz: u32,
    divisor: u32,
    counter_bits: u8,
    reload: Reload,
}

impl Timebase {
    pub const fn new(clock_hz: u32, divisor: u32, counter_bits: u8, reload: Reload) -> Timebase {
        assert!(clock_hz > 0 && divisor > 0);
        assert!(counter_bits >= 1 && counter_bits <= 32);
        Timebase {
            clock_hz,
            divisor,
            counter_bits,
            reload,
        }
    }

    pub const fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    /// Prescaler divisor applied to `clock_hz`. Drivers use it to find the
    /// register setting that selects this timebase.
    pub const fn divisor(&self) -> u32 {
        self.divisor
    }

    pub const fn counter_bits(&self) -> u8 {
        self.counter_bits
    }

    pub const fn reload(&self) -> Reload {
        self.reload
    }

    /// Ticks in one full counter period, `N`.
    pub const fn period_ticks(&self) -> u64 {
        1 << self.counter_bits
    }

    /// Convert a duration to ticks of this timebase, rounding to the nearest
    /// tick with halves rounded up.
    ///
    /// The product is formed in 128 bits, so no `u64` duration at any 32-bit
    /// clock rate can overflow.
    pub fn ticks_from(&self, duration: u64, unit: TimeUnit) -> u128 {
        let numerator = duration as u128 * self.clock_hz as u128;
        let denominator = self.divisor as u128 * unit.per_second() as u128;
        div_round_half_up(numerator, denominator)
    }

    /// Counter value to preload so that the counter overflows after `ticks`
    /// ticks. `ticks` must be in `1..N`.
    pub fn preload_value(&self, ticks: u32) -> u32 {
        (self.period_ticks() - ticks as u64) as u32
    }

    /// Compare top value that makes a period last `ticks` ticks. `ticks` must
    /// be in `1..N`.
    pub fn compare_top(&self, ticks: u32) -> u32 {
        ticks - 1
    }

    /// Compare top value of a full period.
    pub fn full_period_top(&self) -> u32 {
        (self.period_ticks() - 1) as u32
    }

    /// Whether one tick of `self` is shorter than one tick of `other`.
    pub fn is_finer_than(&self, other: &Timebase) -> bool {
        // clock / divisor > other.clock / other.divisor
        self.clock_hz as u64 * other.divisor as u64 > other.clock_hz as u64 * self.divisor as u64
    }

    /// Whether one full period of `self` lasts longer than one of `other`.
    pub fn has_longer_period_than(&self, other: &Timebase) -> bool {
        // N * divisor / clock > other.N * other.divisor / other.clock
        let lhs = self.period_ticks() as u128 * self.divisor as u128 * other.clock_hz as u128;
        let rhs = other.period_ticks() as u128 * other.divisor as u128 * self.clock_hz as u128;
        lhs > rhs
    }
}

/// A client of an implementer of [`TimebaseDriver`].
pub trait TickClient {
    /// Called from interrupt context once for every counter overflow or
    /// compare match while events are enabled.
    fn tick_elapsed(&self);
}

/// A hardware counter that can time one deadline at a time.
///
/// All commands are issued with events disabled by the caller, except from
/// within [`TickClient::tick_elapsed`], which already runs with the counter
/// interrupt blocked.
pub trait TimebaseDriver<'a> {
    /// Set the client for elapsed-tick events.
    fn set_tick_client(&self, client: &'a dyn TickClient);

    /// Prescaler settings this counter supports. Must not be empty for a
    /// usable driver.
    fn timebases(&self) -> &[Timebase];

    /// Switch the counter to `timebase`, which is one of the entries returned
    /// by [`timebases`](TimebaseDriver::timebases), and restart it from zero
    /// with a full period of `N` ticks.
    fn configure(&self, timebase: &Timebase);

    /// Make the next period a full one of `N` ticks.
    ///
    /// Only the reload is changed. The counter is not restarted, so ticks
    /// counted since the last event are kept.
    fn arm_period(&self);

    /// Make the next period a final partial period of `ticks` ticks, with
    /// `ticks` in `1..N`.
    ///
    /// A compare counter only moves its top and keeps counting. A preload
    /// counter is loaded with `N - ticks`.
    fn load_partial(&self, ticks: u32);

    /// Stop delivering elapsed-tick events. The counter keeps counting.
    fn disable_events(&self);

    /// Resume delivering elapsed-tick events.
    fn enable_events(&self);

    /// Whether unmasking the event after [`configure`](TimebaseDriver::configure)
    /// immediately delivers one stale event that does not correspond to an
    /// elapsed period.
    ///
    /// Asked right after `configure`, before the first period is loaded. The
    /// scheduler arms one extra overflow unit when this returns `true` so the
    /// stale event is consumed without shortening the deadline.
    fn raises_event_on_arm(&self) -> bool {
        false
    }
}

/// State of a deadline timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Idle. No events are enabled and no callback will run.
    Off,
    /// Calls the client once, then returns to `Off`.
    Timeout,
    /// Calls the client every period until cleared or re-armed.
    Interval,
}

/// A client of an implementer of [`DeadlineTimer`].
pub trait DeadlineClient {
    /// Callback signaled when the deadline elapses. Runs in interrupt context,
    /// must not block, and may re-arm or clear the timer that called it.
    fn fired(&self);
}

/// A single-slot timer with arbitrarily long timeouts and intervals.
///
/// Arming always replaces whatever was armed before.
pub trait DeadlineTimer<'a> {
    /// Call `client` every `duration` units until cleared.
    ///
    /// Returns `INVAL` for a zero duration and `SIZE` for a duration the
    /// counter cannot represent. In both cases the timer ends up `Off`.
    fn set_interval(
        &self,
        client: &'a dyn DeadlineClient,
        duration: u64,
        unit: TimeUnit,
    ) -> Result<(), ErrorCode>;

    /// Call `client` once after `duration` units.
    ///
    /// Errors as for [`set_interval`](DeadlineTimer::set_interval).
    fn set_timeout(
        &self,
        client: &'a dyn DeadlineClient,
        duration: u64,
        unit: TimeUnit,
    ) -> Result<(), ErrorCode>;

    /// Cancel any armed timeout or interval. Idempotent. The client stays
    /// registered but will not be called until the timer is armed again.
    fn clear(&self);

    /// Current mode.
    fn mode(&self) -> Mode;

    /// Returns whether a timeout or interval is armed.
    fn is_armed(&self) -> bool {
        self.mode() != Mode::Off
    }

    fn set_interval_us(&self, client: &'a dyn DeadlineClient, us: u64) -> Result<(), ErrorCode> {
        self.set_interval(client, us, TimeUnit::Microseconds)
    }

    fn set_interval_s(&self, client: &'a dyn DeadlineClient, s: u64) -> Result<(), ErrorCode> {
        self.set_interval(client, s, TimeUnit::Seconds)
    }

    fn set_timeout_us(&self, client: &'a dyn DeadlineClient, us: u64) -> Result<(), ErrorCode> {
        self.set_timeout(client, us, TimeUnit::Microseconds)
    }

    fn set_timeout_s(&self, client: &'a dyn DeadlineClient, s: u64) -> Result<(), ErrorCode> {
        self.set_timeout(client, s, TimeUnit::Seconds)
    }
}
