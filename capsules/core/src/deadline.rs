// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Decomposition of a requested delay into hardware counter periods.
//!
//! A counter with a full period of `N` ticks cannot time a delay of `D >= N`
//! ticks in one go. The delay is split into `floor(D / N)` full periods
//! ("overflows") followed by one partial period of `D mod N` ticks (the
//! "remainder"). When `D < N` there are no overflows and the remainder is the
//! whole delay. When `D` is a multiple of `N` the remainder is zero and no
//! partial period is run.
//!
//! The remainder is kept in elapsed ticks. Drivers turn it into a register
//! value with [`Timebase::preload_value`] or [`Timebase::compare_top`],
//! depending on their reload convention.
//!
//! Before decomposing, a timebase is picked from the driver's prescaler list:
//! the finest one whose single period holds the whole delay, or, if the delay
//! is longer than every period, the one with the longest period.

use kernel::hil::time::{TimeUnit, Timebase};
use kernel::ErrorCode;

/// Largest number of full periods a deadline may span. One less than
/// `u32::MAX` so the compensation unit for drivers with a stale event on arm
/// still fits.
pub const MAX_OVERFLOWS: u32 = u32::MAX - 1;

/// A delay split into full counter periods and a final partial period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decomposition {
    overflows: u32,
    remainder: u32,
}

impl Decomposition {
    /// The empty decomposition, used before anything is armed.
    pub const ZERO: Decomposition = Decomposition {
        overflows: 0,
        remainder: 0,
    };

    /// Split `ticks` of `timebase` into periods.
    ///
    /// Returns `INVAL` for zero ticks and `SIZE` when more than
    /// [`MAX_OVERFLOWS`] periods would be needed.
    pub fn from_ticks(ticks: u128, timebase: &Timebase) -> Result<Decomposition, ErrorCode> {
        if ticks == 0 {
            return Err(ErrorCode::INVAL);
        }
        let period = timebase.period_ticks() as u128;
        let overflows = ticks / period;
        if overflows > MAX_OVERFLOWS as u128 {
            return Err(ErrorCode::SIZE);
        }
        Ok(Decomposition {
            overflows: overflows as u32,
            remainder: (ticks % period) as u32,
        })
    }

    /// Number of full periods.
    pub const fn overflows(&self) -> u32 {
        self.overflows
    }

    /// Ticks in the final partial period, `0` when the delay is a whole
    /// number of periods.
    pub const fn remainder(&self) -> u32 {
        self.remainder
    }

    /// Whether the delay fits in one partial period, so the remainder is
    /// loaded straight away.
    pub const fn fits_single_period(&self) -> bool {
        self.overflows == 0
    }

    /// Number of overflow units to count down when arming. A driver that
    /// raises a stale event on arm gets one extra unit, which that event
    /// consumes.
    pub const fn armed_overflows(&self, compensate: bool) -> u32 {
        if compensate {
            self.overflows + 1
        } else {
            self.overflows
        }
    }

    /// Total ticks this decomposition replays on `timebase`.
    pub fn total_ticks(&self, timebase: &Timebase) -> u64 {
        self.overflows as u64 * timebase.period_ticks() + self.remainder as u64
    }
}

/// A request resolved against a driver: the timebase to configure and the
/// delay split into periods of that timebase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Plan {
    pub timebase: Timebase,
    pub decomposition: Decomposition,
}

/// Pick the timebase for a delay and return it with the delay in its ticks.
///
/// Prefers the finest timebase that times the delay in a single partial
/// period. If none can, falls back to the timebase with the longest period.
/// A positive delay shorter than half a tick is rounded up to one tick.
/// Returns `None` only for an empty list.
pub fn select_timebase(
    timebases: &[Timebase],
    duration: u64,
    unit: TimeUnit,
) -> Option<(Timebase, u128)> {
    let mut single: Option<(Timebase, u128)> = None;
    let mut longest: Option<(Timebase, u128)> = None;

    for timebase in timebases {
        let ticks = timebase.ticks_from(duration, unit).max(1);
        if ticks < timebase.period_ticks() as u128
            && single.is_none_or(|(best, _)| timebase.is_finer_than(&best))
        {
            single = Some((*timebase, ticks));
        }
        if longest.is_none_or(|(best, _)| timebase.has_longer_period_than(&best)) {
            longest = Some((*timebase, ticks));
        }
    }

    single.or(longest)
}

/// Resolve a request against the prescalers a driver offers.
///
/// Returns `INVAL` for a zero duration, `NOSUPPORT` for a driver without
/// timebases and `SIZE` when the delay needs more than [`MAX_OVERFLOWS`]
/// periods even at the longest period.
pub fn plan(timebases: &[Timebase], duration: u64, unit: TimeUnit) -> Result<Plan, ErrorCode> {
    if duration == 0 {
        return Err(ErrorCode::INVAL);
    }
    let (timebase, ticks) =
        select_timebase(timebases, duration, unit).ok_or(ErrorCode::NOSUPPORT)?;
    let decomposition = Decomposition::from_ticks(ticks, &timebase)?;
    Ok(Plan {
        timebase,
        decomposition,
    })
}
