// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Timer/Counter2 as an 8-bit overflow timebase.
//!
//! The counter runs in normal mode from the internal I/O clock and raises
//! TIMER2_OVF when it wraps from 0xFF to 0x00. A shorter final period is
//! produced by preloading TCNT2 with `256 - ticks`.
//!
//! TOV2 keeps getting set while the overflow interrupt is masked, so when
//! TOIE2 is set again the pending flag is serviced at once. That stale event
//! is reported through `raises_event_on_arm`.

use core::cell::Cell;
use core::marker::PhantomData;

use kernel::hil::time::{Frequency, Reload, TickClient, Timebase, TimebaseDriver};
use kernel::utilities::registers::interfaces::{ReadWriteable, Readable, Writeable};
use kernel::utilities::registers::{register_bitfields, register_structs, ReadWrite};
use kernel::utilities::StaticRef;

register_structs! {
    pub Timer2Registers {
        /// Timer/Counter2 control register A
        (0x00 => tccr2a: ReadWrite<u8, TCCR2A::Register>),
        /// Timer/Counter2 control register B
        (0x01 => tccr2b: ReadWrite<u8, TCCR2B::Register>),
        /// Timer/Counter2 counter value
        (0x02 => tcnt2: ReadWrite<u8>),
        /// Output compare register A
        (0x03 => ocr2a: ReadWrite<u8>),
        /// Output compare register B
        (0x04 => ocr2b: ReadWrite<u8>),
        (0x05 => _reserved0),
        /// Asynchronous status register
        (0x06 => assr: ReadWrite<u8, ASSR::Register>),
        (0x07 => @END),
    },

    pub Timer2InterruptMask {
        (0x00 => timsk2: ReadWrite<u8, TIMSK2::Register>),
        (0x01 => @END),
    },

    pub Timer2InterruptFlags {
        /// Flags are cleared by writing a one.
        (0x00 => tifr2: ReadWrite<u8, TIFR2::Register>),
        (0x01 => @END),
    }
}

register_bitfields![u8,
    TCCR2A [
        /// Compare match output A mode
        COM2A OFFSET(6) NUMBITS(2) [],
        /// Compare match output B mode
        COM2B OFFSET(4) NUMBITS(2) [],
        /// Waveform generation mode, low bits
        WGM2 OFFSET(0) NUMBITS(2) [
            Normal = 0,
            PhaseCorrectPwm = 1,
            ClearOnCompare = 2,
            FastPwm = 3
        ]
    ],
    TCCR2B [
        /// Force output compare A
        FOC2A OFFSET(7) NUMBITS(1) [],
        /// Force output compare B
        FOC2B OFFSET(6) NUMBITS(1) [],
        /// Waveform generation mode, high bit
        WGM22 OFFSET(3) NUMBITS(1) [],
        /// Clock select
        CS2 OFFSET(0) NUMBITS(3) [
            Stopped = 0,
            Div1 = 1,
            Div8 = 2,
            Div32 = 3,
            Div64 = 4,
            Div128 = 5,
            Div256 = 6,
            Div1024 = 7
        ]
    ],
    ASSR [
        /// Enable external clock input
        EXCLK OFFSET(6) NUMBITS(1) [],
        /// Clock from the TOSC1 crystal instead of the I/O clock
        AS2 OFFSET(5) NUMBITS(1) [],
        TCN2UB OFFSET(4) NUMBITS(1) []
    ],
    TIMSK2 [
        OCIE2B OFFSET(2) NUMBITS(1) [],
        OCIE2A OFFSET(1) NUMBITS(1) [],
        /// Overflow interrupt enable
        TOIE2 OFFSET(0) NUMBITS(1) []
    ],
    TIFR2 [
        OCF2B OFFSET(2) NUMBITS(1) [],
        OCF2A OFFSET(1) NUMBITS(1) [],
        /// Overflow flag
        TOV2 OFFSET(0) NUMBITS(1) []
    ]
];

// Data memory addresses.
pub const TIMER2_BASE: StaticRef<Timer2Registers> =
    unsafe { StaticRef::new(0xB0 as *const Timer2Registers) };
pub const TIMSK2_BASE: StaticRef<Timer2InterruptMask> =
    unsafe { StaticRef::new(0x70 as *const Timer2InterruptMask) };
pub const TIFR2_BASE: StaticRef<Timer2InterruptFlags> =
    unsafe { StaticRef::new(0x37 as *const Timer2InterruptFlags) };

/// Prescaler divisors in CS2 order, starting at `Div1`.
const PRESCALERS: [u32; 7] = [1, 8, 32, 64, 128, 256, 1024];

const COUNTER_BITS: u8 = 8;

pub struct Timer2<'a, F: Frequency> {
    registers: StaticRef<Timer2Registers>,
    mask: StaticRef<Timer2InterruptMask>,
    flags: StaticRef<Timer2InterruptFlags>,
    timebases: [Timebase; 7],
    timebase: Cell<Timebase>,
    client: Cell<Option<&'a dyn TickClient>>,
    _frequency: PhantomData<F>,
}

impl<'a, F: Frequency> Timer2<'a, F> {
    pub fn new(
        registers: StaticRef<Timer2Registers>,
        mask: StaticRef<Timer2InterruptMask>,
        flags: StaticRef<Timer2InterruptFlags>,
    ) -> Timer2<'a, F> {
        let clock = F::frequency();
        let timebases =
            PRESCALERS.map(|divisor| Timebase::new(clock, divisor, COUNTER_BITS, Reload::Preload));
        Timer2 {
            registers,
            mask,
            flags,
            timebases,
            timebase: Cell::new(timebases[0]),
            client: Cell::new(None),
            _frequency: PhantomData,
        }
    }

    /// Service TIMER2_OVF.
    pub fn handle_interrupt(&self) {
        self.flags.tifr2.write(TIFR2::TOV2::SET);
        if let Some(client) = self.client.get() {
            client.tick_elapsed();
        }
    }
}

impl<'a, F: Frequency> TimebaseDriver<'a> for Timer2<'a, F> {
    fn set_tick_client(&self, client: &'a dyn TickClient) {
        self.client.set(Some(client));
    }

    fn timebases(&self) -> &[Timebase] {
        &self.timebases
    }

    fn configure(&self, timebase: &Timebase) {
        let Some(index) = PRESCALERS.iter().position(|&d| d == timebase.divisor()) else {
            return;
        };
        let regs = self.registers;
        self.timebase.set(*timebase);

        regs.tccr2b.write(TCCR2B::CS2::Stopped);
        regs.assr.modify(ASSR::AS2::CLEAR);
        regs.tccr2a.write(TCCR2A::WGM2::Normal);
        self.mask
            .timsk2
            .modify(TIMSK2::OCIE2A::CLEAR + TIMSK2::OCIE2B::CLEAR);
        regs.tcnt2.set(0);
        regs.tccr2b.write(TCCR2B::CS2.val(index as u8 + 1));
    }

    // Normal mode always wraps at 0xFF, so the period after a preload is
    // already a full one.
    fn arm_period(&self) {}

    fn load_partial(&self, ticks: u32) {
        let preload = self.timebase.get().preload_value(ticks);
        self.registers.tcnt2.set(preload as u8);
    }

    fn disable_events(&self) {
        self.mask.timsk2.modify(TIMSK2::TOIE2::CLEAR);
    }

    fn enable_events(&self) {
        self.mask.timsk2.modify(TIMSK2::TOIE2::SET);
    }

    fn raises_event_on_arm(&self) -> bool {
        self.flags.tifr2.is_set(TIFR2::TOV2)
    }
}
