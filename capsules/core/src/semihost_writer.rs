// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! `debug!` sink that prints through an attached debugger.
//!
//! Useful on Cortex-M boards without a spare UART. Every write is a
//! semihosting call that halts the core until the host has consumed it, so
//! do not leave scheduler tracing enabled with short deadlines.
//!
//! ```rust,ignore
//! static WRITER: SemihostWriter = SemihostWriter::new();
//! unsafe { kernel::debug::set_debug_writer(&WRITER) };
//! ```

use cortex_m_semihosting::hio;
use kernel::debug::DebugWriter;

pub struct SemihostWriter {
    _private: (),
}

impl SemihostWriter {
    pub const fn new() -> SemihostWriter {
        SemihostWriter { _private: () }
    }
}

impl DebugWriter for SemihostWriter {
    fn write(&self, buf: &[u8]) {
        // Without a debugger attached there is nowhere to report failure.
        if let Ok(mut stdout) = hio::hstdout() {
            let _ = stdout.write_all(buf);
        }
    }
}
