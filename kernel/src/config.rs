// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Data structure for storing compile-time configuration options.
//!
//! Configuration lives in a typed `const` object rather than in scattered
//! `#[cfg(feature = ...)]` blocks. Every code path guarded by a configuration
//! value is still type-checked when the option is off, and the compiler folds
//! the constant so a disabled `if CONFIG.x { .. }` block costs nothing in the
//! final binary.

/// Data structure holding compile-time configuration options.
///
/// To change the configuration, enable the matching Cargo feature of the
/// kernel crate from the crate that builds the final image.
pub struct Config {
    /// Whether the deadline scheduler traces its activity to the debug output.
    ///
    /// If enabled, every arm, cancellation, callback dispatch and swallowed
    /// stale tick event prints one line with the current decomposition. This
    /// runs from interrupt context, so it is only suitable for bring-up of a
    /// new timebase driver.
    pub trace_deadlines: bool,

    /// Whether `debug!` output is prefixed with the source file and line.
    // Dropping the location saves the `(file, line)` statics for every call
    // site, which matters on parts with 8 or 16 KiB of flash.
    pub debug_source_location: bool,
}

/// The unique instance of `Config`. This is the only location in the
/// workspace where `#[cfg(x)]` is used to read Cargo features.
pub const CONFIG: Config = Config {
    trace_deadlines: cfg!(feature = "trace_deadlines"),
    debug_source_location: !cfg!(feature = "no_debug_location"),
};
