// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Core kernel crate for the deadline timer.
//!
//! The kernel crate holds the Hardware Interface Layer (HIL) definitions that
//! chips implement and capsules consume, along with the shared error type,
//! debug output and compile-time configuration.
//!
//! Most `unsafe` code is in this kernel crate and the chip crates.

#![warn(unreachable_pub)]
#![no_std]

pub mod config;
pub mod debug;
pub mod errorcode;
pub mod hil;
pub mod utilities;

pub use crate::errorcode::ErrorCode;
