// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

#![forbid(unsafe_code)]
#![no_std]

pub mod deadline;
pub mod scheduler;
pub mod test;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod semihost_writer;
