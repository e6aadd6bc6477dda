// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2026.

//! Helper functions for common mathematical operations.

/// Divide `numerator` by `denominator`, rounding a result that lies exactly
/// halfway between two integers up.
///
/// Never overflows: the comparison `r >= d - r` is `2r >= d` without the
/// doubling. `denominator` must be non-zero.
pub fn div_round_half_up(numerator: u128, denominator: u128) -> u128 {
    let quotient = numerator / denominator;
    let rem = numerator % denominator;
    if rem >= denominator - rem {
        quotient + 1
    } else {
        quotient
    }
}
