// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Deterministic random source shared by hash-family generation and test data synthesis.
//!
//! Nothing here reads the clock or OS entropy: the same seed always yields the same stream,
//! which is what makes independently built sketches mergeable.

/// Random number source.
pub trait RandomSource {
    /// Returns the next random 64-bit value.
    fn next_u64(&mut self) -> u64;

    /// Returns a value in `[0, bound)`.
    ///
    /// # Panics
    ///
    /// Panics if `bound` is zero.
    fn next_below(&mut self, bound: u64) -> u64 {
        assert!(bound > 0, "bound must be positive");
        // Multiply-shift keeps the high bits, which are the well-mixed ones for xorshift.
        ((self.next_u64() as u128 * bound as u128) >> 64) as u64
    }

    /// Returns a value in `[low, high]`.
    fn next_in_range(&mut self, low: u64, high: u64) -> u64 {
        debug_assert!(low <= high);
        match (high - low).checked_add(1) {
            Some(span) => low + self.next_below(span),
            None => self.next_u64(),
        }
    }
}

/// Xorshift-based random generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Creates a new generator using the provided seed.
    ///
    /// A zero seed would lock xorshift at zero forever, so it is replaced by a fixed
    /// non-zero constant.
    pub fn seeded(seed: u64) -> Self {
        let state = if seed == 0 { 0x9e3779b97f4a7c15 } else { seed };
        Self { state }
    }
}

impl RandomSource for XorShift64 {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}
