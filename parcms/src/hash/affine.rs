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

use crate::common::random::RandomSource;
use crate::common::random::XorShift64;

/// The modulus of every affine hash: the largest prime below 2^32.
pub const PRIME: u64 = 4_294_967_291;

/// One member of the family, `h(x) = ((a * x + b) mod PRIME) mod width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AffineHash {
    a: u64,
    b: u64,
}

impl AffineHash {
    /// Creates a hash function from explicit parameters.
    ///
    /// # Panics
    ///
    /// Panics if `a` or `b` is not below [`PRIME`].
    pub fn new(a: u64, b: u64) -> Self {
        assert!(a < PRIME, "a must be below the prime modulus, got {a}");
        assert!(b < PRIME, "b must be below the prime modulus, got {b}");
        Self { a, b }
    }

    /// Returns the multiplier `a`.
    pub fn a(&self) -> u64 {
        self.a
    }

    /// Returns the offset `b`.
    pub fn b(&self) -> u64 {
        self.b
    }

    /// Maps `key` to a column in `[0, width)`.
    #[inline]
    pub fn bucket(&self, key: u32, width: usize) -> usize {
        debug_assert!(width > 0);
        // a, b < 2^32 and key < 2^32: a * key + b stays below 2^64.
        let h = (self.a * key as u64 + self.b) % PRIME;
        (h % width as u64) as usize
    }
}

/// An ordered family of `depth` pairwise-independent affine hash functions.
///
/// Two families generated with the same depth and seed are equal, which is the
/// precondition for merging the sketches that use them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashFamily {
    seed: u64,
    functions: Vec<AffineHash>,
}

impl HashFamily {
    /// Draws `depth` functions from a generator seeded with `seed`.
    ///
    /// Multipliers come from `[1, PRIME)` since `a = 0` would send every key to one column;
    /// offsets come from `[0, PRIME)`.
    pub fn generate(depth: usize, seed: u64) -> Self {
        let mut rng = XorShift64::seeded(seed);
        let functions = (0..depth)
            .map(|_| {
                let a = rng.next_in_range(1, PRIME - 1);
                let b = rng.next_below(PRIME);
                AffineHash { a, b }
            })
            .collect();
        Self { seed, functions }
    }

    /// Returns the seed the family was generated from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the number of functions, one per sketch row.
    pub fn depth(&self) -> usize {
        self.functions.len()
    }

    /// Returns the functions in row order.
    pub fn functions(&self) -> &[AffineHash] {
        &self.functions
    }

    /// Iterates over the column `key` maps to in each row, in row order.
    #[inline]
    pub fn buckets(&self, key: u32, width: usize) -> impl Iterator<Item = usize> + '_ {
        self.functions.iter().map(move |h| h.bucket(key, width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        assert_eq!(HashFamily::generate(5, 9001), HashFamily::generate(5, 9001));
        assert_ne!(HashFamily::generate(5, 9001), HashFamily::generate(5, 9002));
    }

    #[test]
    fn test_parameters_in_range() {
        let family = HashFamily::generate(64, 1);
        for h in family.functions() {
            assert!(h.a() >= 1 && h.a() < PRIME);
            assert!(h.b() < PRIME);
        }
    }

    #[test]
    fn test_bucket_matches_formula() {
        let h = AffineHash::new(3, 7);
        assert_eq!(h.bucket(10, 5), ((3 * 10 + 7) % PRIME % 5) as usize);

        // extreme inputs must not overflow
        let h = AffineHash::new(PRIME - 1, PRIME - 1);
        let col = h.bucket(u32::MAX, 272);
        assert!(col < 272);
        let expected = (((PRIME - 1) as u128 * u32::MAX as u128 + (PRIME - 1) as u128)
            % PRIME as u128
            % 272) as usize;
        assert_eq!(col, expected);
    }

    #[test]
    fn test_width_one_always_zero() {
        let family = HashFamily::generate(3, 5);
        for key in [0u32, 1, 12345, u32::MAX] {
            assert!(family.buckets(key, 1).all(|c| c == 0));
        }
    }
}
