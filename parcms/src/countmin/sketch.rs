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

use std::f64::consts::E;

use crate::error::Error;
use crate::error::ErrorKind;
use crate::hash::DEFAULT_SEED;
use crate::hash::HashFamily;

/// A Count-Min sketch over 32-bit keys.
///
/// See the [module level documentation](super) for more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountMinSketch {
    // immutable config variables
    width: usize,
    depth: usize,
    hashes: HashFamily,

    // sketch state
    total_weight: u64,
    /// Row-major `depth x width` counter table.
    counts: Vec<u64>,
}

impl CountMinSketch {
    /// Creates a sketch with `width` columns and `depth` rows using [`DEFAULT_SEED`].
    ///
    /// Zero dimensions are clamped to one.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Allocation`] if the counter table cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// # use parcms::countmin::CountMinSketch;
    /// let sketch = CountMinSketch::new(0, 4).unwrap();
    /// assert_eq!(sketch.width(), 1);
    /// assert_eq!(sketch.depth(), 4);
    /// ```
    pub fn new(width: usize, depth: usize) -> Result<Self, Error> {
        Self::with_seed(width, depth, DEFAULT_SEED)
    }

    /// Creates a sketch whose hash family is generated from `seed`.
    ///
    /// Sketches built with equal `(width, depth, seed)` share their hash family and can be
    /// merged.
    pub fn with_seed(width: usize, depth: usize, seed: u64) -> Result<Self, Error> {
        let width = width.max(1);
        let depth = depth.max(1);
        let cells = width.checked_mul(depth).ok_or_else(|| {
            Error::new(ErrorKind::Allocation, "counter table size overflows usize")
                .with_context("width", width)
                .with_context("depth", depth)
        })?;

        let mut counts = Vec::new();
        counts.try_reserve_exact(cells).map_err(|err| {
            Error::from(err)
                .with_context("width", width)
                .with_context("depth", depth)
        })?;
        counts.resize(cells, 0);

        Ok(Self {
            width,
            depth,
            hashes: HashFamily::generate(depth, seed),
            total_weight: 0,
            counts,
        })
    }

    /// Creates a sketch sized for additive error `epsilon` with failure probability `delta`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidParameter`] unless `epsilon > 0` and `0 < delta < 1`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use parcms::countmin::CountMinSketch;
    /// let sketch = CountMinSketch::from_error(0.01, 0.1).unwrap();
    /// assert_eq!(sketch.width(), 272);
    /// assert_eq!(sketch.depth(), 3);
    /// ```
    pub fn from_error(epsilon: f64, delta: f64) -> Result<Self, Error> {
        Self::from_error_with_seed(epsilon, delta, DEFAULT_SEED)
    }

    /// Same as [`from_error`](Self::from_error) with an explicit hash seed.
    pub fn from_error_with_seed(epsilon: f64, delta: f64, seed: u64) -> Result<Self, Error> {
        check_epsilon(epsilon)?;
        check_delta(delta)?;
        Self::with_seed(
            Self::suggest_width(epsilon),
            Self::suggest_depth(delta),
            seed,
        )
    }

    /// Returns `ceil(e / epsilon)`, at least 1.
    ///
    /// # Panics
    ///
    /// Panics if `epsilon` is not a finite positive number.
    pub fn suggest_width(epsilon: f64) -> usize {
        assert!(
            epsilon.is_finite() && epsilon > 0.0,
            "epsilon must be finite and positive, got {epsilon}"
        );
        // float-to-int casts saturate; an absurd width surfaces as an allocation error
        ((E / epsilon).ceil() as usize).max(1)
    }

    /// Returns `ceil(ln(1 / delta))`, at least 1.
    ///
    /// # Panics
    ///
    /// Panics if `delta` is not in `(0, 1)`.
    pub fn suggest_depth(delta: f64) -> usize {
        assert!(
            delta > 0.0 && delta < 1.0,
            "delta must be in (0, 1), got {delta}"
        );
        ((1.0 / delta).ln().ceil() as usize).max(1)
    }

    /// Returns the number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the number of rows, one per hash function.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the seed of the hash family.
    pub fn seed(&self) -> u64 {
        self.hashes.seed()
    }

    /// Returns the hash family.
    pub fn hash_family(&self) -> &HashFamily {
        &self.hashes
    }

    /// Returns the total weight applied to the sketch, saturating at `u64::MAX`.
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Returns true if nothing has been added.
    pub fn is_empty(&self) -> bool {
        self.total_weight == 0
    }

    /// Returns the additive error factor `e / width` of the sketch.
    pub fn relative_error(&self) -> f64 {
        E / self.width as f64
    }

    /// Returns the counters of `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= depth`.
    pub fn row(&self, row: usize) -> &[u64] {
        assert!(row < self.depth, "row {row} out of range for depth {}", self.depth);
        &self.counts[row * self.width..(row + 1) * self.width]
    }

    /// Adds one occurrence of `key`.
    pub fn update(&mut self, key: u32) {
        self.update_with_weight(key, 1);
    }

    /// Adds `weight` occurrences of `key`.
    ///
    /// Counters saturate at `u64::MAX` instead of wrapping.
    pub fn update_with_weight(&mut self, key: u32, weight: u64) {
        let width = self.width;
        for (row, col) in self.hashes.buckets(key, width).enumerate() {
            let cell = &mut self.counts[row * width + col];
            *cell = cell.saturating_add(weight);
        }
        self.total_weight = self.total_weight.saturating_add(weight);
    }

    /// Adds one occurrence of every key, in order.
    ///
    /// # Examples
    ///
    /// ```
    /// # use parcms::countmin::CountMinSketch;
    /// let mut sketch = CountMinSketch::new(64, 3).unwrap();
    /// sketch.batch_update([1, 2, 2, 3, 3, 3]);
    /// assert!(sketch.estimate(3) >= 3);
    /// assert_eq!(sketch.total_weight(), 6);
    /// ```
    pub fn batch_update<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = u32>,
    {
        for key in keys {
            self.update(key);
        }
    }

    /// Returns the estimated weight of `key`.
    ///
    /// The estimate never falls below the true weight. With probability at least
    /// `1 - delta` it exceeds it by at most `epsilon * total_weight`.
    pub fn estimate(&self, key: u32) -> u64 {
        self.hashes
            .buckets(key, self.width)
            .enumerate()
            .map(|(row, col)| self.counts[row * self.width + col])
            .min()
            .unwrap_or(0)
    }

    /// Returns an upper bound of the weight of `key`; identical to the estimate.
    pub fn upper_bound(&self, key: u32) -> u64 {
        self.estimate(key)
    }

    /// Returns a lower bound of the weight of `key` that holds with probability `1 - delta`.
    pub fn lower_bound(&self, key: u32) -> u64 {
        let slack = (self.relative_error() * self.total_weight as f64).ceil() as u64;
        self.estimate(key).saturating_sub(slack)
    }

    /// Returns true if `other` has the same dimensions and hash family.
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.width == other.width && self.depth == other.depth && self.hashes == other.hashes
    }

    /// Adds every counter of `other` into this sketch.
    ///
    /// The result is the sketch that would have been obtained by applying all of `other`'s
    /// updates to this one. Counters saturate like in [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::DimensionMismatch`] if the sketches differ in width, depth or
    /// hash family. Nothing is modified in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// # use parcms::countmin::CountMinSketch;
    /// let mut left = CountMinSketch::new(128, 4).unwrap();
    /// let mut right = CountMinSketch::new(128, 4).unwrap();
    /// left.update(7);
    /// right.update_with_weight(7, 2);
    ///
    /// left.merge(&right).unwrap();
    /// assert!(left.estimate(7) >= 3);
    ///
    /// let other = CountMinSketch::with_seed(128, 4, 1).unwrap();
    /// assert!(left.merge(&other).is_err());
    /// ```
    pub fn merge(&mut self, other: &Self) -> Result<(), Error> {
        if !self.is_compatible(other) {
            let message = if self.width != other.width || self.depth != other.depth {
                "cannot merge sketches of different dimensions"
            } else {
                "cannot merge sketches with different hash families"
            };
            return Err(Error::new(ErrorKind::DimensionMismatch, message)
                .with_context("dest", format!("{}x{}", self.width, self.depth))
                .with_context("src", format!("{}x{}", other.width, other.depth))
                .with_context("dest_seed", self.seed())
                .with_context("src_seed", other.seed()));
        }

        for (dst, src) in self.counts.iter_mut().zip(other.counts.iter()) {
            *dst = dst.saturating_add(*src);
        }
        self.total_weight = self.total_weight.saturating_add(other.total_weight);
        Ok(())
    }
}

fn check_epsilon(epsilon: f64) -> Result<(), Error> {
    if epsilon.is_finite() && epsilon > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid_parameter("epsilon must be finite and positive")
            .with_context("epsilon", epsilon))
    }
}

fn check_delta(delta: f64) -> Result<(), Error> {
    if delta > 0.0 && delta < 1.0 {
        Ok(())
    } else {
        Err(Error::invalid_parameter("delta must be in (0, 1)").with_context("delta", delta))
    }
}
