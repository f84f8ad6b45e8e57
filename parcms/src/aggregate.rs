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

//! Reduction of per-worker sketches into one global sketch.

use crate::countmin::CountMinSketch;
use crate::error::Error;
use crate::error::ErrorKind;

/// Accumulates the local sketches of a fixed number of workers.
///
/// Merging is commutative and associative, so arrival order does not matter. The result
/// is only released once every expected sketch has arrived; a partial reduction would
/// understate frequencies without any sign that it did.
///
/// # Examples
///
/// ```
/// # use parcms::aggregate::Aggregator;
/// # use parcms::countmin::CountMinSketch;
/// let mut a = CountMinSketch::new(64, 3).unwrap();
/// let mut b = CountMinSketch::new(64, 3).unwrap();
/// a.update(1);
/// b.update(1);
///
/// let mut aggregator = Aggregator::new(2);
/// aggregator.merge(a).unwrap();
/// aggregator.merge(b).unwrap();
/// assert_eq!(aggregator.finish().unwrap().estimate(1), 2);
/// ```
#[derive(Debug)]
pub struct Aggregator {
    expected: usize,
    received: usize,
    global: Option<CountMinSketch>,
}

impl Aggregator {
    /// Creates an aggregator waiting for `expected` sketches.
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            received: 0,
            global: None,
        }
    }

    /// Returns the number of sketches merged so far.
    pub fn received(&self) -> usize {
        self.received
    }

    /// Returns true once every expected sketch has been merged.
    pub fn is_complete(&self) -> bool {
        self.received == self.expected
    }

    /// Merges one worker's sketch into the global sketch.
    ///
    /// The first sketch becomes the global sketch as is; later ones are added into it.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::DimensionMismatch`] if `local` is incompatible with the sketches
    /// merged before it and [`ErrorKind::InvalidParameter`] if more sketches arrive than
    /// expected.
    pub fn merge(&mut self, local: CountMinSketch) -> Result<(), Error> {
        if self.received >= self.expected {
            return Err(Error::invalid_parameter("more sketches than expected")
                .with_context("expected", self.expected));
        }

        match self.global.as_mut() {
            Some(global) => global.merge(&local)?,
            None => self.global = Some(local),
        }
        self.received += 1;
        Ok(())
    }

    /// Consumes the aggregator and returns the global sketch.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidParameter`] if fewer sketches than expected were merged.
    pub fn finish(self) -> Result<CountMinSketch, Error> {
        match self.global {
            Some(global) if self.received == self.expected => Ok(global),
            _ => Err(
                Error::new(ErrorKind::InvalidParameter, "reduction is incomplete")
                    .with_context("expected", self.expected)
                    .with_context("received", self.received),
            ),
        }
    }
}
