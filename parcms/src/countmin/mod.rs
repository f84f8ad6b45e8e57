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

//! Count-Min sketch implementation for frequency estimation.
//!
//! The Count-Min sketch answers "how often did this key occur?" for a stream of 32-bit keys
//! using `width x depth` counters. An estimate never undercounts; with probability at least
//! `1 - delta` it overcounts by at most `epsilon` times the total weight of the stream, where
//! `width = ceil(e / epsilon)` and `depth = ceil(ln(1 / delta))`.
//!
//! # Usage
//!
//! ```rust
//! use parcms::countmin::CountMinSketch;
//!
//! let mut sketch = CountMinSketch::new(256, 5).unwrap();
//!
//! sketch.update(0x0a000001);
//! sketch.update_with_weight(0xc0a80001, 3);
//!
//! let estimate = sketch.estimate(0xc0a80001);
//! assert!(estimate >= 3);
//! assert!(sketch.lower_bound(0xc0a80001) <= estimate);
//! ```
//!
//! # Configuration Helpers
//!
//! ```rust
//! use parcms::countmin::CountMinSketch;
//!
//! let width = CountMinSketch::suggest_width(0.01);
//! let depth = CountMinSketch::suggest_depth(0.1);
//!
//! let sketch = CountMinSketch::new(width, depth).unwrap();
//! assert_eq!(sketch, CountMinSketch::from_error(0.01, 0.1).unwrap());
//! ```
//!
//! # Merging
//!
//! Sketches with equal dimensions and hash seed can be merged; the result equals a sketch
//! that saw both streams. This is what lets disjoint slices of an input be sketched
//! independently and reduced afterwards.

mod sketch;
pub use self::sketch::CountMinSketch;
