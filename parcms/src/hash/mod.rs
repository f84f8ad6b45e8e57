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

//! Hash family used to map keys onto sketch columns.
//!
//! Each sketch row owns one function `h(x) = ((a * x + b) mod p) mod width` with `p` the
//! largest prime below 2^32. Random `(a, b)` pairs make any two distinct keys collide in a
//! row with probability about `1 / width`. The family is meant for load distribution and
//! error bounds, not for resisting adversarial inputs.

mod affine;

pub use self::affine::AffineHash;
pub use self::affine::HashFamily;
pub use self::affine::PRIME;

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 9001;
