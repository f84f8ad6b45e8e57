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

use std::collections::HashMap;

use googletest::assert_that;
use googletest::prelude::contains_substring;
use googletest::prelude::eq;
use googletest::prelude::ge;
use googletest::prelude::le;
use parcms::common::random::RandomSource;
use parcms::common::random::XorShift64;
use parcms::countmin::CountMinSketch;
use parcms::error::ErrorKind;

#[test]
fn test_dimensions_from_error() {
    let sketch = CountMinSketch::from_error(0.01, 0.1).unwrap();
    assert_that!(sketch.width(), eq(272));
    assert_that!(sketch.depth(), eq(3));
    assert!(sketch.is_empty());
    assert!(sketch.relative_error() <= 0.01);
}

#[test]
fn test_zero_dimensions_are_clamped() {
    let sketch = CountMinSketch::new(0, 0).unwrap();
    assert_that!(sketch.width(), eq(1));
    assert_that!(sketch.depth(), eq(1));
}

#[test]
fn test_same_seed_same_hash_family() {
    let a = CountMinSketch::new(500, 5).unwrap();
    let b = CountMinSketch::new(500, 5).unwrap();
    assert_eq!(a.hash_family(), b.hash_family());
    assert_eq!(a, b);

    let c = CountMinSketch::with_seed(500, 5, 12345).unwrap();
    assert_ne!(a.hash_family(), c.hash_family());
}

#[test]
fn test_never_underestimates() {
    let mut rng = XorShift64::seeded(11);
    let mut sketch = CountMinSketch::new(50, 4).unwrap();
    let mut truth: HashMap<u32, u64> = HashMap::new();

    for _ in 0..20_000 {
        let key = rng.next_below(2_000) as u32;
        let weight = 1 + rng.next_below(5);
        sketch.update_with_weight(key, weight);
        *truth.entry(key).or_default() += weight;
    }

    for (key, count) in &truth {
        assert_that!(sketch.estimate(*key), ge(*count));
    }
    assert_that!(sketch.total_weight(), eq(truth.values().sum::<u64>()));
}

#[test]
fn test_overestimate_is_bounded() {
    let epsilon = 0.01;
    let delta = 0.1;
    let trials = 200;
    let keys_per_trial = 20;

    let mut failures = 0;
    for trial in 0..trials {
        // every trial draws a fresh hash family and a fresh workload
        let mut sketch = CountMinSketch::from_error_with_seed(epsilon, delta, trial + 1).unwrap();
        let mut rng = XorShift64::seeded(1_000 + trial);
        let mut truth: HashMap<u32, u64> = HashMap::new();
        for _ in 0..2_000 {
            let key = rng.next_u64() as u32 % 500;
            sketch.update(key);
            *truth.entry(key).or_default() += 1;
        }

        let n = sketch.total_weight() as f64;
        for key in truth.keys().take(keys_per_trial) {
            if sketch.estimate(*key) as f64 > truth[key] as f64 + epsilon * n {
                failures += 1;
            }
        }
    }

    let fraction = failures as f64 / (trials as f64 * keys_per_trial as f64);
    assert_that!(fraction, le(delta));
}

#[test]
fn test_batch_update_matches_single_updates() {
    let keys: Vec<u32> = (0..1_000u32).map(|i| i.wrapping_mul(2_654_435_761) % 97).collect();

    let mut batched = CountMinSketch::new(64, 4).unwrap();
    batched.batch_update(keys.iter().copied());

    let mut single = CountMinSketch::new(64, 4).unwrap();
    for key in &keys {
        single.update(*key);
    }
    assert_eq!(batched, single);
}

#[test]
fn test_merge_equals_combined_history() {
    let mut rng = XorShift64::seeded(5);
    let mut a = CountMinSketch::from_error(0.05, 0.05).unwrap();
    let mut b = CountMinSketch::from_error(0.05, 0.05).unwrap();
    let mut combined = CountMinSketch::from_error(0.05, 0.05).unwrap();

    for _ in 0..5_000 {
        let key = rng.next_below(300) as u32;
        let weight = 1 + rng.next_below(3);
        if rng.next_below(2) == 0 {
            a.update_with_weight(key, weight);
        } else {
            b.update_with_weight(key, weight);
        }
        combined.update_with_weight(key, weight);
    }

    a.merge(&b).unwrap();
    assert_eq!(a, combined);
    for key in 0..300 {
        assert_that!(a.estimate(key), eq(combined.estimate(key)));
    }
}

#[test]
fn test_merge_order_does_not_matter() {
    let parts: Vec<CountMinSketch> = (0..4u32)
        .map(|i| {
            let mut sketch = CountMinSketch::new(40, 3).unwrap();
            sketch.batch_update((0..100).map(|k| k * (i + 1)));
            sketch
        })
        .collect();

    let mut forward = parts[0].clone();
    for part in &parts[1..] {
        forward.merge(part).unwrap();
    }
    let mut backward = parts[3].clone();
    for part in parts[..3].iter().rev() {
        backward.merge(part).unwrap();
    }
    assert_eq!(forward, backward);
}

#[test]
fn test_merge_rejects_incompatible_sketches() {
    let mut dest = CountMinSketch::new(100, 3).unwrap();

    let err = dest.merge(&CountMinSketch::new(100, 4).unwrap()).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::DimensionMismatch));
    assert_that!(err.message(), contains_substring("different dimensions"));

    let err = dest
        .merge(&CountMinSketch::with_seed(100, 3, 77).unwrap())
        .unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::DimensionMismatch));
    assert_that!(err.message(), contains_substring("different hash families"));
}

#[test]
fn test_invalid_error_parameters() {
    let err = CountMinSketch::from_error(0.0, 0.5).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::InvalidParameter));
    assert_that!(err.message(), contains_substring("epsilon"));

    let err = CountMinSketch::from_error(0.5, 1.0).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::InvalidParameter));
    assert_that!(err.message(), contains_substring("delta"));
}

#[test]
fn test_huge_table_is_allocation_error() {
    let err = CountMinSketch::new(usize::MAX, 2).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::Allocation));
}
