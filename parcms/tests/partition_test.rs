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

use googletest::assert_that;
use googletest::prelude::eq;
use googletest::prelude::le;
use parcms::partition::Partition;

#[test]
fn test_partitions_tile_the_input() {
    for total in 0..200u64 {
        for workers in 1..12usize {
            let parts = Partition::all(total, workers).unwrap();
            assert_that!(parts.len(), eq(workers));

            let mut next = 0;
            for (index, part) in parts.iter().enumerate() {
                assert_that!(part.worker_index(), eq(index));
                assert_that!(part.start(), eq(next));
                next = part.end();
            }
            assert_that!(next, eq(total));

            let max = parts.iter().map(Partition::count).max().unwrap();
            let min = parts.iter().map(Partition::count).min().unwrap();
            assert_that!(max - min, le(1));
        }
    }
}

#[test]
fn test_first_workers_take_the_remainder() {
    let counts: Vec<u64> = Partition::all(10, 3)
        .unwrap()
        .iter()
        .map(Partition::count)
        .collect();
    assert_eq!(counts, vec![4, 3, 3]);

    let counts: Vec<u64> = Partition::all(11, 4)
        .unwrap()
        .iter()
        .map(Partition::count)
        .collect();
    assert_eq!(counts, vec![3, 3, 3, 2]);
}

#[test]
fn test_each_worker_computes_its_own_slice() {
    let all = Partition::all(1_000_003, 7).unwrap();
    for (index, part) in all.iter().enumerate() {
        assert_eq!(Partition::compute(1_000_003, 7, index).unwrap(), *part);
    }
}

#[test]
fn test_large_totals_do_not_overflow() {
    let total = u64::MAX / 16;
    let last = Partition::compute(total, 3, 2).unwrap();
    assert_that!(last.end(), eq(total));
}
