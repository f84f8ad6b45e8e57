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

//! Static split of a record stream across workers.
//!
//! Every worker derives its own slice from `(total, workers, index)` alone, so no
//! coordination is needed before reading starts.

use crate::error::Error;

/// A contiguous range of records assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Partition {
    worker_index: usize,
    start: u64,
    count: u64,
}

impl Partition {
    /// Computes the slice of `total` records owned by worker `index` out of `workers`.
    ///
    /// The first `total % workers` workers get one extra record, so lengths differ by at
    /// most one and the slices cover `[0, total)` in worker order.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidParameter`](crate::error::ErrorKind::InvalidParameter) error if
    /// `workers` is zero or `index >= workers`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use parcms::partition::Partition;
    /// let lengths: Vec<u64> = (0..3)
    ///     .map(|i| Partition::compute(10, 3, i).unwrap().count())
    ///     .collect();
    /// assert_eq!(lengths, vec![4, 3, 3]);
    /// ```
    pub fn compute(total: u64, workers: usize, index: usize) -> Result<Self, Error> {
        if workers == 0 {
            return Err(Error::invalid_parameter("worker count must be at least 1"));
        }
        if index >= workers {
            return Err(Error::invalid_parameter("worker index out of range")
                .with_context("index", index)
                .with_context("workers", workers));
        }

        let p = workers as u64;
        let r = index as u64;
        let base = total / p;
        let rem = total % p;
        Ok(Self {
            worker_index: index,
            start: r * base + r.min(rem),
            count: base + u64::from(r < rem),
        })
    }

    /// Computes the partitions of all workers, in worker order.
    pub fn all(total: u64, workers: usize) -> Result<Vec<Self>, Error> {
        (0..workers.max(1))
            .map(|index| Self::compute(total, workers, index))
            .collect()
    }

    /// Returns the index of the owning worker.
    pub fn worker_index(&self) -> usize {
        self.worker_index
    }

    /// Returns the index of the first record.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Returns the number of records.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the index one past the last record.
    pub fn end(&self) -> u64 {
        self.start + self.count
    }

    /// Returns true if the partition holds no records.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the byte offset of the first record for records of `record_width` bytes.
    pub fn byte_offset(&self, record_width: usize) -> u64 {
        self.start * record_width as u64
    }

    /// Returns the length in bytes for records of `record_width` bytes.
    pub fn byte_len(&self, record_width: usize) -> u64 {
        self.count * record_width as u64
    }
}
