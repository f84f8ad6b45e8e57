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

//! Bounded-buffer readers that feed one partition of a record file into a sketch.
//!
//! [`ChunkedReader`] reads synchronously: it requests `min(remaining, capacity)` records at
//! a time, and the caller adds each chunk to the sketch before asking for the next one.
//! [`ReadAhead`] overlaps the two by filling the next buffer on a helper thread. Either
//! way the sketch sees the records in file order, so the chunk size never changes the
//! result.

use std::ops::AddAssign;
use std::time::Duration;

use crate::error::Error;
use crate::error::ErrorKind;
use crate::partition::Partition;

mod chunked;
mod read_ahead;

pub use self::chunked::ChunkedReader;
pub use self::read_ahead::ReadAhead;

/// Default read buffer size in bytes.
pub const DEFAULT_BUFFER_BYTES: usize = 1 << 20;

/// Wall-clock time a worker spent in each phase of its pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseTimes {
    /// Time spent reading from the source.
    pub io: Duration,
    /// Time spent updating the sketch.
    pub compute: Duration,
    /// Time spent blocked waiting for a read to complete.
    pub wait: Duration,
}

impl AddAssign for PhaseTimes {
    fn add_assign(&mut self, rhs: Self) {
        self.io += rhs.io;
        self.compute += rhs.compute;
        self.wait += rhs.wait;
    }
}

fn aborted(partition: &Partition) -> Error {
    Error::new(ErrorKind::Aborted, "stopped because another worker failed")
        .with_context("worker", partition.worker_index())
}
