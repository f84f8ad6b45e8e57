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

use std::io;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Instant;

use crate::countmin::CountMinSketch;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::partition::Partition;
use crate::reader::PhaseTimes;
use crate::reader::aborted;
use crate::record::RecordFormat;

/// Streams the records of one partition through a bounded buffer.
#[derive(Debug)]
pub struct ChunkedReader<R> {
    source: R,
    format: RecordFormat,
    partition: Partition,
    capacity: usize,
    consumed: u64,
    buffer: Vec<u8>,
}

impl<R: Read + Seek> ChunkedReader<R> {
    /// Creates a reader over `partition` of `source` that holds at most `capacity` records
    /// in memory at a time.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidParameter`] if `capacity` is zero and
    /// [`ErrorKind::Allocation`] if the buffer cannot be reserved.
    pub fn new(
        source: R,
        format: RecordFormat,
        partition: Partition,
        capacity: usize,
    ) -> Result<Self, Error> {
        if capacity == 0 {
            return Err(Error::invalid_parameter("buffer capacity must be at least 1 record"));
        }
        let buffer = allocate_buffer(format, &partition, capacity)?;
        Ok(Self {
            source,
            format,
            partition,
            capacity,
            consumed: 0,
            buffer,
        })
    }

    /// Returns the record layout.
    pub fn format(&self) -> RecordFormat {
        self.format
    }

    /// Returns the partition being read.
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Returns the buffer capacity in records.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of records handed out so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Returns the number of records not yet read.
    pub fn remaining(&self) -> u64 {
        self.partition.count() - self.consumed
    }

    /// Reads the next chunk of `min(remaining, capacity)` records.
    ///
    /// Returns `None` once the whole partition has been read.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ShortRead`] if the source ends early and [`ErrorKind::Io`] if
    /// reading fails.
    pub fn next_chunk(&mut self) -> Result<Option<&[u8]>, Error> {
        let mut buffer = std::mem::take(&mut self.buffer);
        let read = self.read_chunk(&mut buffer);
        self.buffer = buffer;
        match read? {
            0 => Ok(None),
            n => Ok(Some(&self.buffer[..n * self.format.width()])),
        }
    }

    /// Reads the records of the whole partition into `sketch`, one chunk at a time.
    ///
    /// Stops with an [`ErrorKind::Aborted`] error at the next chunk boundary once `cancel` is
    /// set.
    pub fn feed(
        &mut self,
        sketch: &mut CountMinSketch,
        cancel: &AtomicBool,
    ) -> Result<PhaseTimes, Error> {
        let mut times = PhaseTimes::default();
        let format = self.format;
        loop {
            if cancel.load(Ordering::Relaxed) {
                return Err(aborted(&self.partition));
            }

            let start = Instant::now();
            let chunk = self.next_chunk()?;
            times.io += start.elapsed();

            let Some(chunk) = chunk else {
                break;
            };
            let start = Instant::now();
            sketch.batch_update(format.keys(chunk));
            times.compute += start.elapsed();
        }
        Ok(times)
    }

    /// Reads the next chunk into `buf` and returns the number of records obtained, `0` once
    /// the partition is exhausted.
    pub(super) fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let remaining = self.remaining();
        if remaining == 0 {
            return Ok(0);
        }

        let width = self.format.width();
        let want = remaining.min(self.capacity as u64) as usize;
        let offset = self.partition.byte_offset(width) + self.consumed * width as u64;
        read_exact_at(&mut self.source, offset, &mut buf[..want * width])?;
        self.consumed += want as u64;
        tracing::trace!(
            worker = self.partition.worker_index(),
            offset,
            records = want,
            "read chunk"
        );
        Ok(want)
    }

    /// Moves the read buffer out, leaving an empty one behind.
    pub(super) fn take_buffer(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }
}

/// Reserves a buffer for `min(capacity, partition length)` records.
pub(super) fn allocate_buffer(
    format: RecordFormat,
    partition: &Partition,
    capacity: usize,
) -> Result<Vec<u8>, Error> {
    let records = (capacity as u64).min(partition.count()).max(1) as usize;
    let bytes = records.checked_mul(format.width()).ok_or_else(|| {
        Error::new(ErrorKind::Allocation, "read buffer size overflows usize")
            .with_context("capacity", capacity)
    })?;

    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(bytes)
        .map_err(|err| Error::from(err).with_context("buffer_bytes", bytes))?;
    buffer.resize(bytes, 0);
    Ok(buffer)
}

fn read_exact_at<R: Read + Seek>(source: &mut R, offset: u64, buf: &mut [u8]) -> Result<(), Error> {
    source
        .seek(SeekFrom::Start(offset))
        .map_err(|err| Error::from(err).with_context("offset", offset))?;

    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(Error::from(err).with_context("offset", offset)),
        }
    }

    if filled < buf.len() {
        return Err(
            Error::new(ErrorKind::ShortRead, "source ended before the expected length")
                .with_context("offset", offset)
                .with_context("expected_bytes", buf.len())
                .with_context("actual_bytes", filled),
        );
    }
    Ok(())
}
