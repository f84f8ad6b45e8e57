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

mod common;

use std::io;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::sync::atomic::AtomicBool;

use common::encode_records;
use googletest::assert_that;
use googletest::prelude::eq;
use parcms::common::random::RandomSource;
use parcms::common::random::XorShift64;
use parcms::countmin::CountMinSketch;
use parcms::error::ErrorKind;
use parcms::partition::Partition;
use parcms::reader::ChunkedReader;
use parcms::reader::ReadAhead;
use parcms::record::RecordFormat;

fn random_keys(n: usize, seed: u64) -> Vec<u32> {
    let mut rng = XorShift64::seeded(seed);
    (0..n).map(|_| rng.next_below(64) as u32).collect()
}

fn sketch_sync(
    bytes: &[u8],
    format: RecordFormat,
    partition: Partition,
    capacity: usize,
) -> CountMinSketch {
    let mut sketch = CountMinSketch::new(32, 3).unwrap();
    let mut reader = ChunkedReader::new(Cursor::new(bytes), format, partition, capacity).unwrap();
    reader.feed(&mut sketch, &AtomicBool::new(false)).unwrap();
    assert_that!(reader.remaining(), eq(0));
    sketch
}

fn sketch_read_ahead(
    bytes: &[u8],
    format: RecordFormat,
    partition: Partition,
    capacity: usize,
) -> CountMinSketch {
    let mut sketch = CountMinSketch::new(32, 3).unwrap();
    let reader = ChunkedReader::new(Cursor::new(bytes), format, partition, capacity).unwrap();
    ReadAhead::new(reader)
        .unwrap()
        .feed(&mut sketch, &AtomicBool::new(false))
        .unwrap();
    sketch
}

#[test]
fn test_chunk_size_does_not_change_the_sketch() {
    let keys = random_keys(90, 3);
    let bytes = encode_records(RecordFormat::Ipv4, &keys);
    // worker 1 of 3 owns records 30..60
    let partition = Partition::compute(90, 3, 1).unwrap();

    let mut expected = CountMinSketch::new(32, 3).unwrap();
    expected.batch_update(keys[30..60].iter().copied());

    for capacity in 1..=partition.count() as usize + 1 {
        let sync = sketch_sync(&bytes, RecordFormat::Ipv4, partition, capacity);
        assert_eq!(sync, expected, "sync reader, capacity {capacity}");

        let overlapped = sketch_read_ahead(&bytes, RecordFormat::Ipv4, partition, capacity);
        assert_eq!(overlapped, expected, "read-ahead reader, capacity {capacity}");
    }
}

#[test]
fn test_mapped_records() {
    let keys = random_keys(25, 8);
    let bytes = encode_records(RecordFormat::Ipv4Mapped, &keys);
    let partition = Partition::compute(25, 1, 0).unwrap();

    let mut expected = CountMinSketch::new(32, 3).unwrap();
    expected.batch_update(keys.iter().copied());

    assert_eq!(sketch_sync(&bytes, RecordFormat::Ipv4Mapped, partition, 4), expected);
    assert_eq!(
        sketch_read_ahead(&bytes, RecordFormat::Ipv4Mapped, partition, 4),
        expected
    );
}

#[test]
fn test_empty_partition() {
    let partition = Partition::compute(2, 5, 4).unwrap();
    assert!(partition.is_empty());
    let bytes = encode_records(RecordFormat::Ipv4, &[1, 2]);
    assert!(sketch_sync(&bytes, RecordFormat::Ipv4, partition, 8).is_empty());
    assert!(sketch_read_ahead(&bytes, RecordFormat::Ipv4, partition, 8).is_empty());
}

#[test]
fn test_short_read_is_reported() {
    let keys = random_keys(10, 1);
    let mut bytes = encode_records(RecordFormat::Ipv4, &keys);
    bytes.truncate(38);
    // the partition believes the source still holds 10 records
    let partition = Partition::compute(10, 1, 0).unwrap();

    let mut sketch = CountMinSketch::new(32, 3).unwrap();
    let mut reader =
        ChunkedReader::new(Cursor::new(bytes.clone()), RecordFormat::Ipv4, partition, 3).unwrap();
    let err = reader
        .feed(&mut sketch, &AtomicBool::new(false))
        .unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::ShortRead));
    assert_that!(err.context("offset"), eq(Some("36")));

    let mut sketch = CountMinSketch::new(32, 3).unwrap();
    let reader = ChunkedReader::new(Cursor::new(bytes), RecordFormat::Ipv4, partition, 3).unwrap();
    let err = ReadAhead::new(reader)
        .unwrap()
        .feed(&mut sketch, &AtomicBool::new(false))
        .unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::ShortRead));
}

#[test]
fn test_read_ahead_honours_cancellation() {
    let keys = random_keys(100, 2);
    let bytes = encode_records(RecordFormat::Ipv4, &keys);
    let partition = Partition::compute(100, 1, 0).unwrap();

    let mut sketch = CountMinSketch::new(32, 3).unwrap();
    let reader = ChunkedReader::new(Cursor::new(bytes), RecordFormat::Ipv4, partition, 10).unwrap();
    let err = ReadAhead::new(reader)
        .unwrap()
        .feed(&mut sketch, &AtomicBool::new(true))
        .unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::Aborted));
}

struct FailingDisk;

impl Read for FailingDisk {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        panic!("disk controller fault");
    }
}

impl Seek for FailingDisk {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match pos {
            SeekFrom::Start(offset) => Ok(offset),
            _ => Ok(0),
        }
    }
}

#[test]
fn test_read_ahead_reports_reader_panic() {
    let partition = Partition::compute(8, 1, 0).unwrap();
    let mut sketch = CountMinSketch::new(32, 3).unwrap();
    let reader = ChunkedReader::new(FailingDisk, RecordFormat::Ipv4, partition, 2).unwrap();

    let err = ReadAhead::new(reader)
        .unwrap()
        .feed(&mut sketch, &AtomicBool::new(false))
        .unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::Panicked));
    assert_that!(err.context("panic"), eq(Some("disk controller fault")));
    assert!(sketch.is_empty());
}
