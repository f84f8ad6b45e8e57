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

//! Fixed-width record layouts and their conversion to 32-bit keys.

use std::fmt;
use std::str::FromStr;

use byteorder::BigEndian;
use byteorder::ByteOrder;

use crate::error::Error;
use crate::error::ErrorKind;

/// Layout of one record in the input file.
///
/// The layout is always chosen by configuration; it is never guessed from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordFormat {
    /// A raw IPv4 address in network byte order (4 bytes).
    #[default]
    Ipv4,
    /// An IPv4-mapped IPv6 address (16 bytes); the key is taken from the last 4 bytes.
    Ipv4Mapped,
}

impl RecordFormat {
    /// Returns the width of one record in bytes.
    pub const fn width(self) -> usize {
        match self {
            RecordFormat::Ipv4 => 4,
            RecordFormat::Ipv4Mapped => 16,
        }
    }

    /// Converts one record into its key.
    ///
    /// # Panics
    ///
    /// Panics if `record` is shorter than [`width`](Self::width).
    #[inline]
    pub fn key(self, record: &[u8]) -> u32 {
        match self {
            RecordFormat::Ipv4 => BigEndian::read_u32(&record[..4]),
            RecordFormat::Ipv4Mapped => BigEndian::read_u32(&record[12..16]),
        }
    }

    /// Iterates over the keys of a buffer of whole records.
    ///
    /// A trailing partial record is ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// # use parcms::record::RecordFormat;
    /// let bytes = [10, 0, 0, 1, 192, 168, 0, 1];
    /// let keys: Vec<u32> = RecordFormat::Ipv4.keys(&bytes).collect();
    /// assert_eq!(keys, vec![0x0a000001, 0xc0a80001]);
    /// ```
    pub fn keys(self, bytes: &[u8]) -> impl Iterator<Item = u32> + '_ {
        bytes
            .chunks_exact(self.width())
            .map(move |record| self.key(record))
    }

    /// Encodes `key` as one record, appending it to `out`.
    pub fn encode(self, key: u32, out: &mut Vec<u8>) {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, key);
        match self {
            RecordFormat::Ipv4 => out.extend_from_slice(&buf),
            RecordFormat::Ipv4Mapped => {
                out.extend_from_slice(&[0; 10]);
                out.extend_from_slice(&[0xff, 0xff]);
                out.extend_from_slice(&buf);
            }
        }
    }
}

impl fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordFormat::Ipv4 => write!(f, "ipv4"),
            RecordFormat::Ipv4Mapped => write!(f, "ipv4-mapped"),
        }
    }
}

impl FromStr for RecordFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ipv4" | "4" => Ok(RecordFormat::Ipv4),
            "ipv4-mapped" | "16" => Ok(RecordFormat::Ipv4Mapped),
            _ => Err(Error::new(ErrorKind::Validation, "unknown record format")
                .with_context("argument", "record_format")
                .with_context("format", s)
                .with_context("expected", "ipv4 | ipv4-mapped")),
        }
    }
}
