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

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use parcms::record::RecordFormat;

/// A file under the system temp directory that is removed on drop.
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    /// Reserves a unique path without creating the file.
    pub fn new(name: &str) -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "parcms-test-{}-{}-{}",
            std::process::id(),
            n,
            name
        ));
        let _ = fs::remove_file(&path);
        Self { path }
    }

    /// Creates a file holding `bytes`.
    pub fn with_bytes(name: &str, bytes: &[u8]) -> Self {
        let file = Self::new(name);
        fs::write(&file.path, bytes).unwrap();
        file
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Encodes `keys` as consecutive records.
pub fn encode_records(format: RecordFormat, keys: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(keys.len() * format.width());
    for key in keys {
        format.encode(*key, &mut out);
    }
    out
}

/// Writes `keys` as a record file.
pub fn record_file(name: &str, format: RecordFormat, keys: &[u32]) -> TempFile {
    TempFile::with_bytes(name, &encode_records(format, keys))
}
