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

//! Append-only log of run summaries.
//!
//! Each completed run appends one CSV line with these columns (no header is written):
//!
//! ```text
//! workers,total_records,elapsed_seconds,io_seconds,compute_seconds,wait_seconds
//! ```
//!
//! Several independent processes may share one log file, so [`FileExecutionLogger`] holds an
//! exclusive file lock for exactly the duration of the append.

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;
use crate::error::ErrorKind;
use crate::reader::PhaseTimes;

/// Timing summary of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Number of workers the input was split across.
    pub workers: usize,
    /// Number of records in the input.
    pub total_records: u64,
    /// Wall-clock duration of the whole run.
    pub elapsed: Duration,
    /// Phase breakdown of the designated worker.
    pub phases: PhaseTimes,
}

impl RunSummary {
    /// Formats the summary as one log line, without the trailing newline.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::time::Duration;
    /// # use parcms::exec_log::RunSummary;
    /// # use parcms::reader::PhaseTimes;
    /// let summary = RunSummary {
    ///     workers: 4,
    ///     total_records: 1000,
    ///     elapsed: Duration::from_millis(1500),
    ///     phases: PhaseTimes::default(),
    /// };
    /// assert_eq!(summary.to_csv_line(), "4,1000,1.500000,0.000000,0.000000,0.000000");
    /// ```
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{:.6},{:.6},{:.6},{:.6}",
            self.workers,
            self.total_records,
            self.elapsed.as_secs_f64(),
            self.phases.io.as_secs_f64(),
            self.phases.compute.as_secs_f64(),
            self.phases.wait.as_secs_f64(),
        )
    }
}

/// A sink for run summaries.
pub trait ExecutionLogger {
    /// Appends one summary.
    ///
    /// Failures are reported as [`ErrorKind::Lock`]; they never invalidate the run itself.
    fn append(&self, summary: &RunSummary) -> Result<(), Error>;
}

/// Appends summaries to a file shared between processes.
#[derive(Debug, Clone)]
pub struct FileExecutionLogger {
    path: PathBuf,
}

impl FileExecutionLogger {
    /// Creates a logger for `path`. The file is created on first append if missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the log path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_error(&self, message: &'static str, err: io::Error) -> Error {
        Error::new(ErrorKind::Lock, message)
            .with_context("path", self.path.display())
            .set_source(err)
    }
}

impl ExecutionLogger for FileExecutionLogger {
    fn append(&self, summary: &RunSummary) -> Result<(), Error> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| self.lock_error("failed to open execution log", err))?;

        file.lock()
            .map_err(|err| self.lock_error("failed to lock execution log", err))?;
        let written = write_line(&mut file, summary);
        let unlocked = file.unlock();

        written.map_err(|err| self.lock_error("failed to append to execution log", err))?;
        unlocked.map_err(|err| self.lock_error("failed to unlock execution log", err))
    }
}

fn write_line(file: &mut File, summary: &RunSummary) -> io::Result<()> {
    let mut line = summary.to_csv_line();
    line.push('\n');
    // one write per line so concurrent appenders never interleave partial lines
    file.write_all(line.as_bytes())?;
    file.flush()
}
