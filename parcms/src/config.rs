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

//! Job configuration.
//!
//! Every value is checked in [`JobConfigBuilder::build`], before any file is touched. A
//! rejected value yields an [`ErrorKind::Validation`] error whose `argument` context names
//! the offending setting.

use std::num::NonZeroUsize;
use std::path::Path;
use std::path::PathBuf;
use std::thread;

use crate::countmin::CountMinSketch;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::hash::DEFAULT_SEED;
use crate::reader::DEFAULT_BUFFER_BYTES;
use crate::record::RecordFormat;

/// Default additive error factor.
pub const DEFAULT_EPSILON: f64 = 0.001;
/// Default failure probability.
pub const DEFAULT_DELTA: f64 = 0.01;

/// How each worker sizes its sketch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SketchSize {
    /// Derive width and depth from the error bound `epsilon` and failure probability `delta`.
    FromError { epsilon: f64, delta: f64 },
    /// Use explicit dimensions.
    Explicit { width: usize, depth: usize },
}

impl Default for SketchSize {
    fn default() -> Self {
        SketchSize::FromError {
            epsilon: DEFAULT_EPSILON,
            delta: DEFAULT_DELTA,
        }
    }
}

/// Validated settings of one counting job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobConfig {
    input: PathBuf,
    size: SketchSize,
    workers: usize,
    buffer_records: usize,
    format: RecordFormat,
    seed: u64,
    read_ahead: bool,
}

impl JobConfig {
    /// Returns a builder for a job reading `input`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use parcms::config::JobConfig;
    /// # use parcms::record::RecordFormat;
    /// let config = JobConfig::builder("ips.bin")
    ///     .epsilon_delta(0.01, 0.1)
    ///     .workers(4)
    ///     .record_format(RecordFormat::Ipv4)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.workers(), 4);
    /// assert_eq!(config.buffer_records(), 262_144);
    ///
    /// let err = JobConfig::builder("ips.bin").epsilon_delta(0.01, 1.5).build().unwrap_err();
    /// assert_eq!(err.context("argument"), Some("delta"));
    /// ```
    pub fn builder(input: impl Into<PathBuf>) -> JobConfigBuilder {
        JobConfigBuilder {
            input: input.into(),
            size: SketchSize::default(),
            workers: None,
            buffer_records: None,
            format: RecordFormat::default(),
            seed: DEFAULT_SEED,
            read_ahead: false,
        }
    }

    /// Returns the input path.
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Returns how sketches are sized.
    pub fn size(&self) -> SketchSize {
        self.size
    }

    /// Returns the number of workers.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Returns the read buffer capacity per worker, in records.
    pub fn buffer_records(&self) -> usize {
        self.buffer_records
    }

    /// Returns the record layout.
    pub fn record_format(&self) -> RecordFormat {
        self.format
    }

    /// Returns the hash seed shared by all workers.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns true if workers overlap reading with sketch updates.
    pub fn read_ahead(&self) -> bool {
        self.read_ahead
    }

    /// Creates an empty sketch with this job's dimensions and seed.
    ///
    /// Every call returns a sketch compatible with every other, so worker results can be
    /// merged.
    pub fn new_sketch(&self) -> Result<CountMinSketch, Error> {
        match self.size {
            SketchSize::FromError { epsilon, delta } => {
                CountMinSketch::from_error_with_seed(epsilon, delta, self.seed)
            }
            SketchSize::Explicit { width, depth } => {
                CountMinSketch::with_seed(width, depth, self.seed)
            }
        }
    }
}

/// Builder for [`JobConfig`].
#[derive(Debug, Clone)]
pub struct JobConfigBuilder {
    input: PathBuf,
    size: SketchSize,
    workers: Option<usize>,
    buffer_records: Option<usize>,
    format: RecordFormat,
    seed: u64,
    read_ahead: bool,
}

impl JobConfigBuilder {
    /// Sizes sketches from an error bound and failure probability.
    pub fn epsilon_delta(mut self, epsilon: f64, delta: f64) -> Self {
        self.size = SketchSize::FromError { epsilon, delta };
        self
    }

    /// Sizes sketches explicitly.
    pub fn dimensions(mut self, width: usize, depth: usize) -> Self {
        self.size = SketchSize::Explicit { width, depth };
        self
    }

    /// Sets the number of workers. Defaults to the available parallelism.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Sets the read buffer capacity in records. Defaults to 1 MiB worth of records.
    pub fn buffer_records(mut self, records: usize) -> Self {
        self.buffer_records = Some(records);
        self
    }

    /// Sets the record layout.
    pub fn record_format(mut self, format: RecordFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the hash seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enables or disables read-ahead.
    pub fn read_ahead(mut self, enabled: bool) -> Self {
        self.read_ahead = enabled;
        self
    }

    /// Validates the settings.
    pub fn build(self) -> Result<JobConfig, Error> {
        match self.size {
            SketchSize::FromError { epsilon, delta } => {
                check_epsilon(epsilon)?;
                check_delta(delta)?;
            }
            SketchSize::Explicit { width, depth } => {
                if width == 0 {
                    return Err(invalid("width", width, "must be at least 1"));
                }
                if depth == 0 {
                    return Err(invalid("depth", depth, "must be at least 1"));
                }
            }
        }

        let workers = match self.workers {
            Some(0) => return Err(invalid("workers", 0, "must be at least 1")),
            Some(workers) => workers,
            None => thread::available_parallelism().map_or(1, NonZeroUsize::get),
        };
        let buffer_records = match self.buffer_records {
            Some(0) => return Err(invalid("buffer_records", 0, "must be at least 1")),
            Some(records) => records,
            None => (DEFAULT_BUFFER_BYTES / self.format.width()).max(1),
        };
        if self.input.as_os_str().is_empty() {
            return Err(invalid("input", "", "must not be empty"));
        }

        Ok(JobConfig {
            input: self.input,
            size: self.size,
            workers,
            buffer_records,
            format: self.format,
            seed: self.seed,
            read_ahead: self.read_ahead,
        })
    }
}

/// Checks an additive error factor: it must be a finite number above zero.
///
/// Front ends that size sketches explicitly still call this on user-supplied bounds, so a
/// bad value is rejected no matter which sizing wins.
///
/// # Examples
///
/// ```
/// # use parcms::config::check_epsilon;
/// assert_eq!(check_epsilon(0.01).unwrap(), 0.01);
/// assert_eq!(check_epsilon(0.0).unwrap_err().context("argument"), Some("epsilon"));
/// ```
pub fn check_epsilon(epsilon: f64) -> Result<f64, Error> {
    if epsilon.is_finite() && epsilon > 0.0 {
        Ok(epsilon)
    } else {
        Err(invalid("epsilon", epsilon, "must be a finite number > 0"))
    }
}

/// Checks a failure probability: it must lie in `(0, 1)`.
pub fn check_delta(delta: f64) -> Result<f64, Error> {
    if delta > 0.0 && delta < 1.0 {
        Ok(delta)
    } else {
        Err(invalid("delta", delta, "must be in (0, 1)"))
    }
}

fn invalid(argument: &'static str, value: impl ToString, reason: &str) -> Error {
    Error::new(ErrorKind::Validation, format!("invalid {argument}: {reason}"))
    .with_context("argument", argument)
    .with_context("value", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_each_argument() {
        let cases = [
            (JobConfig::builder("in").epsilon_delta(0.0, 0.1), "epsilon"),
            (JobConfig::builder("in").epsilon_delta(f64::INFINITY, 0.1), "epsilon"),
            (JobConfig::builder("in").epsilon_delta(0.1, 0.0), "delta"),
            (JobConfig::builder("in").dimensions(0, 3), "width"),
            (JobConfig::builder("in").dimensions(3, 0), "depth"),
            (JobConfig::builder("in").workers(0), "workers"),
            (JobConfig::builder("in").buffer_records(0), "buffer_records"),
            (JobConfig::builder(""), "input"),
        ];
        for (builder, argument) in cases {
            let err = builder.build().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert_eq!(err.context("argument"), Some(argument));
        }
    }

    #[test]
    fn test_error_bound_checks() {
        assert!(check_epsilon(1e-9).is_ok());
        assert!(check_epsilon(f64::NAN).is_err());
        assert!(check_epsilon(-0.5).is_err());
        assert!(check_delta(0.5).is_ok());
        for delta in [0.0, 1.0, 5.0, f64::NAN] {
            let err = check_delta(delta).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert_eq!(err.context("argument"), Some("delta"));
        }
    }

    #[test]
    fn test_defaults() {
        let config = JobConfig::builder("in")
            .record_format(RecordFormat::Ipv4Mapped)
            .build()
            .unwrap();
        assert!(config.workers() >= 1);
        assert_eq!(config.buffer_records(), DEFAULT_BUFFER_BYTES / 16);
        assert_eq!(config.seed(), DEFAULT_SEED);
        assert!(!config.read_ahead());
        assert_eq!(config.size(), SketchSize::default());
    }

    #[test]
    fn test_sketches_are_mergeable() {
        let config = JobConfig::builder("in").dimensions(100, 4).seed(3).build().unwrap();
        let mut a = config.new_sketch().unwrap();
        let b = config.new_sketch().unwrap();
        assert_eq!(a.width(), 100);
        assert_eq!(a.seed(), 3);
        a.merge(&b).unwrap();
    }
}
