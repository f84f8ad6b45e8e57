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

//! The parallel counting pipeline.
//!
//! 1. The input size is validated and turned into a record count.
//! 2. One scoped thread per worker opens its own handle on the input, sketches its
//!    [`Partition`] and returns the local sketch. Workers share nothing but a cancellation
//!    flag.
//! 3. After every worker has been joined, the local sketches are reduced by an
//!    [`Aggregator`]. If any worker failed, the job fails and nothing is reduced.

use std::fs;
use std::fs::File;
use std::io;
use std::io::Read;
use std::io::Seek;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use crate::aggregate::Aggregator;
use crate::config::JobConfig;
use crate::countmin::CountMinSketch;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::exec_log::ExecutionLogger;
use crate::exec_log::RunSummary;
use crate::partition::Partition;
use crate::reader::ChunkedReader;
use crate::reader::PhaseTimes;
use crate::reader::ReadAhead;

/// Outcome of one worker's pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerReport {
    /// The slice of the input the worker sketched.
    pub partition: Partition,
    /// Time spent per phase.
    pub phases: PhaseTimes,
    /// Wall-clock duration of the worker, allocation included.
    pub elapsed: Duration,
}

/// Outcome of a successful job.
#[derive(Debug, Clone)]
pub struct JobReport {
    /// The reduced sketch of the whole input.
    pub sketch: CountMinSketch,
    /// Number of records in the input.
    pub total_records: u64,
    /// Per-worker reports, in worker order.
    pub workers: Vec<WorkerReport>,
    /// Wall-clock duration of the job.
    pub elapsed: Duration,
}

impl JobReport {
    /// Summarizes the run for the execution log, using worker 0's phase times.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            workers: self.workers.len(),
            total_records: self.total_records,
            elapsed: self.elapsed,
            phases: self
                .workers
                .first()
                .map(|w| w.phases)
                .unwrap_or_default(),
        }
    }
}

/// Runs the job and appends its summary to `logger`.
///
/// A failed append is logged as a warning and does not fail the job.
pub fn run_and_log(config: &JobConfig, logger: &dyn ExecutionLogger) -> Result<JobReport, Error> {
    let report = run(config)?;
    if let Err(err) = logger.append(&report.summary()) {
        tracing::warn!(error = %err, "run summary was not recorded");
    }
    Ok(report)
}

/// Counts the records of `config.input()` and returns the reduced sketch.
///
/// # Errors
///
/// - [`ErrorKind::Validation`] if the input is missing or its size is not a multiple of the
///   record width. No worker is started in that case.
/// - The first error of any worker ([`ErrorKind::Allocation`], [`ErrorKind::Io`],
///   [`ErrorKind::ShortRead`], [`ErrorKind::Panicked`], ...). The remaining workers are
///   cancelled.
pub fn run(config: &JobConfig) -> Result<JobReport, Error> {
    run_with_source(config, |_| {
        File::open(config.input())
            .map_err(|err| Error::from(err).with_context("path", config.input().display()))
    })
}

/// Like [`run`], but every worker obtains its handle on the input from `open`.
///
/// The record count is still derived from the size of `config.input()`; each source `open`
/// returns is expected to hold the same bytes.
pub fn run_with_source<R, F>(config: &JobConfig, open: F) -> Result<JobReport, Error>
where
    R: Read + Seek + Send,
    F: Fn(&Partition) -> Result<R, Error> + Sync,
{
    let started = Instant::now();
    let total_records = count_records(config)?;
    let partitions = Partition::all(total_records, config.workers())?;
    tracing::info!(
        input = %config.input().display(),
        total_records,
        workers = partitions.len(),
        read_ahead = config.read_ahead(),
        "starting count"
    );

    let cancel = AtomicBool::new(false);
    let results: Vec<Result<(CountMinSketch, WorkerReport), Error>> = thread::scope(|s| {
        let handles: Vec<_> = partitions
            .iter()
            .map(|&partition| {
                let cancel = &cancel;
                let open = &open;
                let spawned = thread::Builder::new()
                    .name(format!("parcms-worker-{}", partition.worker_index()))
                    .spawn_scoped(s, move || {
                        let result = panic::catch_unwind(AssertUnwindSafe(|| {
                            run_worker(config, partition, cancel, open)
                        }))
                        .unwrap_or_else(|payload| {
                            Err(Error::from_panic("worker", payload.as_ref()))
                        });
                        match result {
                            Err(err) if err.kind() != ErrorKind::Aborted => {
                                cancel.store(true, Ordering::Relaxed);
                                tracing::error!(
                                    worker = partition.worker_index(),
                                    error = %err,
                                    "worker failed"
                                );
                                Err(err.with_context("worker", partition.worker_index()))
                            }
                            other => other,
                        }
                    });
                if spawned.is_err() {
                    cancel.store(true, Ordering::Relaxed);
                }
                spawned
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle {
                Ok(handle) => handle.join().unwrap_or_else(|payload| {
                    Err(Error::from_panic("worker", payload.as_ref()))
                }),
                Err(err) => Err(Error::from(err)),
            })
            .collect()
    });

    let mut locals = Vec::with_capacity(results.len());
    let mut failure: Option<Error> = None;
    for result in results {
        match result {
            Ok(local) => locals.push(local),
            Err(err) => {
                let replace = failure.as_ref().is_none_or(|first| {
                    first.kind() == ErrorKind::Aborted && err.kind() != ErrorKind::Aborted
                });
                if replace {
                    failure = Some(err);
                }
            }
        }
    }
    if let Some(err) = failure {
        return Err(err);
    }

    let mut aggregator = Aggregator::new(locals.len());
    let mut workers = Vec::with_capacity(locals.len());
    for (sketch, report) in locals {
        aggregator.merge(sketch)?;
        workers.push(report);
    }
    let sketch = aggregator.finish()?;

    let elapsed = started.elapsed();
    tracing::info!(
        total_records,
        total_weight = sketch.total_weight(),
        elapsed_secs = elapsed.as_secs_f64(),
        "count finished"
    );
    Ok(JobReport {
        sketch,
        total_records,
        workers,
        elapsed,
    })
}

/// Returns the number of records in the input, rejecting a size that is not a whole number
/// of records.
fn count_records(config: &JobConfig) -> Result<u64, Error> {
    let path = config.input();
    let metadata = fs::metadata(path).map_err(|err| {
        let error = if err.kind() == io::ErrorKind::NotFound {
            Error::new(ErrorKind::Validation, "input file does not exist")
        } else {
            Error::new(ErrorKind::Io, "failed to stat input file")
        };
        error.with_context("path", path.display()).set_source(err)
    })?;
    if !metadata.is_file() {
        return Err(Error::new(ErrorKind::Validation, "input is not a regular file")
            .with_context("path", path.display()));
    }

    let file_size = metadata.len();
    let record_width = config.record_format().width() as u64;
    if file_size % record_width != 0 {
        return Err(Error::new(
            ErrorKind::Validation,
            "file size is not a multiple of the record width",
        )
        .with_context("path", path.display())
        .with_context("file_size", file_size)
        .with_context("record_width", record_width));
    }
    Ok(file_size / record_width)
}

fn run_worker<R, F>(
    config: &JobConfig,
    partition: Partition,
    cancel: &AtomicBool,
    open: &F,
) -> Result<(CountMinSketch, WorkerReport), Error>
where
    R: Read + Seek + Send,
    F: Fn(&Partition) -> Result<R, Error>,
{
    let started = Instant::now();
    let mut sketch = config.new_sketch()?;
    let source = open(&partition)?;
    let mut reader = ChunkedReader::new(
        source,
        config.record_format(),
        partition,
        config.buffer_records(),
    )?;

    let phases = if config.read_ahead() {
        ReadAhead::new(reader)?.feed(&mut sketch, cancel)?
    } else {
        reader.feed(&mut sketch, cancel)?
    };

    let elapsed = started.elapsed();
    tracing::info!(
        worker = partition.worker_index(),
        records = partition.count(),
        bytes = partition.byte_len(config.record_format().width()),
        io_secs = phases.io.as_secs_f64(),
        compute_secs = phases.compute.as_secs_f64(),
        wait_secs = phases.wait.as_secs_f64(),
        "worker processed its partition"
    );
    Ok((
        sketch,
        WorkerReport {
            partition,
            phases,
            elapsed,
        },
    ))
}
