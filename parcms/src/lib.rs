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

//! Parallel frequency estimation over files of fixed-width records.
//!
//! The input (for example a file of packed IPv4 addresses) is split into one contiguous
//! [`partition`] per worker. Every worker streams its slice through a bounded buffer
//! ([`reader`]) into its own [Count-Min sketch](countmin), and the local sketches are
//! reduced into one ([`aggregate`]) once every worker has finished.
//!
//! ```no_run
//! use parcms::config::JobConfig;
//! use parcms::exec_log::FileExecutionLogger;
//!
//! let config = JobConfig::builder("ips.bin")
//!     .epsilon_delta(0.001, 0.01)
//!     .workers(8)
//!     .build()?;
//! let report = parcms::job::run_and_log(&config, &FileExecutionLogger::new("runs.csv"))?;
//! println!("10.0.0.1 seen ~{} times", report.sketch.estimate(0x0a000001));
//! # Ok::<(), parcms::error::Error>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod aggregate;
pub mod common;
pub mod config;
pub mod countmin;
pub mod error;
pub mod exec_log;
pub mod hash;
pub mod job;
pub mod partition;
pub mod reader;
pub mod record;
