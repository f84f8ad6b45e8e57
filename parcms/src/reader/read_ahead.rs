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

use std::io::Read;
use std::io::Seek;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use crate::countmin::CountMinSketch;
use crate::error::Error;
use crate::reader::ChunkedReader;
use crate::reader::PhaseTimes;
use crate::reader::aborted;
use crate::reader::chunked::allocate_buffer;

/// Number of buffers circulating between the reader thread and the sketch updater.
///
/// With two buffers the updater consumes one while the other is being filled, so at most
/// one read is ever in flight.
const NUM_BUFFERS: usize = 2;

type Filled = Result<(Vec<u8>, usize), Error>;

/// A [`ChunkedReader`] that reads the next chunk on a helper thread while the current chunk
/// is being added to the sketch.
///
/// Chunks are consumed in read order, so the resulting sketch is identical to the one
/// built by [`ChunkedReader::feed`].
#[derive(Debug)]
pub struct ReadAhead<R> {
    reader: ChunkedReader<R>,
    spare: Vec<u8>,
}

impl<R: Read + Seek + Send> ReadAhead<R> {
    /// Wraps `reader`, allocating its second buffer.
    pub fn new(reader: ChunkedReader<R>) -> Result<Self, Error> {
        let spare = allocate_buffer(reader.format(), reader.partition(), reader.capacity())?;
        Ok(Self { reader, spare })
    }

    /// Reads the records of the whole partition into `sketch`.
    ///
    /// `wait` in the returned times is how long the updater sat idle waiting for data.
    pub fn feed(
        self,
        sketch: &mut CountMinSketch,
        cancel: &AtomicBool,
    ) -> Result<PhaseTimes, Error> {
        let ReadAhead { mut reader, spare } = self;
        let format = reader.format();
        let width = format.width();
        let partition = *reader.partition();
        let expected = reader.remaining();
        let primary = reader.take_buffer();

        let (filled_tx, filled_rx) = mpsc::sync_channel::<Filled>(NUM_BUFFERS);
        let (free_tx, free_rx) = mpsc::sync_channel::<Vec<u8>>(NUM_BUFFERS);

        thread::scope(|s| {
            let io = thread::Builder::new()
                .name(format!("parcms-read-{}", partition.worker_index()))
                .spawn_scoped(s, move || {
                    let mut free = vec![primary, spare];
                    let mut io_time = Duration::ZERO;
                    loop {
                        let mut buf = match free.pop() {
                            Some(buf) => buf,
                            None => match free_rx.recv() {
                                Ok(buf) => buf,
                                Err(_) => break,
                            },
                        };
                        if cancel.load(Ordering::Relaxed) {
                            break;
                        }

                        let start = Instant::now();
                        let read = reader.read_chunk(&mut buf);
                        io_time += start.elapsed();
                        match read {
                            Ok(0) => break,
                            Ok(n) => {
                                if filled_tx.send(Ok((buf, n))).is_err() {
                                    break;
                                }
                            }
                            Err(err) => {
                                let _ = filled_tx.send(Err(err));
                                break;
                            }
                        }
                    }
                    io_time
                })?;

            let mut times = PhaseTimes::default();
            let mut consumed = 0u64;
            let mut result = Ok(());
            loop {
                let start = Instant::now();
                let message = filled_rx.recv();
                times.wait += start.elapsed();

                match message {
                    // the reader thread is done and everything it sent has been drained
                    Err(_) => break,
                    Ok(Err(err)) => {
                        result = Err(err);
                        break;
                    }
                    Ok(Ok((buf, n))) => {
                        let start = Instant::now();
                        sketch.batch_update(format.keys(&buf[..n * width]));
                        times.compute += start.elapsed();
                        consumed += n as u64;
                        // fails only once the reader has exited; queued chunks stay readable
                        let _ = free_tx.send(buf);
                    }
                }

                if cancel.load(Ordering::Relaxed) {
                    result = Err(aborted(&partition));
                    break;
                }
            }
            drop(free_tx);
            drop(filled_rx);

            times.io = io
                .join()
                .map_err(|payload| Error::from_panic("reader", payload.as_ref()))?;

            if result.is_ok() && consumed < expected {
                result = Err(aborted(&partition));
            }
            result.map(|()| times)
        })
    }
}
