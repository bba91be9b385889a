// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fixed-size pool of background threads used by `task` nodes.

use crossbeam_channel::{Receiver, Sender};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Cloneable submission handle to a [`WorkerPool`].
///
/// Jobs capture a `Spawner` rather than the pool itself so that nested task
/// nodes can submit work without keeping the pool alive from a worker thread.
#[derive(Clone)]
pub struct Spawner {
    sender: Option<Sender<Job>>,
}

impl Spawner {
    /// Queues a job. Returns `false` if the pool is shutting down.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> bool {
        match &self.sender {
            Some(sender) => sender.send(Box::new(job)).is_ok(),
            None => false,
        }
    }
}

/// A set of named worker threads consuming jobs from one shared queue.
///
/// Dropping the pool closes its end of the queue, lets the workers drain the
/// jobs already submitted, and joins them. Every [`Spawner`] must be dropped
/// before the pool for the workers to exit.
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `threads` workers (at least one).
    pub fn new(threads: usize) -> io::Result<Self> {
        let threads = threads.max(1);
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();

        let mut handles = Vec::with_capacity(threads);
        for index in 0..threads {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("khora-pipeline-worker-{index}"))
                .spawn(move || worker_loop(receiver))?;
            handles.push(handle);
        }

        log::info!("Pipeline worker pool started with {threads} thread(s).");
        Ok(Self {
            sender: Some(sender),
            handles,
        })
    }

    /// Returns a submission handle.
    pub fn spawner(&self) -> Spawner {
        Spawner {
            sender: self.sender.clone(),
        }
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.handles.len()
    }
}

fn worker_loop(receiver: Receiver<Job>) {
    while let Ok(job) = receiver.recv() {
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            log::error!(
                "Pipeline job panicked on {}.",
                thread::current().name().unwrap_or("unnamed worker")
            );
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.sender.take();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::warn!("A pipeline worker thread terminated abnormally.");
            }
        }
        log::info!("Pipeline worker pool stopped.");
    }
}
