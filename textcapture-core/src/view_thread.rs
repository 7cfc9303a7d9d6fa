//! Synchronous hop onto the thread that owns view mutations.
//!
//! Overlay attach/detach must be visible to the caller once the triggering
//! call returns, so [`ViewDispatcher::dispatch_sync`] blocks until the task
//! has run. Dispatching from the view thread itself runs the task inline.

use std::thread::{self, JoinHandle, ThreadId};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info};

use crate::error::{Result, TextCaptureError};

/// Unit of view work.
pub type ViewTask = Box<dyn FnOnce() + Send + 'static>;

pub trait ViewDispatcher: Send + Sync {
    /// Run `task` on the view thread and return once it has completed.
    ///
    /// # Errors
    /// `TextCaptureError::ViewThreadUnavailable` if the task could not run.
    fn dispatch_sync(&self, task: ViewTask) -> Result<()>;
}

/// Runs every task on the calling thread. For hosts whose lifecycle
/// notifications already arrive on the view thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl ViewDispatcher for InlineDispatcher {
    fn dispatch_sync(&self, task: ViewTask) -> Result<()> {
        task();
        Ok(())
    }
}

type Job = (ViewTask, Sender<()>);

/// A dedicated thread owning all view mutations.
pub struct ViewThread {
    jobs: Option<Sender<Job>>,
    thread_id: ThreadId,
    handle: Option<JoinHandle<()>>,
}

impl ViewThread {
    pub fn spawn(name: &str) -> Result<Self> {
        let (jobs, rx) = crossbeam_channel::unbounded::<Job>();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(rx))
            .map_err(|e| TextCaptureError::Other(e.into()))?;
        let thread_id = handle.thread().id();
        info!(thread = name, "view thread started");
        Ok(Self {
            jobs: Some(jobs),
            thread_id,
            handle: Some(handle),
        })
    }

    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }
}

fn run(rx: Receiver<Job>) {
    for (task, done) in rx {
        task();
        let _ = done.send(());
    }
    debug!("view thread exiting");
}

impl ViewDispatcher for ViewThread {
    fn dispatch_sync(&self, task: ViewTask) -> Result<()> {
        if self.is_current() {
            task();
            return Ok(());
        }
        let jobs = self
            .jobs
            .as_ref()
            .ok_or(TextCaptureError::ViewThreadUnavailable)?;
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        jobs.send((task, done_tx))
            .map_err(|_| TextCaptureError::ViewThreadUnavailable)?;
        // Disconnects without a message if the task panicked.
        done_rx
            .recv()
            .map_err(|_| TextCaptureError::ViewThreadUnavailable)
    }
}

impl Drop for ViewThread {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if self.is_current() {
                return;
            }
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for ViewThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewThread")
            .field("thread_id", &self.thread_id)
            .finish_non_exhaustive()
    }
}
