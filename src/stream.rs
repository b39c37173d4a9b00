//! Ordered work queues.
//!
//! A [`Stream`] owns a dedicated worker thread and executes submitted tasks
//! strictly in submission order. Work on different streams is unordered with
//! respect to each other. Asynchronous container operations enqueue onto a
//! stream and return immediately; [`Stream::synchronize`] blocks until every
//! previously submitted task has finished.

use std::sync::mpsc;
use std::sync::Mutex;
use std::thread::JoinHandle;

use crate::error::{Error, Result};

type Task = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Task(Task),
    Sync(mpsc::Sender<()>),
}

/// An in-order asynchronous work queue backed by one worker thread.
pub struct Stream {
    sender: Mutex<Option<mpsc::Sender<Message>>>,
    worker: Option<JoinHandle<()>>,
}

impl Stream {
    /// Spawns the worker thread and returns the stream.
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel::<Message>();
        let worker = std::thread::Builder::new()
            .name("static-table-stream".into())
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    match message {
                        Message::Task(task) => task(),
                        Message::Sync(done) => {
                            // Receiver may have given up waiting; nothing to do.
                            let _ = done.send(());
                        }
                    }
                }
            })
            .ok();
        Self {
            sender: Mutex::new(Some(sender)),
            worker,
        }
    }

    /// Submits a task for in-order execution.
    ///
    /// Fails with [`Error::StreamClosed`] if the worker has shut down, which
    /// happens when a previously submitted task panicked.
    pub(crate) fn enqueue<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = match self.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let sender = guard.as_ref().ok_or(Error::StreamClosed)?;
        sender
            .send(Message::Task(Box::new(task)))
            .map_err(|_| Error::StreamClosed)
    }

    /// Blocks until every previously submitted task has completed.
    pub fn synchronize(&self) -> Result<()> {
        let (done_tx, done_rx) = mpsc::channel();
        {
            let guard = match self.sender.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let sender = guard.as_ref().ok_or(Error::StreamClosed)?;
            sender
                .send(Message::Sync(done_tx))
                .map_err(|_| Error::StreamClosed)?;
        }
        done_rx.recv().map_err(|_| Error::StreamClosed)
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }
        if let Some(worker) = self.worker.take() {
            // A panicked worker already ran to completion; nothing to report.
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn tasks_run_in_submission_order() -> Result<()> {
        let stream = Stream::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..10 {
            let order = Arc::clone(&order);
            stream.enqueue(move || {
                order.lock().unwrap().push(i);
            })?;
        }
        stream.synchronize()?;
        assert_eq!(*order.lock().unwrap(), (0..10).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn synchronize_waits_for_pending_work() -> Result<()> {
        let stream = Stream::new();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            stream.enqueue(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            })?;
        }
        stream.synchronize()?;
        assert_eq!(counter.load(Ordering::Relaxed), 100);
        Ok(())
    }

    #[test]
    fn panicked_task_closes_the_stream() {
        let stream = Stream::new();
        stream
            .enqueue(|| panic!("task failure"))
            .expect("stream is open");
        // The worker is gone after the panic; later submissions fail.
        while stream.enqueue(|| {}).is_ok() {
            std::thread::yield_now();
        }
        assert!(matches!(stream.synchronize(), Err(Error::StreamClosed)));
    }
}
