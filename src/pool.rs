use std::sync::Arc;
use std::thread::JoinHandle;
use crossbeam_channel::{Receiver, SendError, Sender};
use crate::activity::Activity;
use crate::model::{FileDescriptor, FileOutcome};
use crate::status::StatusBoard;
use crate::verify::Verifier;

/// What travels over the work queue.
#[derive(Debug)]
pub enum Job {
    Check(FileDescriptor),
    /// Tells exactly one worker to exit.
    Stop,
}

/// A zero-capacity queue: every send waits until some worker takes the job.
pub fn work_queue() -> (Sender<Job>, Receiver<Job>) {
    crossbeam_channel::bounded(0)
}

/// Sends every file, then one [`Job::Stop`] per worker.
///
/// Fails if the receiving side of the queue is gone.
pub fn feed(
    queue: &Sender<Job>,
    files: impl IntoIterator<Item = FileDescriptor>,
    workers: usize,
) -> Result<(), SendError<Job>> {
    for file in files {
        queue.send(Job::Check(file))?;
    }

    for n in 0..workers {
        tracing::debug!("closing worker {n}");
        queue.send(Job::Stop)?;
    }

    Ok(())
}

/// Fixed set of worker threads draining one [`work_queue`].
///
/// Worker ids are handed out from 0 in start order and index the [`StatusBoard`] slots,
/// so `start` must be called exactly as many times as the board has slots.
pub struct WorkerPool {
    queue: Receiver<Job>,
    board: Arc<StatusBoard>,
    verifier: Verifier,
    outcomes: Option<Sender<FileOutcome>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(queue: Receiver<Job>, board: Arc<StatusBoard>, verifier: Verifier) -> Self {
        Self {
            queue,
            board,
            verifier,
            outcomes: None,
            workers: vec![],
        }
    }

    /// Forwards a copy of every outcome to `sink`. Workers block while `sink` is full.
    pub fn set_output(&mut self, sink: Sender<FileOutcome>) {
        self.outcomes = Some(sink);
    }

    pub fn start(&mut self) -> std::io::Result<()> {
        let id = self.workers.len();
        let worker = Worker {
            id,
            queue: self.queue.clone(),
            board: Arc::clone(&self.board),
            verifier: self.verifier.clone(),
            outcomes: self.outcomes.clone(),
        };

        tracing::debug!("starting worker {id}");
        let handle = std::thread::Builder::new()
            .name(format!("worker-{id}"))
            .spawn(move || worker.run())?;
        self.workers.push(handle);

        Ok(())
    }

    /// Waits until every worker has taken its [`Job::Stop`].
    pub fn join(self) {
        for (id, handle) in self.workers.into_iter().enumerate() {
            if handle.join().is_err() {
                tracing::error!("worker {id} panicked");
            }
        }
    }
}

struct Worker {
    id: usize,
    queue: Receiver<Job>,
    board: Arc<StatusBoard>,
    verifier: Verifier,
    outcomes: Option<Sender<FileOutcome>>,
}

impl Worker {
    fn run(self) {
        self.board.update_slot(self.id, Some("."), Some(Activity::Starting));

        // a closed queue ends the worker the same way a stop does
        while let Ok(Job::Check(file)) = self.queue.recv() {
            let outcome = self.verifier.verify(self.id, &file, &self.board);
            self.board.add_outcome(&outcome);
            if let Some(sink) = &self.outcomes {
                sink.send(outcome).unwrap_or_else(|_| {
                    tracing::warn!("outcome sink closed; dropping outcome for {}", file.path);
                });
            }
            self.board.update_slot(self.id, Some("."), Some(Activity::Idle));
        }

        tracing::debug!("worker {} exiting", self.id);
        self.board.update_slot(self.id, Some("."), Some(Activity::Exited));
    }
}
