use std::fmt::{Display, Formatter};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;
use crossbeam_channel::{select, tick, Sender};
use tracing::Dispatch;
use crate::activity::{Activity, UNUSED_MARK};
use crate::model::FileOutcome;

/// Aggregate counters. Each one counts the outcomes that had its flag set, `checks` counts all of them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub checks: u64,
    pub misses: u64,
    pub bad_requests: u64,
    pub bad_sizes: u64,
    pub bad_checksums: u64,
    pub read_errors: u64,
}

impl Display for Counters {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Files: {:6}  Misses: {:4}  BadRequest: {}  SizeErrors: {}  Checksums: {}  ReadError: {}",
            self.checks, self.misses, self.bad_requests, self.bad_sizes, self.bad_checksums, self.read_errors,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSlot {
    pub path: String,
    pub activity: &'static str,
    pub mark: char,
}

impl Default for WorkerSlot {
    fn default() -> Self {
        Self {
            path: String::new(),
            activity: "",
            mark: UNUSED_MARK,
        }
    }
}

struct Board {
    counters: Counters,
    bad_paths: Vec<String>,
    slots: Vec<WorkerSlot>,
}

/// Shared tally of a run: written by every worker, read by the printer and at shutdown.
///
/// Every read and write goes through one mutex, so a snapshot never shows half of an update.
pub struct StatusBoard {
    board: Mutex<Board>,
}

impl StatusBoard {
    pub fn new(workers: usize) -> Self {
        Self {
            board: Mutex::new(Board {
                counters: Counters::default(),
                bad_paths: vec![],
                slots: vec![WorkerSlot::default(); workers],
            }),
        }
    }

    // a panicking worker cannot leave the board half-updated: every critical section is a single step
    fn lock(&self) -> MutexGuard<'_, Board> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_outcome(&self, outcome: &FileOutcome) {
        let mut board = self.lock();
        let counters = &mut board.counters;
        counters.checks += 1;

        if outcome.miss {
            counters.misses += 1;
        }
        if outcome.bad_request {
            counters.bad_requests += 1;
        }
        if outcome.bad_size {
            counters.bad_sizes += 1;
        }
        if outcome.read_error {
            counters.read_errors += 1;
        }
        if outcome.bad_checksum {
            counters.bad_checksums += 1;
            board.bad_paths.push(outcome.path.clone());
        }
    }

    /// Overwrites the given fields of a worker's slot; `None` keeps the current value.
    ///
    /// # Panics
    /// If `worker` is not below the worker count the board was created with.
    pub fn update_slot(&self, worker: usize, path: Option<&str>, activity: Option<Activity>) {
        let mut board = self.lock();
        let slot = &mut board.slots[worker];

        if let Some(path) = path.filter(|p| !p.is_empty()) {
            path.clone_into(&mut slot.path);
        }
        if let Some(activity) = activity {
            slot.activity = activity.label();
            slot.mark = activity.mark();
        }
    }

    /// One line: every worker's mark in slot order, then the counters.
    pub fn snapshot(&self) -> String {
        let board = self.lock();
        let marks: String = board.slots.iter().map(|s| s.mark).collect();

        format!("{marks} {}", board.counters)
    }

    pub fn counters(&self) -> Counters {
        self.lock().counters
    }

    /// Paths whose checksum did not match, in the order they were reported.
    pub fn bad_paths(&self) -> Vec<String> {
        self.lock().bad_paths.clone()
    }

    pub fn slots(&self) -> Vec<WorkerSlot> {
        self.lock().slots.clone()
    }

    /// Logs a snapshot every `interval` until the returned handle is told to quit.
    ///
    /// The printer logs through the subscriber that is current on the calling thread.
    pub fn spawn_printer(self: &Arc<Self>, interval: Duration) -> io::Result<Printer> {
        let (please_exit, exit_rx) = crossbeam_channel::bounded::<()>(1);
        let board = Arc::clone(self);
        let dispatch = tracing::dispatcher::get_default(Dispatch::clone);

        let handle = std::thread::Builder::new()
            .name("status-printer".into())
            .spawn(move || {
                tracing::dispatcher::with_default(&dispatch, || {
                    let ticker = tick(interval);
                    loop {
                        select! {
                            recv(exit_rx) -> _ => break,
                            recv(ticker) -> _ => {
                                tracing::info!("{}", board.snapshot());
                                for (worker, slot) in board.slots().iter().enumerate() {
                                    tracing::debug!(worker, "{} {}", slot.activity, slot.path);
                                }
                            }
                        }
                    }
                });
            })?;

        Ok(Printer { please_exit, handle })
    }
}

pub struct Printer {
    please_exit: Sender<()>,
    handle: JoinHandle<()>,
}

impl Printer {
    /// Stops the printer and waits for it; it never prints again after this returns.
    pub fn quit(self) {
        // the printer only ever exits after receiving this, so a failed send means it already panicked
        self.please_exit.send(()).unwrap_or_default();
        if self.handle.join().is_err() {
            tracing::error!("status printer panicked");
        }
    }
}
