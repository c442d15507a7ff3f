use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::thread::JoinHandle;
use crossbeam_channel::{select, Receiver, Sender};
use crate::model::{FileOutcome, ManifestEntry};

/// How many outcomes may wait for the writer before senders block.
pub const QUEUE_CAPACITY: usize = 200;

/// Appends outcomes to a JSON-lines manifest from a background thread.
///
/// Senders block while [`QUEUE_CAPACITY`] outcomes are pending, which slows the
/// whole pool down to the speed of the disk. Stop sending before calling [`close`](Self::close):
/// anything sent afterwards may be lost.
pub struct ManifestWriter {
    input: Sender<FileOutcome>,
    please_exit: Sender<()>,
    handle: JoinHandle<io::Result<u64>>,
}

impl ManifestWriter {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Self::from_writer(BufWriter::new(file))
    }

    pub fn from_writer<W: Write + Send + 'static>(out: W) -> io::Result<Self> {
        let (input, rx) = crossbeam_channel::bounded(QUEUE_CAPACITY);
        let (please_exit, exit_rx) = crossbeam_channel::bounded(1);

        let handle = std::thread::Builder::new()
            .name("manifest-writer".into())
            .spawn(move || drain(out, &rx, &exit_rx))?;

        Ok(Self { input, please_exit, handle })
    }

    pub fn sender(&self) -> Sender<FileOutcome> {
        self.input.clone()
    }

    /// Writes what is already queued, flushes, and returns how many entries were written in total.
    pub fn close(self) -> io::Result<u64> {
        self.please_exit.send(()).unwrap_or_default();
        drop(self.input);

        self.handle
            .join()
            .map_err(|_| io::Error::other("manifest writer panicked"))?
    }
}

fn drain<W: Write>(mut out: W, rx: &Receiver<FileOutcome>, exit_rx: &Receiver<()>) -> io::Result<u64> {
    let mut written = 0;
    loop {
        select! {
            recv(rx) -> outcome => match outcome {
                Ok(outcome) => written += write_entry(&mut out, &outcome),
                Err(_) => break,
            },
            recv(exit_rx) -> _ => break,
        }
    }

    for outcome in rx.try_iter() {
        written += write_entry(&mut out, &outcome);
    }

    out.flush()?;
    Ok(written)
}

// a line that fails to serialize or write is logged and skipped
fn write_entry<W: Write>(out: &mut W, outcome: &FileOutcome) -> u64 {
    let mut line = match serde_json::to_vec(&ManifestEntry::from(outcome)) {
        Ok(line) => line,
        Err(e) => {
            tracing::error!("error creating json for '{}': {e}", outcome.path);
            return 0;
        }
    };
    line.push(b'\n');

    match out.write_all(&line) {
        Ok(()) => 1,
        Err(e) => {
            tracing::error!("error writing to manifest: {e}");
            0
        }
    }
}
