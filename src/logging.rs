//! A background-thread logger installed as the global [`log`] facade
//! target, so that logging calls never block the caller on file I/O.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::thread::JoinHandle;

enum Entry {
    Record {
        level: log::Level,
        target: String,
        message: String,
    },
    Flush(flume::Sender<()>),
}

struct Logger {
    sender: flume::Sender<Entry>,
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _ = self.sender.send(Entry::Record {
            level: record.level(),
            target: record.target().to_string(),
            message: format!("{}", record.args()),
        });
    }

    fn flush(&self) {}
}

/// Handle to the background logging thread.
///
/// The global `log` facade holds its own sender clone for the lifetime
/// of the process, so the channel never naturally disconnects; this
/// handle exists to let callers (mainly tests) block until every record
/// sent *so far* has been written.
pub struct LoggerHandle {
    sender: flume::Sender<Entry>,
    _worker: JoinHandle<()>,
}

impl LoggerHandle {
    /// Blocks until every record enqueued before this call has been
    /// written to its sink(s).
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = flume::bounded(1);
        if self.sender.send(Entry::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

/// Installs the global logger, writing to stderr and, if `log_file` is
/// given, appending to that file as well. Must be called once, early in
/// `main`.
pub fn init(max_level: log::LevelFilter, log_file: Option<PathBuf>) -> LoggerHandle {
    let (sender, receiver) = flume::unbounded::<Entry>();

    let worker = std::thread::Builder::new()
        .name("weave-logger".to_string())
        .spawn(move || {
            let mut file = log_file.and_then(|path| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .map_err(|e| eprintln!("weave logger: could not open {path:?}: {e}"))
                    .ok()
            });

            while let Ok(entry) = receiver.recv() {
                match entry {
                    Entry::Record {
                        level,
                        target,
                        message,
                    } => {
                        let line = format!("[{level}] {target}: {message}");
                        eprintln!("{line}");
                        if let Some(file) = file.as_mut() {
                            let _ = writeln!(file, "{line}");
                            let _ = file.flush();
                        }
                    }
                    Entry::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        })
        .expect("failed to spawn logger thread");

    let logger = Logger {
        sender: sender.clone(),
    };
    log::set_max_level(max_level);
    if log::set_boxed_logger(Box::new(logger)).is_err() {
        log::warn!("weave_rg::logging::init called more than once; ignoring");
    }

    LoggerHandle {
        sender,
        _worker: worker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    static INSTALLED: AtomicBool = AtomicBool::new(false);

    #[test]
    fn init_and_flush_round_trip() {
        // log::set_boxed_logger succeeds only once per process; guard so
        // this test is safe to run alongside others in the same binary.
        if INSTALLED.swap(true, Ordering::SeqCst) {
            return;
        }
        let handle = init(log::LevelFilter::Info, None);
        log::info!("hello from a test");
        handle.flush(); // must return once the record above is written
    }
}
