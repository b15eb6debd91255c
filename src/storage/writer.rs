//! Background persistence for the sample store.
//!
//! The engine hands over a deep copy of its samples on every change; only the
//! newest copy is kept. A worker thread writes it once `min_interval` has
//! passed since the previous write, so a burst of calibration clicks costs a
//! single file write. `flush` writes synchronously for shutdown paths.

use crate::engine::sample::Sample;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

struct PendingWrite {
    path: PathBuf,
    samples: Vec<Sample>,
}

#[derive(Default)]
struct WriterState {
    pending: Option<PendingWrite>,
    last_write: Option<Instant>,
}

struct Shared {
    state: Mutex<WriterState>,
    // Held across a whole write so files land in scheduling order.
    io: Mutex<()>,
    writes: AtomicUsize,
}

pub struct DebouncedWriter {
    shared: Arc<Shared>,
    is_running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DebouncedWriter {
    pub fn new(min_interval: Duration) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(WriterState::default()),
            io: Mutex::new(()),
            writes: AtomicUsize::new(0),
        });
        let is_running = Arc::new(AtomicBool::new(true));

        let running = is_running.clone();
        let worker = shared.clone();
        let handle = std::thread::spawn(move || {
            log::debug!("Calibration writer thread started");
            while running.load(Ordering::SeqCst) {
                std::thread::sleep(POLL_INTERVAL);
                let due = {
                    let state = lock(&worker.state);
                    state.pending.is_some()
                        && state
                            .last_write
                            .map_or(true, |t| t.elapsed() >= min_interval)
                };
                if due {
                    write_pending(&worker);
                }
            }
            log::debug!("Calibration writer thread stopped");
        });

        Self {
            shared,
            is_running,
            handle: Some(handle),
        }
    }

    /// Replace whatever is pending with this copy.
    pub fn schedule(&self, path: PathBuf, samples: Vec<Sample>) {
        lock(&self.shared.state).pending = Some(PendingWrite { path, samples });
    }

    pub fn has_pending(&self) -> bool {
        lock(&self.shared.state).pending.is_some()
    }

    /// Write the pending copy now, on the calling thread.
    pub fn flush(&self) {
        write_pending(&self.shared);
    }

    /// Number of completed file writes.
    pub fn writes_completed(&self) -> usize {
        self.shared.writes.load(Ordering::SeqCst)
    }
}

fn write_pending(shared: &Shared) {
    let _io = lock(&shared.io);
    let pending = {
        let mut state = lock(&shared.state);
        let pending = state.pending.take();
        if pending.is_some() {
            state.last_write = Some(Instant::now());
        }
        pending
    };
    let Some(pending) = pending else {
        return;
    };
    match super::write_samples(&pending.path, &pending.samples) {
        Ok(()) => {
            shared.writes.fetch_add(1, Ordering::SeqCst);
        }
        Err(e) => log::error!("Failed to save calibration {}: {:#}", pending.path.display(), e),
    }
}

impl Drop for DebouncedWriter {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Calibration writer thread panicked");
            }
        }
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sample::Shift;
    use crate::storage::read_samples;

    fn samples(n: i32) -> Vec<Sample> {
        (0..n)
            .map(|i| Sample::new(vec![i as f32, 0.0], Shift::new(i, -i)))
            .collect()
    }

    #[test]
    fn test_flush_writes_latest_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        let writer = DebouncedWriter::new(Duration::from_secs(3600));

        writer.schedule(path.clone(), samples(1));
        writer.schedule(path.clone(), samples(3));
        writer.flush();

        assert!(!writer.has_pending());
        assert_eq!(read_samples(&path, 2).unwrap().unwrap(), samples(3));
        assert!((1..=2).contains(&writer.writes_completed()));
    }

    #[test]
    fn test_burst_is_batched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        let writer = DebouncedWriter::new(Duration::from_secs(3600));

        // First write goes out on the next poll, the rest waits for the interval.
        writer.schedule(path.clone(), samples(1));
        let deadline = Instant::now() + Duration::from_secs(5);
        while writer.writes_completed() == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(writer.writes_completed(), 1);

        for n in 2..10 {
            writer.schedule(path.clone(), samples(n));
        }
        std::thread::sleep(POLL_INTERVAL * 4);
        assert_eq!(writer.writes_completed(), 1);
        assert!(writer.has_pending());
    }

    #[test]
    fn test_drop_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        {
            let writer = DebouncedWriter::new(Duration::from_secs(3600));
            writer.schedule(path.clone(), samples(4));
        }
        assert_eq!(read_samples(&path, 2).unwrap().unwrap().len(), 4);
    }

    #[test]
    fn test_flush_without_pending_is_noop() {
        let writer = DebouncedWriter::new(Duration::from_millis(10));
        writer.flush();
        assert_eq!(writer.writes_completed(), 0);
    }
}
