//! Background status indicator.
//!
//! Mirrors the session's [`StatusBoard`] into a small JSON file that a tray
//! applet or status bar can watch. The thread only reads; the frame loop
//! stays the single writer.

use lookalive_core::{StatusBoard, TrayStatus};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct Indicator {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Indicator {
    pub fn spawn(board: StatusBoard, path: PathBuf) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = std::thread::spawn(move || {
            let mut last: Option<TrayStatus> = None;
            loop {
                // Read the flag first so the final status is always written.
                let keep_going = flag.load(Ordering::Acquire);
                let status = board.current();
                if last.as_ref() != Some(&status) {
                    write_status(&path, &status);
                    last = Some(status);
                }
                if !keep_going {
                    break;
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        });
        Self {
            running,
            handle: Some(handle),
        }
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("status indicator thread panicked");
            }
        }
    }
}

impl Drop for Indicator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn write_status(path: &Path, status: &TrayStatus) {
    let body = serde_json::json!({
        "title": status.title(),
        "text": status.text,
        "color": status.color,
        "minimized": status.minimized,
    });
    if let Err(e) = std::fs::write(path, body.to_string()) {
        tracing::warn!("failed to write status file {}: {e}", path.display());
    }
}
