//! Clipboard copy with a timed, cancellable clear.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use arboard::Clipboard;

/// Cancel channel of the most recent pending clear. A fresh copy
/// supersedes the previous one so the new value gets its own full
/// timeout instead of being wiped on the old schedule.
static PENDING: Mutex<Option<Sender<()>>> = Mutex::new(None);

/// Read/write access to a clipboard.
///
/// The system implementation opens a short-lived handle per operation so
/// the clear thread never holds a platform clipboard across its wait.
trait ClipboardBackend: Send + 'static {
    fn read(&mut self) -> Option<String>;
    fn write(&mut self, text: String) -> Result<()>;
}

struct SystemClipboard;

impl ClipboardBackend for SystemClipboard {
    fn read(&mut self) -> Option<String> {
        Clipboard::new().ok()?.get_text().ok()
    }

    fn write(&mut self, text: String) -> Result<()> {
        Clipboard::new()
            .context("clipboard unavailable")?
            .set_text(text)
            .context("failed to write to clipboard")
    }
}

/// Handle for a scheduled clipboard clear.
pub struct PendingClear {
    cancel: Sender<()>,
    handle: JoinHandle<()>,
}

impl PendingClear {
    /// Cancel the scheduled clear, leaving the clipboard untouched.
    pub fn cancel(self) {
        let _ = self.cancel.send(());
        let _ = self.handle.join();
    }

    /// Block until the clear has run. A CLI process must outlive the
    /// timeout for the clear to happen at all.
    pub fn wait(self) {
        let _ = self.handle.join();
    }
}

/// Copy `value` to the clipboard and schedule a clear after `timeout`.
///
/// Returns immediately. The clear only runs if the clipboard still
/// holds the copied value, so anything the user copies in the interim
/// is left alone. Any clear still pending from an earlier copy is
/// cancelled.
pub fn copy_with_clear(value: &str, timeout: Duration) -> Result<PendingClear> {
    SystemClipboard.write(value.to_string())?;
    let pending = schedule_clear(SystemClipboard, value.to_string(), timeout)?;
    register_pending(&pending.cancel);
    Ok(pending)
}

/// Cancel the previous pending clear, if any, and remember this one.
fn register_pending(cancel: &Sender<()>) {
    if let Ok(mut slot) = PENDING.lock() {
        if let Some(previous) = slot.replace(cancel.clone()) {
            let _ = previous.send(());
        }
    }
}

fn schedule_clear<B: ClipboardBackend>(
    mut backend: B,
    expected: String,
    timeout: Duration,
) -> Result<PendingClear> {
    let (cancel, cancelled) = mpsc::channel();
    let handle = thread::Builder::new()
        .name("clipboard-clear".to_string())
        .spawn(move || {
            let deadline = Instant::now() + timeout;
            match cancelled.recv_timeout(timeout) {
                // Cancelled or superseded.
                Ok(()) => return,
                Err(RecvTimeoutError::Timeout) => {}
                // Sender dropped without cancelling; still honor the timeout.
                Err(RecvTimeoutError::Disconnected) => {
                    thread::sleep(deadline.saturating_duration_since(Instant::now()));
                }
            }
            clear_if_unchanged(&mut backend, &expected);
        })
        .context("failed to spawn clipboard clear thread")?;

    Ok(PendingClear { cancel, handle })
}

fn clear_if_unchanged<B: ClipboardBackend>(backend: &mut B, expected: &str) {
    if backend.read().as_deref() == Some(expected) {
        if let Err(err) = backend.write(String::new()) {
            tracing::warn!(error = %err, "failed to clear clipboard");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[derive(Clone)]
    struct FakeClipboard(Arc<Mutex<Option<String>>>);

    impl FakeClipboard {
        fn holding(text: &str) -> Self {
            Self(Arc::new(Mutex::new(Some(text.to_string()))))
        }

        fn contents(&self) -> Option<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl ClipboardBackend for FakeClipboard {
        fn read(&mut self) -> Option<String> {
            self.0.lock().unwrap().clone()
        }

        fn write(&mut self, text: String) -> Result<()> {
            *self.0.lock().unwrap() = Some(text);
            Ok(())
        }
    }

    #[test]
    fn clears_when_value_still_held() {
        let clip = FakeClipboard::holding("s3cret");
        let pending =
            schedule_clear(clip.clone(), "s3cret".to_string(), Duration::from_millis(20))
                .unwrap();
        pending.wait();
        assert_eq!(clip.contents().as_deref(), Some(""));
    }

    #[test]
    fn leaves_newer_value_alone() {
        let clip = FakeClipboard::holding("s3cret");
        let pending =
            schedule_clear(clip.clone(), "s3cret".to_string(), Duration::from_millis(100))
                .unwrap();
        clip.clone().write("something the user copied".to_string()).unwrap();
        pending.wait();
        assert_eq!(
            clip.contents().as_deref(),
            Some("something the user copied")
        );
    }

    #[test]
    fn cancel_prevents_clear() {
        let clip = FakeClipboard::holding("s3cret");
        let started = Instant::now();
        let pending =
            schedule_clear(clip.clone(), "s3cret".to_string(), Duration::from_secs(5)).unwrap();
        // Scheduling must not block for the timeout.
        assert!(started.elapsed() < Duration::from_secs(5));
        pending.cancel();
        assert_eq!(clip.contents().as_deref(), Some("s3cret"));
    }

    #[test]
    fn new_copy_supersedes_pending_clear() {
        let first = FakeClipboard::holding("first");
        let pending_first =
            schedule_clear(first.clone(), "first".to_string(), Duration::from_millis(50))
                .unwrap();
        register_pending(&pending_first.cancel);

        let second = FakeClipboard::holding("second");
        let pending_second =
            schedule_clear(second.clone(), "second".to_string(), Duration::from_secs(5))
                .unwrap();
        // Registering the new clear cancels the one for "first".
        register_pending(&pending_second.cancel);

        pending_first.wait();
        assert_eq!(first.contents().as_deref(), Some("first"));
        pending_second.cancel();
    }
}
