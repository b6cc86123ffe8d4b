use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Format whole seconds as the `M:SS` clock used by the recording timer and
/// the playback readout.
pub fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Cosmetic elapsed-time counter driven by the capture session lifecycle.
///
/// Counts up once per second while recording and publishes an `M:SS` display
/// string; reset to `0:00` on any terminal transition. No persistence.
pub struct RecordingTimer {
    elapsed: Arc<AtomicU64>,
    display_tx: watch::Sender<String>,
    tick_task: Option<JoinHandle<()>>,
}

impl RecordingTimer {
    pub fn new() -> Self {
        let (display_tx, _) = watch::channel(format_clock(0));
        Self {
            elapsed: Arc::new(AtomicU64::new(0)),
            display_tx,
            tick_task: None,
        }
    }

    /// Subscribe to the formatted display value.
    pub fn display(&self) -> watch::Receiver<String> {
        self.display_tx.subscribe()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.load(Ordering::SeqCst)
    }

    /// Start counting from zero. Any previous tick task is replaced.
    pub fn start(&mut self) {
        self.reset();

        let elapsed = Arc::clone(&self.elapsed);
        let display_tx = self.display_tx.clone();

        self.tick_task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first tick completes immediately; the count starts at the
            // one-second mark.
            interval.tick().await;
            loop {
                interval.tick().await;
                let seconds = elapsed.fetch_add(1, Ordering::SeqCst) + 1;
                display_tx.send_replace(format_clock(seconds));
            }
        }));
    }

    /// Halt the tick task without clearing the elapsed count.
    pub fn stop(&mut self) {
        if let Some(task) = self.tick_task.take() {
            task.abort();
        }
    }

    /// Stop and return the display to `0:00`.
    pub fn reset(&mut self) {
        self.stop();
        self.elapsed.store(0, Ordering::SeqCst);
        self.display_tx.send_replace(format_clock(0));
    }
}

impl Default for RecordingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RecordingTimer {
    fn drop(&mut self) {
        if let Some(task) = self.tick_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(3), "0:03");
        assert_eq!(format_clock(59), "0:59");
        assert_eq!(format_clock(60), "1:00");
        assert_eq!(format_clock(125), "2:05");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_counts_up_and_resets() {
        let mut timer = RecordingTimer::new();
        let mut display = timer.display();
        assert_eq!(*display.borrow(), "0:00");

        timer.start();
        tokio::time::advance(Duration::from_secs(3)).await;
        // Let the tick task run.
        tokio::task::yield_now().await;

        assert_eq!(timer.elapsed_seconds(), 3);
        assert!(display.has_changed().unwrap());
        assert_eq!(*display.borrow_and_update(), "0:03");

        timer.reset();
        assert_eq!(timer.elapsed_seconds(), 0);
        assert_eq!(*timer.display().borrow(), "0:00");

        // A stopped timer no longer advances.
        tokio::time::advance(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert_eq!(timer.elapsed_seconds(), 0);
    }
}
