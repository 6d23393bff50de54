// SPDX-License-Identifier: GPL-3.0-only

//! Recording duration timer
//!
//! Ticks once per second while recording and publishes the elapsed time as
//! `HH:MM:SS` on a watch channel. The display is `None` while hidden.

use crate::constants::RECORDING_TICK;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Format elapsed seconds as `HH:MM:SS`
///
/// Hours keep growing past two digits rather than wrapping.
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// State shared with the tick task
///
/// Ticks and `stop()` both publish while holding this lock, and a tick only
/// publishes if its generation is still current, so a tick that was already
/// scheduled cannot show the timer again after it was hidden.
#[derive(Debug)]
struct Ticker {
    generation: u64,
    elapsed: u64,
    display: watch::Sender<Option<String>>,
}

/// Recording timer service
#[derive(Debug)]
pub struct RecordingTimer {
    shared: Arc<Mutex<Ticker>>,
    display: watch::Receiver<Option<String>>,
    tick: Duration,
    task: Option<JoinHandle<()>>,
}

impl Default for RecordingTimer {
    fn default() -> Self {
        Self::new(RECORDING_TICK)
    }
}

impl RecordingTimer {
    pub fn new(tick: Duration) -> Self {
        let (tx, rx) = watch::channel(None);
        Self {
            shared: Arc::new(Mutex::new(Ticker {
                generation: 0,
                elapsed: 0,
                display: tx,
            })),
            display: rx,
            tick,
            task: None,
        }
    }

    /// Reset to zero, show the display and begin ticking
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        self.cancel_task();

        let generation = {
            let mut ticker = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
            ticker.generation += 1;
            ticker.elapsed = 0;
            ticker.display.send_replace(Some(format_elapsed(0)));
            ticker.generation
        };

        let shared = Arc::clone(&self.shared);
        let tick = self.tick;
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + tick, tick);
            loop {
                interval.tick().await;
                let mut ticker = shared.lock().unwrap_or_else(PoisonError::into_inner);
                if ticker.generation != generation {
                    break;
                }
                ticker.elapsed += 1;
                let text = format_elapsed(ticker.elapsed);
                ticker.display.send_replace(Some(text));
            }
        }));
        debug!("Recording timer started");
    }

    /// Stop ticking and hide the display
    pub fn stop(&mut self) {
        {
            let mut ticker = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
            ticker.generation += 1;
            ticker.elapsed = 0;
            ticker.display.send_replace(None);
        }
        if self.cancel_task() {
            debug!("Recording timer stopped");
        }
    }

    fn cancel_task(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Elapsed time of the current run (zero when stopped)
    pub fn elapsed(&self) -> Duration {
        let ticker = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        Duration::from_secs(ticker.elapsed)
    }

    /// Current display text, `None` when hidden
    pub fn display(&self) -> Option<String> {
        self.display.borrow().clone()
    }

    /// Receiver that follows the display
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.display.clone()
    }
}

impl Drop for RecordingTimer {
    fn drop(&mut self) {
        self.cancel_task();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00:00");
        assert_eq!(format_elapsed(59), "00:00:59");
        assert_eq!(format_elapsed(60), "00:01:00");
        assert_eq!(format_elapsed(3600), "01:00:00");
        assert_eq!(format_elapsed(3661), "01:01:01");
        assert_eq!(format_elapsed(360_000), "100:00:00");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_second() {
        let mut timer = RecordingTimer::default();
        assert_eq!(timer.display(), None);

        timer.start();
        assert_eq!(timer.display().as_deref(), Some("00:00:00"));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(timer.display().as_deref(), Some("00:00:03"));
        assert_eq!(timer.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_hides_and_silences() {
        let mut timer = RecordingTimer::default();
        let mut display = timer.subscribe();
        timer.start();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        timer.stop();
        assert_eq!(timer.display(), None);
        assert!(!timer.is_running());
        display.borrow_and_update();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!display.has_changed().unwrap());
        assert_eq!(timer.display(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_begins_at_zero() {
        let mut timer = RecordingTimer::default();
        timer.start();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        timer.stop();

        timer.start();
        assert_eq!(timer.display().as_deref(), Some("00:00:00"));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(timer.display().as_deref(), Some("00:00:01"));
    }
}
