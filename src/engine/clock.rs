//! Countdown clock driving the per-round deadline.
//!
//! The clock ticks at 1-second granularity on its own task and reports back
//! through a channel, so tick handling is serialized with intent handling by
//! whoever owns the receiving end. Reaching zero emits [`ClockSignal::Deadline`]
//! exactly once per activation; stopping cancels the countdown without
//! emitting it.

use std::time::Duration;

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};

/// Signals emitted by a running [`RoundClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSignal {
    /// One second elapsed; `remaining_secs` is already clamped to zero.
    Tick {
        /// Whole seconds left on the countdown.
        remaining_secs: u64,
    },
    /// The countdown reached zero. Emitted at most once per activation.
    Deadline,
}

/// Restartable 1-second-granularity countdown.
pub struct RoundClock {
    duration: Duration,
    signals: mpsc::UnboundedSender<ClockSignal>,
    countdown: Option<JoinHandle<()>>,
}

impl RoundClock {
    /// Create an idle clock that will count down `duration` and report on
    /// `signals`.
    pub fn new(duration: Duration, signals: mpsc::UnboundedSender<ClockSignal>) -> Self {
        Self {
            duration,
            signals,
            countdown: None,
        }
    }

    /// Begin (or restart) the countdown from the full configured duration.
    ///
    /// Starting while already running cancels the previous countdown first,
    /// so two activations never tick concurrently.
    pub fn start(&mut self) {
        self.cancel();

        let signals = self.signals.clone();
        let mut remaining_ms = i64::try_from(self.duration.as_millis()).unwrap_or(i64::MAX);

        self.countdown = Some(tokio::spawn(async move {
            let mut ticks = interval(Duration::from_secs(1));
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick completes immediately; consume it so
            // the countdown starts a full second later.
            ticks.tick().await;

            loop {
                ticks.tick().await;
                remaining_ms -= 1000;
                let remaining_secs = (remaining_ms.max(0) / 1000) as u64;
                if signals.send(ClockSignal::Tick { remaining_secs }).is_err() {
                    break;
                }
                if remaining_ms <= 0 {
                    let _ = signals.send(ClockSignal::Deadline);
                    break;
                }
            }
        }));
    }

    /// Cancel the countdown without emitting a deadline.
    pub fn stop(&mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            countdown.abort();
        }
    }
}

impl Drop for RoundClock {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn drain(rx: &mut mpsc::UnboundedReceiver<ClockSignal>) -> Vec<ClockSignal> {
        let mut signals = Vec::new();
        while let Ok(signal) = rx.try_recv() {
            signals.push(signal);
        }
        signals
    }

    #[tokio::test(start_paused = true)]
    async fn counts_down_and_fires_deadline_exactly_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut clock = RoundClock::new(Duration::from_secs(3), tx);
        clock.start();

        sleep(Duration::from_secs(10)).await;

        let signals = drain(&mut rx);
        assert_eq!(
            signals,
            vec![
                ClockSignal::Tick { remaining_secs: 2 },
                ClockSignal::Tick { remaining_secs: 1 },
                ClockSignal::Tick { remaining_secs: 0 },
                ClockSignal::Deadline,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_without_firing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut clock = RoundClock::new(Duration::from_secs(5), tx);
        clock.start();

        sleep(Duration::from_secs(2)).await;
        clock.stop();
        sleep(Duration::from_secs(10)).await;

        let signals = drain(&mut rx);
        assert!(!signals.contains(&ClockSignal::Deadline));
        assert!(signals.len() <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_resets_the_countdown() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut clock = RoundClock::new(Duration::from_secs(5), tx);
        clock.start();

        sleep(Duration::from_secs(3)).await;
        clock.start();
        sleep(Duration::from_secs(3)).await;

        // Six seconds of wall time, but only three since the restart.
        assert!(!drain(&mut rx).contains(&ClockSignal::Deadline));

        sleep(Duration::from_secs(3)).await;
        assert!(drain(&mut rx).contains(&ClockSignal::Deadline));
    }
}
