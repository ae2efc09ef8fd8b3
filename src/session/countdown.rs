use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    Running,
    Stopped,
}

/// Wall-clock ticker driving the exam timer. Once stopped it never ticks
/// again.
#[derive(Debug)]
pub(crate) struct Countdown {
    interval: Option<Interval>,
}

impl Countdown {
    pub(crate) fn start(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval: Some(interval) }
    }

    pub(crate) fn state(&self) -> CountdownState {
        if self.interval.is_some() {
            CountdownState::Running
        } else {
            CountdownState::Stopped
        }
    }

    pub(crate) fn stop(&mut self) {
        self.interval = None;
    }

    /// Resolves on the next tick; pending forever while stopped.
    pub(crate) async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
