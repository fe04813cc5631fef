//! Cancellable round timers.
//!
//! Each timer is a tokio task that posts [`RoundMessage::Tick`] into the
//! actor inbox. A tick carries the generation it was armed with; arming or
//! cancelling a kind bumps its generation so ticks already queued from an
//! older task are recognised and dropped.

use super::messages::RoundMessage;
use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

/// The three timers a round uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Countdown,
    Calling,
    Settle,
}

impl TimerKind {
    const COUNT: usize = 3;

    fn index(self) -> usize {
        match self {
            TimerKind::Countdown => 0,
            TimerKind::Calling => 1,
            TimerKind::Settle => 2,
        }
    }
}

/// At most one armed task per [`TimerKind`]
pub struct RoundTimers {
    inbox: mpsc::WeakSender<RoundMessage>,
    generations: [u64; TimerKind::COUNT],
    tasks: [Option<JoinHandle<()>>; TimerKind::COUNT],
}

impl RoundTimers {
    /// Timers posting into `inbox`.
    ///
    /// The sender is weak so that armed timers do not keep the actor alive.
    pub fn new(inbox: mpsc::WeakSender<RoundMessage>) -> Self {
        Self {
            inbox,
            generations: [0; TimerKind::COUNT],
            tasks: [None, None, None],
        }
    }

    /// Tick every `period`, first tick one period from now.
    ///
    /// Replaces any armed timer of the same kind. Returns the generation.
    pub fn arm_repeating(&mut self, kind: TimerKind, period: Duration) -> u64 {
        let generation = self.cancel(kind);
        let inbox = self.inbox.clone();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if !post_tick(&inbox, kind, generation).await {
                    break;
                }
            }
        });

        self.tasks[kind.index()] = Some(task);
        generation
    }

    /// Tick once after `delay`.
    ///
    /// Replaces any armed timer of the same kind. Returns the generation.
    pub fn arm_once(&mut self, kind: TimerKind, delay: Duration) -> u64 {
        let generation = self.cancel(kind);
        let inbox = self.inbox.clone();

        let task = tokio::spawn(async move {
            time::sleep(delay).await;
            post_tick(&inbox, kind, generation).await;
        });

        self.tasks[kind.index()] = Some(task);
        generation
    }

    /// Abort the timer of `kind` and invalidate its queued ticks.
    ///
    /// Returns the new generation.
    pub fn cancel(&mut self, kind: TimerKind) -> u64 {
        let index = kind.index();
        if let Some(task) = self.tasks[index].take() {
            task.abort();
        }
        self.generations[index] += 1;
        self.generations[index]
    }

    pub fn cancel_all(&mut self) {
        for kind in [TimerKind::Countdown, TimerKind::Calling, TimerKind::Settle] {
            self.cancel(kind);
        }
    }

    /// Whether a tick with `generation` still belongs to the armed timer
    pub fn is_current(&self, kind: TimerKind, generation: u64) -> bool {
        self.generations[kind.index()] == generation && self.tasks[kind.index()].is_some()
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.tasks[kind.index()]
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for RoundTimers {
    fn drop(&mut self) {
        for task in self.tasks.iter_mut().filter_map(Option::take) {
            task.abort();
        }
    }
}

/// Returns `false` once the actor is gone
async fn post_tick(inbox: &mpsc::WeakSender<RoundMessage>, kind: TimerKind, generation: u64) -> bool {
    let Some(inbox) = inbox.upgrade() else {
        return false;
    };
    inbox
        .send(RoundMessage::Tick { kind, generation })
        .await
        .is_ok()
}
