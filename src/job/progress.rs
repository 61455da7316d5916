//! One-way progress channel from a job to its observer
//!
//! Progress and the terminal event travel over the same queue, so the
//! observer always sees the terminal event after the last progress event.

use std::fmt;

use flume::{Receiver, Sender, TryRecvError};
use log::{debug, warn};

use super::{JobOutcome, PrintError};

/// Queue length before the job blocks on a slow observer
pub const DEFAULT_CHANNEL_CAPACITY: usize = 128;

/// Completed share of a job, 0 to 100
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percent(u8);

impl Percent {
    /// `position * 100 / total`, rounded down
    #[must_use]
    pub fn of(position: usize, total: usize) -> Self {
        if total == 0 {
            return Self(100);
        }
        Self((position.saturating_mul(100) / total).min(100) as u8)
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Message delivered to the observer
#[derive(Debug)]
pub enum JobEvent {
    Progress(Percent),
    /// Always the last event of a job
    Finished(JobOutcome),
}

/// Create a bounded progress channel
#[must_use]
pub fn channel(capacity: usize) -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = flume::bounded(capacity.max(1));
    (
        ProgressSender {
            tx,
            last: None,
            finished: false,
        },
        ProgressReceiver { rx, done: false },
    )
}

/// Job side of the channel.
///
/// `finish` consumes the sender, so a job reports its outcome once. A sender
/// dropped without finishing (a panicking job) reports
/// [`PrintError::Interrupted`].
pub struct ProgressSender {
    tx: Sender<JobEvent>,
    last: Option<Percent>,
    finished: bool,
}

impl ProgressSender {
    /// Report progress; values lower than the last one are not sent
    pub fn progress(&mut self, percent: Percent) {
        if self.last.is_some_and(|last| percent < last) {
            warn!("Dropping out-of-order progress {percent} after {:?}", self.last);
            return;
        }
        self.last = Some(percent);
        self.send(JobEvent::Progress(percent));
    }

    /// Deliver the terminal event
    pub fn finish(mut self, outcome: JobOutcome) {
        self.finished = true;
        self.send(JobEvent::Finished(outcome));
    }

    fn send(&self, event: JobEvent) {
        // observer gone: the job still runs to completion
        if self.tx.send(event).is_err() {
            debug!("Progress observer disconnected");
        }
    }
}

impl Drop for ProgressSender {
    fn drop(&mut self) {
        if !self.finished {
            self.send(JobEvent::Finished(JobOutcome::Failed(
                PrintError::Interrupted,
            )));
        }
    }
}

/// Observer side of the channel
pub struct ProgressReceiver {
    rx: Receiver<JobEvent>,
    done: bool,
}

impl ProgressReceiver {
    /// Drain whatever has arrived without blocking
    pub fn poll(&mut self) -> Vec<JobEvent> {
        let mut events = Vec::new();
        while !self.done {
            match self.rx.try_recv() {
                Ok(event) => {
                    self.done = matches!(event, JobEvent::Finished(_));
                    events.push(event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.done = true;
                    events.push(JobEvent::Finished(JobOutcome::Failed(
                        PrintError::Interrupted,
                    )));
                }
            }
        }
        events
    }

    /// Block for the next event; `None` once the terminal event was seen
    pub fn recv(&mut self) -> Option<JobEvent> {
        if self.done {
            return None;
        }
        let event = self
            .rx
            .recv()
            .unwrap_or(JobEvent::Finished(JobOutcome::Failed(PrintError::Interrupted)));
        self.done = matches!(event, JobEvent::Finished(_));
        Some(event)
    }

    /// True once the terminal event was delivered
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl Iterator for ProgressReceiver {
    type Item = JobEvent;

    fn next(&mut self) -> Option<JobEvent> {
        self.recv()
    }
}
