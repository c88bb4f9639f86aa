//! Progress reporting for long-running pipeline stages
//!
//! Every long-running stage reports through a [`ProgressSink`]: a spawned
//! render task owns the terminal bar or spinner, while the producing stage
//! only sends discrete events. Count-bound stages use a bar over a channel
//! bounded to the known unit count; unbound stages use a label-driven
//! spinner over an unbounded channel.
//!
//! Cancellation is a [`CancellationToken`] revoked by the consumer side
//! (typically a ctrl-c handler). Producers check the token once per unit
//! boundary via [`ProgressSink::unit`] and receive [`Error::Cancelled`]
//! once it is revoked, which they propagate instead of continuing partial
//! work.

use crate::error::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// A unit-of-work-complete signal or a stage-change label
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// One unit of work fully completed
    Unit,
    /// The stage changed; carries the new label for spinner rendering
    Stage(String),
}

enum ProgressTx {
    Bounded(mpsc::Sender<ProgressEvent>),
    Unbounded(mpsc::UnboundedSender<ProgressEvent>),
}

impl ProgressTx {
    fn send(&self, event: ProgressEvent) {
        // The render task outliving the producer is the only failure mode;
        // a dropped receiver just means nothing is listening anymore.
        match self {
            ProgressTx::Bounded(tx) => {
                let _ = tx.try_send(event);
            }
            ProgressTx::Unbounded(tx) => {
                let _ = tx.send(event);
            }
        }
    }
}

/// Concurrent progress actor consumed by every long-running stage
///
/// Only the rendering is concurrent; the producing stage performs its I/O
/// sequentially and signals completed units. Units are sent strictly after
/// the corresponding work finishes, so the rendered count is always a
/// lower bound on completed units.
pub struct ProgressSink {
    tx: ProgressTx,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ProgressSink {
    /// Start a count-bound bar sized to `total` units
    ///
    /// The channel is bounded to the unit count, so a producer that only
    /// sends one event per enumerated unit can never block on it.
    pub fn bar(title: &str, total: usize, headless: bool, cancel: CancellationToken) -> Self {
        let (tx, mut rx) = mpsc::channel::<ProgressEvent>(total.max(1));
        let title = title.to_string();
        let task = tokio::spawn(async move {
            let bar = (!headless).then(|| {
                let b = ProgressBar::new(total as u64);
                b.set_style(bar_style());
                b.set_prefix(title.clone());
                b
            });
            let mut done = 0usize;
            while let Some(event) = rx.recv().await {
                if let ProgressEvent::Unit = event {
                    done += 1;
                    match &bar {
                        Some(b) => b.inc(1),
                        None => info!(title = %title, done, total, "progress"),
                    }
                }
            }
            if let Some(b) = bar {
                b.finish_and_clear();
            }
        });
        Self {
            tx: ProgressTx::Bounded(tx),
            cancel,
            task,
        }
    }

    /// Start an unbound, stage-label-driven spinner
    pub fn spinner(title: &str, headless: bool, cancel: CancellationToken) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
        let title = title.to_string();
        let task = tokio::spawn(async move {
            let spinner = (!headless).then(|| {
                let s = ProgressBar::new_spinner();
                s.set_style(spinner_style());
                s.set_prefix(title.clone());
                s.enable_steady_tick(Duration::from_millis(100));
                s
            });
            while let Some(event) = rx.recv().await {
                if let ProgressEvent::Stage(label) = event {
                    match &spinner {
                        Some(s) => s.set_message(label),
                        None => info!(title = %title, stage = %label, "progress"),
                    }
                }
            }
            if let Some(s) = spinner {
                s.finish_and_clear();
            }
        });
        Self {
            tx: ProgressTx::Unbounded(tx),
            cancel,
            task,
        }
    }

    /// Signal one completed unit of work
    ///
    /// Checks for operator cancellation first and returns
    /// [`Error::Cancelled`] if the token has been revoked; the unit is not
    /// emitted in that case.
    pub fn unit(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.tx.send(ProgressEvent::Unit);
        Ok(())
    }

    /// Relabel the current stage (spinner mode)
    pub fn stage(&self, label: impl Into<String>) {
        self.tx.send(ProgressEvent::Stage(label.into()));
    }

    /// Whether the consumer has requested cancellation
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Close the event channel and wait for the render task to drain
    pub async fn finish(self) {
        drop(self.tx);
        let _ = self.task.await;
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix} [{wide_bar}] {pos}/{len} ({percent}%)")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix} {spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}
