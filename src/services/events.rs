//! Event sink: where the discovery loop reports what it is doing.
//!
//! The loop depends only on the [`EventSink`] trait. Log lines are
//! informational and may be dropped by an implementation; match
//! notifications must not be.

use log::Level;
use tokio::sync::mpsc;

use crate::models::CycleReport;

/// A listing entry whose title matched a keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatch {
    pub title: String,
    pub link: String,
    pub keyword: String,
}

/// Consumer of discovery loop events.
pub trait EventSink: Send + Sync {
    /// Free-text progress line.
    fn on_log(&self, level: Level, message: &str);

    /// A title matched a keyword for the first time in this process.
    fn on_match(&self, event: &NewMatch);

    /// Fraction (0..=1) of the inter-cycle wait that has elapsed.
    fn on_progress(&self, fraction: f64);

    /// A cycle finished.
    fn on_cycle_done(&self, report: &CycleReport);

    fn info(&self, message: &str) {
        self.on_log(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.on_log(Level::Warn, message);
    }

    fn debug(&self, message: &str) {
        self.on_log(Level::Debug, message);
    }
}

/// Forwards everything to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn on_log(&self, level: Level, message: &str) {
        log::log!(level, "{}", message);
    }

    fn on_match(&self, event: &NewMatch) {
        log::info!(
            "New match [{}]: {} ({})",
            event.keyword,
            event.title,
            event.link
        );
    }

    fn on_progress(&self, fraction: f64) {
        log::trace!("Waiting for next cycle: {:.0}%", fraction * 100.0);
    }

    fn on_cycle_done(&self, report: &CycleReport) {
        log::info!(
            "Cycle done: {} fetches ({} failed), {} candidates, {} matched, {} unmatched, {} new matches, {} errors",
            report.fetches,
            report.fetch_errors,
            report.candidates,
            report.matched,
            report.unmatched,
            report.new_matches,
            report.error_count()
        );
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn on_log(&self, _level: Level, _message: &str) {}
    fn on_match(&self, _event: &NewMatch) {}
    fn on_progress(&self, _fraction: f64) {}
    fn on_cycle_done(&self, _report: &CycleReport) {}
}

/// Events as delivered by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    Log { level: Level, message: String },
    NewMatch(NewMatch),
    Progress(f64),
    CycleDone(CycleReport),
}

/// Pushes events into an unbounded channel, so no notification is lost
/// while the receiver is busy.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<WatchEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<WatchEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with its receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<WatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn send(&self, event: WatchEvent) {
        // A closed receiver means nobody is listening anymore.
        let _ = self.tx.send(event);
    }
}

impl EventSink for ChannelSink {
    fn on_log(&self, level: Level, message: &str) {
        self.send(WatchEvent::Log {
            level,
            message: message.to_string(),
        });
    }

    fn on_match(&self, event: &NewMatch) {
        self.send(WatchEvent::NewMatch(event.clone()));
    }

    fn on_progress(&self, fraction: f64) {
        self.send(WatchEvent::Progress(fraction));
    }

    fn on_cycle_done(&self, report: &CycleReport) {
        self.send(WatchEvent::CycleDone(report.clone()));
    }
}
