use tokio::sync::broadcast;

/// Process-wide refresh notifications. Any number of independent consumers
/// subscribe and re-read their snapshots when a signal fires; there is no
/// shared in-memory state beyond this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The persisted activity log was rewritten.
    ActivityLog,
    /// Something server-side changed that dashboards should re-pull.
    Dashboard,
}

#[derive(Clone)]
pub struct UpdateSignal {
    tx: broadcast::Sender<Signal>,
}

impl UpdateSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(32);
        Self { tx }
    }

    /// Fire-and-forget broadcast. A send with no live subscribers is fine.
    pub fn notify(&self, signal: Signal) {
        let _ = self.tx.send(signal);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.tx.subscribe()
    }
}

impl Default for UpdateSignal {
    fn default() -> Self {
        Self::new()
    }
}
