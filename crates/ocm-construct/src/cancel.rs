use tokio::sync::watch;

/// Shared cancellation signal for one `Construct` invocation (§4.D: "an
/// element-level failure cancels only its own component's still-pending
/// siblings and anything depending on it; a component-level failure whose
/// policy is `AbortAndFail` cancels the whole build").
///
/// Built on a `watch` channel rather than `tokio-util`'s `CancellationToken`
/// so the engine stays on the dependency stack it already pulls in for
/// everything else.
pub struct Cancellation {
    tx: watch::Sender<bool>,
}

impl Cancellation {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}
