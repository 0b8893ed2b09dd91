// The pending-payload slot behind the commit/fetch channel.
//
// Holds at most one `Deployment`. A commit replaces whatever is pending; a
// fetch takes it out, so each committed payload is delivered exactly once
// and later fetches see the empty response until the next commit. Starts
// empty.
//
// The server thread and the committing thread share one slot through
// `Arc<Mutex<PendingSlot>>`; every operation here is a single short critical
// section.

use bayz_protocol::{Deployment, FetchResponse};

#[derive(Debug, Default)]
pub struct PendingSlot {
    pending: Option<Deployment>,
}

impl PendingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pending payload. Returns the one it displaced, if any.
    pub fn commit(&mut self, deployment: Deployment) -> Option<Deployment> {
        self.pending.replace(deployment)
    }

    /// Hand out the pending payload (or the empty response) and clear.
    pub fn take(&mut self) -> FetchResponse {
        FetchResponse::from(self.pending.take())
    }

    /// The pending payload, left in place.
    pub fn peek(&self) -> Option<&Deployment> {
        self.pending.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
