//! The cooperative poller: a single entry point the host calls on a timing
//! cadence to advance the sender's Consecutive Frame cadence and to enforce
//! both directions' timeouts. Never blocks; a no-op when both directions
//! are `Idle` (or `Full`/`Error`, which a poll never revisits).

use crate::host::CanHost;
use crate::link::Link;

impl<'a, H: CanHost> Link<'a, H> {
    /// Advance pending work. Call at least as often as the configured
    /// `st_min`/timeout resolution requires.
    pub fn poll(&mut self) {
        self.poll_sender();
        self.poll_receiver();
    }
}
