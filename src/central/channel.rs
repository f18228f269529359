use std::time::Duration;

use crate::error::{Error, ErrorKind, Result};
use crate::sync::{Receiver, Sender};

/// Host side of an embedded controller: command lines go in, rendered responses come out.
///
/// Dropping the channel (or every clone of [`sender`](Self::sender)) is seen by the controller
/// as end of input, which it handles like `exit`.
pub struct CommandChannel {
    inbound: Sender<String>,
    outbound: Receiver<String>,
}

impl CommandChannel {
    pub(in crate) fn new(inbound: Sender<String>, outbound: Receiver<String>) -> Self {
        Self {
            inbound,
            outbound,
        }
    }

    /// Queues a command line. Fails if the controller is gone.
    pub fn send(&self, line: impl Into<String>) -> Result<()> {
        self.inbound.send(line.into())
            .map_err(|_| Error::new(ErrorKind::ChannelClosed, "controller is gone"))
    }

    /// Another handle for submitting command lines, e.g. from a reader thread.
    pub fn sender(&self) -> Sender<String> {
        self.inbound.clone()
    }

    pub fn try_recv(&self) -> Option<String> {
        self.outbound.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<String> {
        self.outbound.recv_timeout(timeout).ok()
    }

    /// Waits for the next response. `None` once the controller is gone.
    pub fn recv(&self) -> Option<String> {
        self.outbound.recv().ok()
    }

    /// Splits into the raw sending and receiving ends.
    pub fn into_parts(self) -> (Sender<String>, Receiver<String>) {
        (self.inbound, self.outbound)
    }
}
