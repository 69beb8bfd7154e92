//! Directed links from an output port to an input port.

use crate::pipeline::id::{ConnectionId, InputPortId, PortId};

/// An edge of the pipeline graph. Immutable once created; changing a link
/// means removing the connection and creating a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    id: ConnectionId,
    source: PortId,
    sink: InputPortId,
}

impl Connection {
    pub(crate) fn new(id: ConnectionId, source: PortId, sink: InputPortId) -> Self {
        Self { id, source, sink }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Producing output port.
    pub fn source(&self) -> PortId {
        self.source
    }

    /// Consuming input port.
    pub fn sink(&self) -> InputPortId {
        self.sink
    }
}
