//! Port descriptors and output port state.
//!
//! Algorithms declare their ports through static [`InputPortSpec`] and
//! [`OutputPortSpec`] arrays. The coordinator validates connections against
//! them and keeps one [`OutputPort`] per declared output.

use crate::pipeline::data::{DataKind, DataObject};
use crate::pipeline::error::ErrorRecord;
use crate::pipeline::info::{InfoRecord, Propagation};
use crate::pipeline::stamp::Stamp;
use serde::Serialize;

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PortDirection {
    Input,
    Output,
}

/// Static descriptor for an algorithm input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputPortSpec {
    pub name: &'static str,
    pub accepts: DataKind,
    /// An update fails with `InputMissing` while a required port has no
    /// connection.
    pub required: bool,
    /// Repeatable ports take any number of connections, kept in the order
    /// they were added.
    pub repeatable: bool,
}

impl InputPortSpec {
    pub const fn new(name: &'static str, accepts: DataKind) -> Self {
        Self {
            name,
            accepts,
            required: true,
            repeatable: false,
        }
    }

    pub const fn optional(self) -> Self {
        Self {
            required: false,
            ..self
        }
    }

    pub const fn repeatable(self) -> Self {
        Self {
            repeatable: true,
            ..self
        }
    }
}

/// Static descriptor for an algorithm output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputPortSpec {
    pub name: &'static str,
    pub produces: DataKind,
}

impl OutputPortSpec {
    pub const fn new(name: &'static str, produces: DataKind) -> Self {
        Self { name, produces }
    }
}

/// Execution stamp of a port plus the request it serviced.
#[derive(Debug, Clone)]
pub(crate) struct Serviced {
    stamp: Stamp,
    request: InfoRecord,
}

/// Saved data state of a port, used to undo a cancelled update.
#[derive(Debug, Clone)]
pub(crate) struct PortCheckpoint {
    data: Option<DataObject>,
    serviced: Option<Serviced>,
}

/// Runtime state of one output port.
#[derive(Debug)]
pub struct OutputPort {
    spec: OutputPortSpec,
    data: Option<DataObject>,
    info: InfoRecord,
    serviced: Option<Serviced>,
    request_stamp: Stamp,
    noted_request: InfoRecord,
    release_data: Option<bool>,
    last_error: Option<ErrorRecord>,
}

impl OutputPort {
    pub fn new(spec: OutputPortSpec) -> Self {
        Self {
            spec,
            data: None,
            info: InfoRecord::new(),
            serviced: None,
            request_stamp: Stamp::ZERO,
            noted_request: InfoRecord::new(),
            release_data: None,
            last_error: None,
        }
    }

    pub fn spec(&self) -> &OutputPortSpec {
        &self.spec
    }

    pub fn set_data(&mut self, data: DataObject) {
        self.data = Some(data);
    }

    pub fn data(&self) -> Option<&DataObject> {
        self.data.as_ref()
    }

    pub fn information(&self) -> &InfoRecord {
        &self.info
    }

    pub fn information_mut(&mut self) -> &mut InfoRecord {
        &mut self.info
    }

    /// Record that the port's data now answers `request` as of `stamp`.
    pub fn mark_executed(&mut self, stamp: Stamp, request: InfoRecord) {
        self.serviced = Some(Serviced { stamp, request });
    }

    pub fn last_executed(&self) -> Option<Stamp> {
        self.serviced.as_ref().map(|s| s.stamp)
    }

    /// The request the current data was produced for.
    pub fn serviced_request(&self) -> Option<&InfoRecord> {
        self.serviced.as_ref().map(|s| &s.request)
    }

    /// Stamp of the last change to this port's request entries.
    pub fn request_stamp(&self) -> Stamp {
        self.request_stamp
    }

    /// Compare the current request entries with the last ones seen and bump
    /// the request stamp when they differ. Returns whether it bumped.
    pub(crate) fn note_request(&mut self, time_tolerance: Option<f64>) -> bool {
        let current = self.info.class_snapshot(Propagation::Upstream);
        if self.request_stamp != Stamp::ZERO && current.request_eq(&self.noted_request, time_tolerance) {
            return false;
        }
        self.noted_request = current;
        self.request_stamp = Stamp::next();
        true
    }

    /// True when there is no data or the data is older than `current_stamp`,
    /// the newer of the algorithm's pipeline stamp and the request stamp.
    pub fn needs_execute(&self, current_stamp: Stamp) -> bool {
        match (&self.data, &self.serviced) {
            (Some(_), Some(serviced)) => serviced.stamp < current_stamp,
            _ => true,
        }
    }

    /// Override the coordinator's default release-data behaviour.
    pub fn set_release_data_flag(&mut self, release: bool) {
        self.release_data = Some(release);
    }

    pub fn release_data_flag(&self) -> Option<bool> {
        self.release_data
    }

    /// Drop the held data. The serviced stamp is kept, so a later update
    /// re-executes only because the data is missing. Returns whether data was
    /// held.
    pub fn release_data(&mut self) -> bool {
        self.data.take().is_some()
    }

    pub fn last_error(&self) -> Option<&ErrorRecord> {
        self.last_error.as_ref()
    }

    pub(crate) fn set_last_error(&mut self, record: ErrorRecord) {
        self.last_error = Some(record);
    }

    pub(crate) fn clear_last_error(&mut self) {
        self.last_error = None;
    }

    pub(crate) fn checkpoint(&self) -> PortCheckpoint {
        PortCheckpoint {
            data: self.data.clone(),
            serviced: self.serviced.clone(),
        }
    }

    pub(crate) fn restore(&mut self, checkpoint: PortCheckpoint) {
        self.data = checkpoint.data;
        self.serviced = checkpoint.serviced;
    }

    /// Forget data, requests and errors.
    pub(crate) fn reset(&mut self) {
        self.data = None;
        self.serviced = None;
        self.info.clear();
        self.noted_request.clear();
        self.request_stamp = Stamp::ZERO;
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::info::keys;
    use crate::types::Extent;

    const OUT: OutputPortSpec = OutputPortSpec::new("out", DataKind::Tuple);

    #[test]
    fn test_spec_builders() {
        let spec = InputPortSpec::new("in", DataKind::Image).optional().repeatable();
        assert!(!spec.required);
        assert!(spec.repeatable);
        assert_eq!(spec.accepts, DataKind::Image);
    }

    #[test]
    fn test_needs_execute() {
        let mut port = OutputPort::new(OUT);
        assert!(port.needs_execute(Stamp::ZERO));

        let before = Stamp::next();
        port.set_data(DataObject::scalar(1.0));
        port.mark_executed(Stamp::next(), InfoRecord::new());
        assert!(!port.needs_execute(before));
        assert!(port.needs_execute(Stamp::next()));

        port.release_data();
        assert!(port.needs_execute(before));
        assert!(port.last_executed().is_some());
    }

    #[test]
    fn test_note_request_bumps_on_change_only() {
        let mut port = OutputPort::new(OUT);
        port.information_mut().set(&keys::UPDATE_EXTENT, Extent::new(0, 4, 0, 0, 0, 0));
        assert!(port.note_request(None));
        let first = port.request_stamp();
        assert!(!port.note_request(None));
        assert_eq!(port.request_stamp(), first);

        port.information_mut().set(&keys::UPDATE_EXTENT, Extent::new(0, 3, 0, 0, 0, 0));
        assert!(port.note_request(None));
        assert!(port.request_stamp() > first);
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut port = OutputPort::new(OUT);
        port.set_data(DataObject::scalar(1.0));
        let saved = port.checkpoint();
        port.set_data(DataObject::scalar(2.0));
        port.restore(saved);
        assert_eq!(
            port.data().map(|d| d.payload().clone()),
            Some(crate::pipeline::data::Payload::Scalar(1.0))
        );
    }
}
