use mediastack_compose::ControlPlane;
use mediastack_core::ProbeResult;

use crate::Probe;

/// Is the container runtime itself up.
pub struct DaemonProbe<'a> {
    plane: &'a dyn ControlPlane,
}

impl<'a> DaemonProbe<'a> {
    pub fn new(plane: &'a dyn ControlPlane) -> Self {
        Self { plane }
    }
}

impl Probe for DaemonProbe<'_> {
    fn name(&self) -> String {
        "daemon".to_string()
    }

    fn run(&self) -> ProbeResult {
        if self.plane.daemon_active() {
            ProbeResult::pass(self.name(), "container runtime is active")
        } else {
            ProbeResult::fail(self.name(), "container runtime is not responding")
        }
    }
}
