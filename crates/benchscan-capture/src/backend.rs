use crate::composite::{CompositeDeviceDiscovery, CompositeFrameCapture, CompositeModeDiscovery};
use crate::contract::{DeviceDiscovery, FrameCapture, ModeDiscovery};
use crate::simulated::{SimulatedDeviceDiscovery, SimulatedFrameCapture, SimulatedModeDiscovery};
use benchscan_core::BackendKind;
use std::path::PathBuf;

/// Resolved provider chains for one session.
pub struct CaptureProviders {
    pub discovery: CompositeDeviceDiscovery,
    pub modes: CompositeModeDiscovery,
    pub capture: CompositeFrameCapture,
}

/// Map a backend tag to its concrete providers, or `None` when the backend
/// has no implementation in this build.
///
/// The native and vision-library stacks are deliberate extension points:
/// their platform drivers live outside this workspace, so resolution falls
/// through to the simulated chain and the reliability loop decides whether
/// that fallback is acceptable for the session.
fn providers_for(
    kind: BackendKind,
    preview_dir: Option<&PathBuf>,
) -> Option<(
    Box<dyn DeviceDiscovery>,
    Box<dyn ModeDiscovery>,
    Box<dyn FrameCapture>,
)> {
    match kind {
        BackendKind::Native => None,
        BackendKind::VisionLibrary => None,
        BackendKind::Simulated => Some((
            Box::new(SimulatedDeviceDiscovery),
            Box::new(SimulatedModeDiscovery),
            Box::new(SimulatedFrameCapture::new(preview_dir.cloned())),
        )),
    }
}

/// Build the ordered provider chains for a session: the preferred backend
/// first, then the simulated last resort.
pub fn resolve_providers(
    preferred: Option<BackendKind>,
    preview_dir: Option<PathBuf>,
) -> CaptureProviders {
    let mut order = Vec::new();
    if let Some(kind) = preferred {
        order.push(kind);
    }
    if !order.contains(&BackendKind::Simulated) {
        order.push(BackendKind::Simulated);
    }

    let mut discovery = Vec::new();
    let mut modes = Vec::new();
    let mut capture = Vec::new();
    for kind in order {
        if let Some((d, m, c)) = providers_for(kind, preview_dir.as_ref()) {
            discovery.push(d);
            modes.push(m);
            capture.push(c);
        } else {
            log::debug!("backend {kind} has no providers in this build; skipping");
        }
    }

    CaptureProviders {
        discovery: CompositeDeviceDiscovery::new(discovery),
        modes: CompositeModeDiscovery::new(modes),
        capture: CompositeFrameCapture::new(capture),
    }
}

/// Guess which backend a device id belongs to, for preflight routing.
pub(crate) fn infer_backend(device_id: &str) -> Option<BackendKind> {
    if device_id.starts_with("sim-") {
        return Some(BackendKind::Simulated);
    }
    if device_id.starts_with("cv-") || device_id.parse::<u32>().is_ok() {
        return Some(BackendKind::VisionLibrary);
    }
    if device_id.contains('\\') || device_id.starts_with("/dev/") {
        return Some(BackendKind::Native);
    }
    None
}
