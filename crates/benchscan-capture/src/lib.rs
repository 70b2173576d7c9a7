//! Capture side of the benchscan pipeline.
//!
//! Capability contracts for device discovery, mode discovery, and frame
//! capture; the closed backend-to-provider mapping; composite fallback
//! chains; the capture preflight; the reliability retry loop; and the
//! capture quality analyzer.

mod backend;
mod composite;
mod contract;
mod preflight;
mod quality;
mod reliability;
mod simulated;

pub use backend::{resolve_providers, CaptureProviders};
pub use composite::{CompositeDeviceDiscovery, CompositeFrameCapture, CompositeModeDiscovery};
pub use contract::{DeviceDiscovery, FrameCapture, ModeDiscovery};
pub use preflight::evaluate_preflight;
pub use quality::analyze_capture_quality;
pub use reliability::capture_with_reliability;
pub use simulated::{SimulatedDeviceDiscovery, SimulatedFrameCapture, SimulatedModeDiscovery};
