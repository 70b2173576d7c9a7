use benchscan_core::{
    CameraCaptureMode, CameraDeviceInfo, CancelToken, CaptureSettings, FrameCaptureOutcome,
    ScanError,
};

/// Enumerate camera devices a backend can reach.
pub trait DeviceDiscovery {
    fn list_available(&self, cancel: &CancelToken) -> Result<Vec<CameraDeviceInfo>, ScanError>;
}

/// Enumerate the capture modes one device supports.
pub trait ModeDiscovery {
    fn supported_modes(
        &self,
        device_id: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<CameraCaptureMode>, ScanError>;
}

/// Produce one batch of frames from a device.
///
/// Implementations report the backend they actually ran on in the outcome
/// diagnostics; the reliability loop treats an unexpected simulated backend
/// as a configuration error.
pub trait FrameCapture {
    fn capture_frames(
        &self,
        device_id: &str,
        settings: &CaptureSettings,
        cancel: &CancelToken,
    ) -> Result<FrameCaptureOutcome, ScanError>;
}
