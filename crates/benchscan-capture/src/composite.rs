use crate::contract::{DeviceDiscovery, FrameCapture, ModeDiscovery};
use benchscan_core::{
    CameraCaptureMode, CameraDeviceInfo, CancelToken, CaptureSettings, FrameCaptureOutcome,
    ScanError,
};

/// Ordered provider chains with a uniform "empty result means try the next
/// one" contract. Cancellation is never swallowed; any other provider error
/// falls through to the next entry.

pub struct CompositeDeviceDiscovery {
    providers: Vec<Box<dyn DeviceDiscovery>>,
}

impl CompositeDeviceDiscovery {
    pub fn new(providers: Vec<Box<dyn DeviceDiscovery>>) -> Self {
        Self { providers }
    }
}

impl DeviceDiscovery for CompositeDeviceDiscovery {
    fn list_available(&self, cancel: &CancelToken) -> Result<Vec<CameraDeviceInfo>, ScanError> {
        for provider in &self.providers {
            cancel.ensure_active()?;
            match provider.list_available(cancel) {
                Ok(devices) if !devices.is_empty() => return Ok(devices),
                Ok(_) => continue,
                Err(ScanError::Cancelled) => return Err(ScanError::Cancelled),
                Err(err) => {
                    log::debug!("device discovery provider failed, trying next: {err}");
                    continue;
                }
            }
        }
        Ok(Vec::new())
    }
}

pub struct CompositeModeDiscovery {
    providers: Vec<Box<dyn ModeDiscovery>>,
}

impl CompositeModeDiscovery {
    pub fn new(providers: Vec<Box<dyn ModeDiscovery>>) -> Self {
        Self { providers }
    }
}

impl ModeDiscovery for CompositeModeDiscovery {
    fn supported_modes(
        &self,
        device_id: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<CameraCaptureMode>, ScanError> {
        for provider in &self.providers {
            cancel.ensure_active()?;
            match provider.supported_modes(device_id, cancel) {
                Ok(modes) if !modes.is_empty() => return Ok(modes),
                Ok(_) => continue,
                Err(ScanError::Cancelled) => return Err(ScanError::Cancelled),
                Err(err) => {
                    log::debug!("mode discovery provider failed, trying next: {err}");
                    continue;
                }
            }
        }
        Ok(Vec::new())
    }
}

pub struct CompositeFrameCapture {
    providers: Vec<Box<dyn FrameCapture>>,
}

impl CompositeFrameCapture {
    pub fn new(providers: Vec<Box<dyn FrameCapture>>) -> Self {
        Self { providers }
    }
}

impl FrameCapture for CompositeFrameCapture {
    fn capture_frames(
        &self,
        device_id: &str,
        settings: &CaptureSettings,
        cancel: &CancelToken,
    ) -> Result<FrameCaptureOutcome, ScanError> {
        let mut last_err = ScanError::NoCameraAvailable;
        for provider in &self.providers {
            cancel.ensure_active()?;
            match provider.capture_frames(device_id, settings, cancel) {
                Ok(outcome) if !outcome.frames.is_empty() => return Ok(outcome),
                Ok(_) => continue,
                Err(ScanError::Cancelled) => return Err(ScanError::Cancelled),
                Err(err) => {
                    log::debug!("frame capture provider failed, trying next: {err}");
                    last_err = err;
                    continue;
                }
            }
        }
        Err(last_err)
    }
}
