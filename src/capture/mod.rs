//! Frame acquisition and the capture worker
//!
//! A [`FrameSource`] is owned by exactly one worker thread: opened before the
//! first cycle, released once when the worker exits.

/// File and in-memory frame sources
pub mod image_source;
/// The capture loop worker
pub mod worker;

pub use image_source::{ImageSequenceSource, MemoryFrameSource};
pub use worker::{CaptureLoop, LoopConfig, ThumbnailMode};

use crate::errors::{CaptureError, DeviceError};
use crate::models::Frame;
use crate::params::PipelineParams;

/// A device (or file set) producing color frames
pub trait FrameSource: Send {
    /// Acquire the device
    fn open(&mut self) -> Result<(), CaptureError>;

    /// Next frame. Errors are skipped by the caller and retried next cycle.
    fn read(&mut self) -> Result<Frame, CaptureError>;

    /// Give the device back; called once
    fn release(&mut self);

    /// Adjustable hardware controls, if the source has any
    fn controls(&mut self) -> Option<&mut dyn DeviceControls> {
        None
    }

    /// Human readable name for logs
    fn describe(&self) -> String {
        "frame source".to_string()
    }
}

/// Hardware knobs understood by capture devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceControl {
    /// Exposure mode (3 auto, 1 manual)
    AutoExposure,
    /// Manual exposure level
    Exposure,
    /// Sensor gain
    Gain,
    /// Brightness
    Brightness,
    /// Contrast
    Contrast,
    /// Gamma
    Gamma,
    /// Autofocus on (1) or off (0)
    AutoFocus,
    /// Manual focus position
    Focus,
    /// Sharpness
    Sharpness,
}

impl DeviceControl {
    /// Name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            DeviceControl::AutoExposure => "auto_exposure",
            DeviceControl::Exposure => "exposure",
            DeviceControl::Gain => "gain",
            DeviceControl::Brightness => "brightness",
            DeviceControl::Contrast => "contrast",
            DeviceControl::Gamma => "gamma",
            DeviceControl::AutoFocus => "auto_focus",
            DeviceControl::Focus => "focus",
            DeviceControl::Sharpness => "sharpness",
        }
    }
}

/// Named get/set access to a device's controls
pub trait DeviceControls {
    /// Write one control; unsupported controls return an error
    fn set(&mut self, control: DeviceControl, value: f64) -> Result<(), DeviceError>;

    /// Current value, if readable
    fn get(&self, control: DeviceControl) -> Option<f64>;
}

/// Auto-exposure mode value selecting automatic exposure
pub const AUTO_EXPOSURE_AUTO: f64 = 3.0;
/// Auto-exposure mode value selecting manual exposure
pub const AUTO_EXPOSURE_MANUAL: f64 = 1.0;
/// Sharpness written on every application
pub const DEVICE_SHARPNESS: f64 = 200.0;

/// Control writes for `params`, in application order
pub fn device_settings(params: &PipelineParams) -> Vec<(DeviceControl, f64)> {
    let mut settings = Vec::with_capacity(10);
    if params.auto_focus {
        settings.push((DeviceControl::AutoFocus, 1.0));
    } else {
        settings.push((DeviceControl::AutoFocus, 0.0));
        settings.push((DeviceControl::Focus, params.focus as f64));
    }
    if params.auto_exposure {
        settings.push((DeviceControl::AutoExposure, AUTO_EXPOSURE_AUTO));
    } else {
        settings.push((DeviceControl::AutoExposure, AUTO_EXPOSURE_MANUAL));
        settings.push((DeviceControl::Exposure, params.exposure as f64));
    }
    settings.push((DeviceControl::Gain, params.gain as f64));
    settings.push((DeviceControl::Brightness, params.brightness as f64));
    settings.push((DeviceControl::Contrast, params.contrast as f64));
    settings.push((DeviceControl::Gamma, params.gamma as f64));
    settings.push((DeviceControl::Sharpness, DEVICE_SHARPNESS));
    settings
}

/// Write every device setting; failures are logged and skipped.
///
/// Returns the number of controls that were accepted.
pub fn apply_device_params(controls: &mut dyn DeviceControls, params: &PipelineParams) -> usize {
    let mut applied = 0;
    for (control, value) in device_settings(params) {
        match controls.set(control, value) {
            Ok(()) => applied += 1,
            Err(e) => log::warn!("skipping {} = {}: {}", control.name(), value, e),
        }
    }
    applied
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        writes: Vec<(DeviceControl, f64)>,
        values: HashMap<DeviceControl, f64>,
    }

    impl DeviceControls for Recorder {
        fn set(&mut self, control: DeviceControl, value: f64) -> Result<(), DeviceError> {
            if control == DeviceControl::Gamma {
                return Err(DeviceError::Unsupported(control.name()));
            }
            self.writes.push((control, value));
            self.values.insert(control, value);
            Ok(())
        }

        fn get(&self, control: DeviceControl) -> Option<f64> {
            self.values.get(&control).copied()
        }
    }

    #[test]
    fn test_auto_modes() {
        let settings = device_settings(&PipelineParams::default());
        assert_eq!(settings[0], (DeviceControl::AutoFocus, 1.0));
        assert_eq!(settings[1], (DeviceControl::AutoExposure, 3.0));
        assert!(!settings.iter().any(|(c, _)| *c == DeviceControl::Focus));
        assert_eq!(settings.last(), Some(&(DeviceControl::Sharpness, 200.0)));
    }

    #[test]
    fn test_manual_modes() {
        let params = PipelineParams {
            auto_focus: false,
            focus: 35,
            auto_exposure: false,
            exposure: -9,
            ..PipelineParams::default()
        };
        let settings = device_settings(&params);
        assert_eq!(
            &settings[..4],
            &[
                (DeviceControl::AutoFocus, 0.0),
                (DeviceControl::Focus, 35.0),
                (DeviceControl::AutoExposure, 1.0),
                (DeviceControl::Exposure, -9.0),
            ]
        );
    }

    #[test]
    fn test_unsupported_control_skipped() {
        let mut recorder = Recorder::default();
        let applied = apply_device_params(&mut recorder, &PipelineParams::default());
        let expected = device_settings(&PipelineParams::default()).len() - 1;
        assert_eq!(applied, expected);
        assert_eq!(recorder.get(DeviceControl::Sharpness), Some(200.0));
        assert_eq!(recorder.get(DeviceControl::Gamma), None);
    }
}
