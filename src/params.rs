//! Shared processing and device parameters
//!
//! [`ParameterStore`] is the only state shared between the capture worker and
//! configuration callers. Every access takes the lock for the duration of a
//! copy or an assignment, never longer.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ParamError;

/// Every named setting with its default
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    /// Let the device pick exposure
    pub auto_exposure: bool,
    /// Manual exposure, -13..=-1
    pub exposure: i32,
    /// 0..=100
    pub gain: i32,
    /// 0..=255
    pub brightness: i32,
    /// 0..=100
    pub contrast: i32,
    /// 0..=200
    pub gamma: i32,
    /// Let the device focus
    pub auto_focus: bool,
    /// Manual focus, 0..=255
    pub focus: i32,
    /// Apply the software gain before detection
    pub boost: bool,
    /// Software gain factor, 0.1..=3.0
    pub alpha: f32,
    /// Software gain offset, -100..=100
    pub beta: i32,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            auto_exposure: true,
            exposure: -6,
            gain: 0,
            brightness: 128,
            contrast: 40,
            gamma: 100,
            auto_focus: true,
            focus: 0,
            boost: false,
            alpha: 1.0,
            beta: 0,
        }
    }
}

impl PipelineParams {
    /// Setting names, in snapshot order
    pub const FIELDS: [&'static str; 11] = [
        "auto_exposure",
        "exposure",
        "gain",
        "brightness",
        "contrast",
        "gamma",
        "auto_focus",
        "focus",
        "boost",
        "alpha",
        "beta",
    ];

    /// Apply one validated update
    pub fn apply(&mut self, update: ParamUpdate) -> Result<(), ParamError> {
        update.validate()?;
        match update {
            ParamUpdate::AutoExposure(v) => self.auto_exposure = v,
            ParamUpdate::Exposure(v) => self.exposure = v,
            ParamUpdate::Gain(v) => self.gain = v,
            ParamUpdate::Brightness(v) => self.brightness = v,
            ParamUpdate::Contrast(v) => self.contrast = v,
            ParamUpdate::Gamma(v) => self.gamma = v,
            ParamUpdate::AutoFocus(v) => self.auto_focus = v,
            ParamUpdate::Focus(v) => self.focus = v,
            ParamUpdate::Boost(v) => self.boost = v,
            ParamUpdate::Alpha(v) => self.alpha = v,
            ParamUpdate::Beta(v) => self.beta = v,
        }
        Ok(())
    }

    /// Flat key -> value view, as persisted
    pub fn to_map(&self) -> serde_json::Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

/// A single-field change
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamUpdate {
    /// `auto_exposure`
    AutoExposure(bool),
    /// `exposure`
    Exposure(i32),
    /// `gain`
    Gain(i32),
    /// `brightness`
    Brightness(i32),
    /// `contrast`
    Contrast(i32),
    /// `gamma`
    Gamma(i32),
    /// `auto_focus`
    AutoFocus(bool),
    /// `focus`
    Focus(i32),
    /// `boost`
    Boost(bool),
    /// `alpha`
    Alpha(f32),
    /// `beta`
    Beta(i32),
}

impl ParamUpdate {
    /// Field name, as used in snapshot files
    pub fn name(&self) -> &'static str {
        match self {
            ParamUpdate::AutoExposure(_) => "auto_exposure",
            ParamUpdate::Exposure(_) => "exposure",
            ParamUpdate::Gain(_) => "gain",
            ParamUpdate::Brightness(_) => "brightness",
            ParamUpdate::Contrast(_) => "contrast",
            ParamUpdate::Gamma(_) => "gamma",
            ParamUpdate::AutoFocus(_) => "auto_focus",
            ParamUpdate::Focus(_) => "focus",
            ParamUpdate::Boost(_) => "boost",
            ParamUpdate::Alpha(_) => "alpha",
            ParamUpdate::Beta(_) => "beta",
        }
    }

    /// Valid range of a numeric field; `None` for flags
    pub fn range(&self) -> Option<(f64, f64)> {
        match self {
            ParamUpdate::Exposure(_) => Some((-13.0, -1.0)),
            ParamUpdate::Gain(_) => Some((0.0, 100.0)),
            ParamUpdate::Brightness(_) => Some((0.0, 255.0)),
            ParamUpdate::Contrast(_) => Some((0.0, 100.0)),
            ParamUpdate::Gamma(_) => Some((0.0, 200.0)),
            ParamUpdate::Focus(_) => Some((0.0, 255.0)),
            ParamUpdate::Alpha(_) => Some((0.1, 3.0)),
            ParamUpdate::Beta(_) => Some((-100.0, 100.0)),
            ParamUpdate::AutoExposure(_) | ParamUpdate::AutoFocus(_) | ParamUpdate::Boost(_) => None,
        }
    }

    fn numeric(&self) -> Option<f64> {
        match *self {
            ParamUpdate::Exposure(v)
            | ParamUpdate::Gain(v)
            | ParamUpdate::Brightness(v)
            | ParamUpdate::Contrast(v)
            | ParamUpdate::Gamma(v)
            | ParamUpdate::Focus(v)
            | ParamUpdate::Beta(v) => Some(v as f64),
            ParamUpdate::Alpha(v) => Some(v as f64),
            _ => None,
        }
    }

    /// Range check; flags always pass
    pub fn validate(&self) -> Result<(), ParamError> {
        let (Some((min, max)), Some(value)) = (self.range(), self.numeric()) else {
            return Ok(());
        };
        // alpha is stored as f32, compare with a little slack
        let eps = 1e-6;
        if value.is_nan() || value < min - eps || value > max + eps {
            return Err(ParamError::OutOfRange {
                field: self.name(),
                value,
                min,
                max,
            });
        }
        Ok(())
    }

    /// Build an update from a named JSON value.
    ///
    /// Integers accept whole-valued floats; flags also accept 0/1.
    pub fn from_named(name: &str, value: &Value) -> Result<Self, ParamError> {
        let wrong = || ParamError::WrongType {
            field: name.to_string(),
        };
        let flag = || -> Result<bool, ParamError> {
            match value {
                Value::Bool(b) => Ok(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(0) => Ok(false),
                    Some(1) => Ok(true),
                    _ => Err(wrong()),
                },
                _ => Err(wrong()),
            }
        };
        let int = || -> Result<i32, ParamError> {
            let n = value.as_f64().ok_or_else(wrong)?;
            if n.fract() != 0.0 || n < i32::MIN as f64 || n > i32::MAX as f64 {
                return Err(wrong());
            }
            Ok(n as i32)
        };

        let update = match name {
            "auto_exposure" => ParamUpdate::AutoExposure(flag()?),
            "exposure" => ParamUpdate::Exposure(int()?),
            "gain" => ParamUpdate::Gain(int()?),
            "brightness" => ParamUpdate::Brightness(int()?),
            "contrast" => ParamUpdate::Contrast(int()?),
            "gamma" => ParamUpdate::Gamma(int()?),
            "auto_focus" => ParamUpdate::AutoFocus(flag()?),
            "focus" => ParamUpdate::Focus(int()?),
            "boost" => ParamUpdate::Boost(flag()?),
            "alpha" => ParamUpdate::Alpha(value.as_f64().ok_or_else(wrong)? as f32),
            "beta" => ParamUpdate::Beta(int()?),
            other => return Err(ParamError::UnknownField(other.to_string())),
        };
        update.validate()?;
        Ok(update)
    }

    /// Parse `key=value` as typed on a command line
    pub fn parse_assignment(assignment: &str) -> Result<Self, ParamError> {
        let (key, raw) = assignment
            .split_once('=')
            .ok_or_else(|| ParamError::UnknownField(assignment.to_string()))?;
        let raw = raw.trim();
        let value = match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => serde_json::from_str::<Value>(raw).map_err(|_| ParamError::WrongType {
                field: key.trim().to_string(),
            })?,
        };
        Self::from_named(key.trim(), &value)
    }
}

#[derive(Debug, Default)]
struct Inner {
    params: PipelineParams,
    dirty: bool,
}

/// Mutex-guarded parameters with a dirty flag
#[derive(Debug, Default)]
pub struct ParameterStore {
    inner: Mutex<Inner>,
}

impl ParameterStore {
    /// Store holding `params`, not dirty
    pub fn new(params: PipelineParams) -> Self {
        Self {
            inner: Mutex::new(Inner {
                params,
                dirty: false,
            }),
        }
    }

    /// Copy of the current values
    pub fn snapshot(&self) -> PipelineParams {
        self.inner.lock().params
    }

    /// Set one field and mark the store dirty
    pub fn set(&self, update: ParamUpdate) -> Result<(), ParamError> {
        update.validate()?;
        let mut inner = self.inner.lock();
        inner.params.apply(update)?;
        inner.dirty = true;
        Ok(())
    }

    /// Apply several updates at once; nothing changes if any is invalid
    pub fn set_all(&self, updates: &[ParamUpdate]) -> Result<(), ParamError> {
        for update in updates {
            update.validate()?;
        }
        let mut inner = self.inner.lock();
        let mut next = inner.params;
        for update in updates {
            next.apply(*update)?;
        }
        inner.params = next;
        inner.dirty = true;
        Ok(())
    }

    /// A write happened since the last `take_dirty`
    pub fn is_dirty(&self) -> bool {
        self.inner.lock().dirty
    }

    /// Clear the dirty flag, returning the values if it was set
    pub fn take_dirty(&self) -> Option<PipelineParams> {
        let mut inner = self.inner.lock();
        if !inner.dirty {
            return None;
        }
        inner.dirty = false;
        Some(inner.params)
    }
}
