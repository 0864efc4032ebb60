//! Feature inspection and configuration
//!
//! Device features come in a closed set of kinds (integer, float,
//! enumeration, boolean). Writes go through [`write_feature`], which looks up
//! the feature's descriptor, refuses unknown and read-only names, and checks
//! the value's kind and constraint before touching the device.

pub mod value;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::FeatureError;

pub use value::{Constraint, FeatureDescriptor, FeatureKind, FeatureValue};

/// A device's feature node map
pub trait FeatureMap {
    /// All readable features
    fn descriptors(&self) -> Vec<FeatureDescriptor>;

    /// Look up one feature by exact name
    fn descriptor(&self, name: &str) -> Option<FeatureDescriptor> {
        self.descriptors().into_iter().find(|d| d.name == name)
    }

    /// Store an already validated value on the device
    fn store(&mut self, name: &str, value: FeatureValue) -> Result<(), FeatureError>;
}

/// Validate and write one feature
pub fn write_feature<M: FeatureMap + ?Sized>(
    map: &mut M,
    name: &str,
    value: FeatureValue,
) -> Result<(), FeatureError> {
    let descriptor = map
        .descriptor(name)
        .ok_or_else(|| FeatureError::UnknownFeature(name.to_string()))?;

    if !descriptor.writable {
        return Err(FeatureError::NotWritable(name.to_string()));
    }

    descriptor.validate(&value)?;
    map.store(name, value)
}

/// Result of applying a batch of settings
#[derive(Debug, Default, Serialize)]
pub struct ApplyReport {
    /// Settings written, in application order
    pub applied: Vec<(String, FeatureValue)>,
    /// Settings refused, with the reason
    pub rejected: Vec<(String, String)>,
}

impl ApplyReport {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Apply a JSON object of `name -> value` settings
///
/// Each setting is coerced to the feature's declared kind and validated on
/// its own; a rejected setting does not stop the others.
pub fn apply_settings<M: FeatureMap + ?Sized>(map: &mut M, settings: &Map<String, Value>) -> ApplyReport {
    let mut report = ApplyReport::default();

    for (name, raw) in settings {
        let result = map
            .descriptor(name)
            .ok_or_else(|| FeatureError::UnknownFeature(name.clone()))
            .and_then(|descriptor| descriptor.coerce(raw))
            .and_then(|value| write_feature(map, name, value.clone()).map(|_| value));

        match result {
            Ok(value) => {
                tracing::debug!(feature = %name, value = %value, "Feature written");
                report.applied.push((name.clone(), value));
            }
            Err(e) => {
                tracing::warn!(feature = %name, error = %e, "Feature rejected");
                report.rejected.push((name.clone(), e.to_string()));
            }
        }
    }

    report
}

/// In-memory feature map
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    features: BTreeMap<String, FeatureDescriptor>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a feature
    pub fn with(mut self, descriptor: FeatureDescriptor) -> Self {
        self.features.insert(descriptor.name.clone(), descriptor);
        self
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FeatureMap for FeatureTable {
    fn descriptors(&self) -> Vec<FeatureDescriptor> {
        self.features.values().cloned().collect()
    }

    fn descriptor(&self, name: &str) -> Option<FeatureDescriptor> {
        self.features.get(name).cloned()
    }

    fn store(&mut self, name: &str, value: FeatureValue) -> Result<(), FeatureError> {
        let entry = self
            .features
            .get_mut(name)
            .ok_or_else(|| FeatureError::UnknownFeature(name.to_string()))?;
        entry.value = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn table() -> FeatureTable {
        FeatureTable::new()
            .with(FeatureDescriptor::float("Gain", 0.0, 0.0, 24.0))
            .with(FeatureDescriptor::integer("Width", 640, 16, 1920))
            .with(FeatureDescriptor::enumeration("PixelFormat", "Mono8", &["Mono8", "BayerRG8"]))
            .with(FeatureDescriptor::boolean("ReverseX", false))
            .with(FeatureDescriptor::integer("SensorWidth", 1920, 1920, 1920).read_only())
    }

    #[test]
    fn test_write_feature() {
        let mut map = table();
        write_feature(&mut map, "Gain", FeatureValue::Float(15.0)).unwrap();
        assert_eq!(map.descriptor("Gain").unwrap().value, FeatureValue::Float(15.0));
    }

    #[test]
    fn test_write_unknown_and_read_only() {
        let mut map = table();
        assert_eq!(
            write_feature(&mut map, "Gamma", FeatureValue::Float(1.0)),
            Err(FeatureError::UnknownFeature("Gamma".into()))
        );
        assert_eq!(
            write_feature(&mut map, "SensorWidth", FeatureValue::Integer(1920)),
            Err(FeatureError::NotWritable("SensorWidth".into()))
        );
    }

    #[test]
    fn test_apply_settings_partial() {
        let mut map = table();
        let settings = json!({
            "Gain": 15,
            "PixelFormat": "BayerRG8",
            "ReverseX": true,
            "Width": 99999,
            "Unknown": 1,
        });

        let report = apply_settings(&mut map, settings.as_object().unwrap());

        assert_eq!(report.applied.len(), 3);
        assert_eq!(report.rejected.len(), 2);
        assert!(!report.is_complete());
        assert_eq!(map.descriptor("Gain").unwrap().value, FeatureValue::Float(15.0));
        assert_eq!(
            map.descriptor("PixelFormat").unwrap().value,
            FeatureValue::Enum("BayerRG8".into())
        );
        assert_eq!(map.descriptor("Width").unwrap().value, FeatureValue::Integer(640));

        let rejected: Vec<&str> = report.rejected.iter().map(|(n, _)| n.as_str()).collect();
        assert!(rejected.contains(&"Width"));
        assert!(rejected.contains(&"Unknown"));
    }

    #[test]
    fn test_descriptors_listing() {
        let map = table();
        assert_eq!(map.len(), 5);
        let names: Vec<String> = map.descriptors().into_iter().map(|d| d.name).collect();
        assert!(names.contains(&"ReverseX".to_string()));
    }
}
