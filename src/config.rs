use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSlider {
    /// Input slot name sent to the solver, e.g. `RH_IN:X coordinate`.
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_step")]
    pub step: f64,
    pub value: f64,
}

fn default_step() -> f64 {
    1.0
}

impl InputSlider {
    fn new(name: &str, min: f64, max: f64, step: f64, value: f64) -> Self {
        Self { name: name.to_owned(), label: None, min, max, step, value }
    }

    /// Label shown next to the slider; the slot name without its `RH_IN:` prefix.
    pub fn display_label(&self) -> &str {
        match &self.label {
            Some(label) => label,
            None => self.name.strip_prefix("RH_IN:").unwrap_or(&self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub definition: String,
    pub endpoint: String,
    pub inputs: Vec<InputSlider>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            definition: "LEAF.gh".to_owned(),
            endpoint: default_endpoint().to_owned(),
            inputs: vec![
                InputSlider::new("RH_IN:X coordinate", -50.0, 50.0, 1.0, 0.0),
                InputSlider::new("RH_IN:Y coordinate", -50.0, 50.0, 1.0, 0.0),
                InputSlider::new("RH_IN:Rotation Variation", 0.0, 90.0, 1.0, 15.0),
                InputSlider::new("RH_IN:Generate Inflated Inner Shell", 0.0, 1.0, 1.0, 1.0),
                InputSlider::new("RH_IN:Generate Outer Shell", 0.0, 1.0, 1.0, 1.0),
                InputSlider::new("RH_IN:Outer Shell Roof Opening Size", 0.0, 1.0, 0.01, 0.5),
            ],
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn default_endpoint() -> &'static str {
    "/solve"
}

#[cfg(not(target_arch = "wasm32"))]
fn default_endpoint() -> &'static str {
    "http://localhost:3000/solve"
}

impl ViewerConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: ViewerConfig =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks ranges and clamps every slider value into its range.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.definition.trim().is_empty() {
            return Err(ConfigError::EmptyDefinition);
        }
        for input in &mut self.inputs {
            let invalid = |reason: &str| ConfigError::InvalidInput {
                name: input.name.clone(),
                reason: reason.to_owned(),
            };
            if !(input.min <= input.max) {
                return Err(invalid("min must not exceed max"));
            }
            if !(input.step > 0.0) {
                return Err(invalid("step must be positive"));
            }
            input.value = input.value.clamp(input.min, input.max);
        }
        Ok(())
    }

    /// `(name, value)` pairs in slider order.
    pub fn input_values(&self) -> impl Iterator<Item = (&str, f64)> {
        self.inputs.iter().map(|i| (i.name.as_str(), i.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lists_leaf_inputs() {
        let config = ViewerConfig::default();
        assert_eq!(config.definition, "LEAF.gh");
        assert_eq!(config.inputs.len(), 6);
        assert_eq!(config.inputs[2].display_label(), "Rotation Variation");
    }

    #[test]
    fn partial_json_falls_back_to_defaults_and_clamps() {
        let config = ViewerConfig::from_json_str(
            r#"{ "definition": "Tower.gh",
                 "inputs": [ { "name": "RH_IN:Height", "label": "Height", "min": 1, "max": 10, "value": 42 } ] }"#,
        )
        .unwrap();
        assert_eq!(config.endpoint, ViewerConfig::default().endpoint);
        assert_eq!(config.inputs[0].value, 10.0);
        assert_eq!(config.inputs[0].step, 1.0);
        assert_eq!(config.inputs[0].display_label(), "Height");
    }

    #[test]
    fn rejects_inverted_range() {
        let err = ViewerConfig::from_json_str(
            r#"{ "inputs": [ { "name": "RH_IN:a", "min": 5, "max": 1, "value": 2 } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInput { ref name, .. } if name == "RH_IN:a"));
    }

    #[test]
    fn rejects_empty_definition() {
        assert!(matches!(
            ViewerConfig::from_json_str(r#"{ "definition": " " }"#),
            Err(ConfigError::EmptyDefinition)
        ));
    }
}
