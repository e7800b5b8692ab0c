// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deterministic snapshot of one frame.

use crate::node::NodeId;
use framescript_timeline::{ActiveClip, ClipId, Frame, VariableId, VariableValue};
use serde::{Deserialize, Serialize};

/// A variable sampled at an animation's local frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSample {
    /// Animation node driving the variable
    pub node: NodeId,
    /// Animation label
    pub label: Option<String>,
    /// The variable
    pub variable: VariableId,
    /// Frame relative to the enclosing clip
    pub local_frame: Frame,
    /// Sampled value
    pub value: VariableValue,
}

/// Everything resolved for one project frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameCapture {
    /// Project frame
    pub frame: Frame,
    /// Active clips in registration order
    pub active: Vec<ActiveClip>,
    /// Variables of animations inside active clips
    pub samples: Vec<VariableSample>,
}

impl FrameCapture {
    /// Sampled value of a variable, if captured
    pub fn value_of(&self, variable: VariableId) -> Option<VariableValue> {
        self.samples
            .iter()
            .find(|sample| sample.variable == variable)
            .map(|sample| sample.value)
    }

    /// Whether a clip is active in this frame
    pub fn is_active(&self, clip: ClipId) -> bool {
        self.active.iter().any(|active| active.id == clip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_lookup_and_json() {
        let clip = ClipId::new();
        let variable = VariableId::new();
        let capture = FrameCapture {
            frame: 42,
            active: vec![ActiveClip {
                id: clip,
                label: Some("intro".to_string()),
                depth: 0,
                local_frame: 12,
            }],
            samples: vec![VariableSample {
                node: NodeId(1),
                label: None,
                variable,
                local_frame: 12,
                value: VariableValue::Number(0.5),
            }],
        };

        assert!(capture.is_active(clip));
        assert!(!capture.is_active(ClipId::new()));
        assert_eq!(capture.value_of(variable), Some(VariableValue::Number(0.5)));
        assert_eq!(capture.value_of(VariableId::new()), None);

        let json = serde_json::to_string(&capture).unwrap();
        assert!(json.starts_with(r#"{"frame":42,"#));
        let parsed: FrameCapture = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, capture);
    }
}
