// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animatable values.

use crate::error::{Result, TimelineError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of an animatable value, fixed when a variable is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableKind {
    /// Scalar
    Number,
    /// `{x, y}`
    Vec2,
    /// `{x, y, z}`
    Vec3,
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Number => "number",
            Self::Vec2 => "vec2",
            Self::Vec3 => "vec3",
        };
        f.write_str(name)
    }
}

/// A value held by an animation variable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    /// Scalar
    Number(f64),
    // Vec3 is listed before Vec2 so untagged deserialization tries the wider shape first.
    /// 3D vector
    Vec3 {
        /// X component
        x: f64,
        /// Y component
        y: f64,
        /// Z component
        z: f64,
    },
    /// 2D vector
    Vec2 {
        /// X component
        x: f64,
        /// Y component
        y: f64,
    },
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

impl VariableValue {
    /// 2D vector value
    pub fn vec2(x: f64, y: f64) -> Self {
        Self::Vec2 { x, y }
    }

    /// 3D vector value
    pub fn vec3(x: f64, y: f64, z: f64) -> Self {
        Self::Vec3 { x, y, z }
    }

    /// Infer the kind from a flat component list
    pub fn from_components(components: &[f64]) -> Result<Self> {
        match *components {
            [v] => Ok(Self::Number(v)),
            [x, y] => Ok(Self::Vec2 { x, y }),
            [x, y, z] => Ok(Self::Vec3 { x, y, z }),
            _ => Err(TimelineError::AmbiguousShape {
                components: components.len(),
            }),
        }
    }

    /// The kind of this value
    pub fn kind(&self) -> VariableKind {
        match self {
            Self::Number(_) => VariableKind::Number,
            Self::Vec2 { .. } => VariableKind::Vec2,
            Self::Vec3 { .. } => VariableKind::Vec3,
        }
    }

    /// Fail unless this value has the given kind
    pub fn expect_kind(&self, expected: VariableKind) -> Result<()> {
        let found = self.kind();
        if found == expected {
            Ok(())
        } else {
            Err(TimelineError::KindMismatch { expected, found })
        }
    }

    /// Component-wise interpolation; mismatched kinds hold `self`
    pub fn lerp(&self, other: &VariableValue, t: f64) -> VariableValue {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => Self::Number(lerp(*a, *b, t)),
            (Self::Vec2 { x: ax, y: ay }, Self::Vec2 { x: bx, y: by }) => Self::Vec2 {
                x: lerp(*ax, *bx, t),
                y: lerp(*ay, *by, t),
            },
            (
                Self::Vec3 { x: ax, y: ay, z: az },
                Self::Vec3 { x: bx, y: by, z: bz },
            ) => Self::Vec3 {
                x: lerp(*ax, *bx, t),
                y: lerp(*ay, *by, t),
                z: lerp(*az, *bz, t),
            },
            _ => *self,
        }
    }

    /// Get as scalar if possible
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as `[x, y]` if possible
    pub fn as_vec2(&self) -> Option<[f64; 2]> {
        match self {
            Self::Vec2 { x, y } => Some([*x, *y]),
            _ => None,
        }
    }

    /// Get as `[x, y, z]` if possible
    pub fn as_vec3(&self) -> Option<[f64; 3]> {
        match self {
            Self::Vec3 { x, y, z } => Some([*x, *y, *z]),
            _ => None,
        }
    }
}

impl From<f64> for VariableValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<[f64; 2]> for VariableValue {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::Vec2 { x, y }
    }
}

impl From<[f64; 3]> for VariableValue {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::Vec3 { x, y, z }
    }
}
