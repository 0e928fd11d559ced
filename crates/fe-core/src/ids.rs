use core::fmt;
use core::num::NonZeroU32;
use core::str::FromStr;

use crate::error::FeError;

/// Number assigned by the external engine to a mesh entity.
///
/// - engine numbering starts at 1, so `NonZero` is exact
/// - `Option<EngineId>` stays the size of `EngineId`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EngineId(NonZeroU32);

impl EngineId {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl FromStr for EngineId {
    type Err = FeError;

    /// Accepts padded integers and the integral float form some listings use (`12.0`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || FeError::InvalidId {
            text: text.to_string(),
        };
        let raw = match text.parse::<u32>() {
            Ok(raw) => raw,
            Err(_) => {
                let value: f64 = text.parse().map_err(|_| invalid())?;
                if value.fract() != 0.0 || value < 1.0 || value > u32::MAX as f64 {
                    return Err(invalid());
                }
                value as u32
            }
        };
        Self::new(raw).ok_or_else(invalid)
    }
}

impl fmt::Debug for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EngineId({})", self.get())
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Domain-specific ID aliases for clarity (no runtime cost).
pub type MeshNodeId = EngineId;
pub type ElementId = EngineId;
pub type LineId = EngineId;
pub type SectionPointId = EngineId;
