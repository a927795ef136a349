//! Trained model representation.

mod forest;
mod tree;

pub use forest::Forest;
pub use tree::{LeafStats, NodeSplit, Tree, TreeParts, TreeValidationError, ZERO_THRESHOLD};

/// How a split treats missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingType {
    /// NaN reads as 0; no default direction.
    None,
    /// Zeros (and NaN) take the default direction.
    Zero,
    /// NaN takes the default direction.
    NaN,
}

/// Bit layout of the per-node `decision_type` byte.
pub mod decision {
    use super::MissingType;

    pub const CATEGORICAL: u8 = 1;
    pub const DEFAULT_LEFT: u8 = 1 << 1;
    const MISSING_SHIFT: u8 = 2;

    #[inline]
    pub fn is_categorical(decision_type: u8) -> bool {
        decision_type & CATEGORICAL != 0
    }

    #[inline]
    pub fn default_left(decision_type: u8) -> bool {
        decision_type & DEFAULT_LEFT != 0
    }

    #[inline]
    pub fn missing_type(decision_type: u8) -> MissingType {
        match (decision_type >> MISSING_SHIFT) & 3 {
            1 => MissingType::Zero,
            2 => MissingType::NaN,
            _ => MissingType::None,
        }
    }

    pub fn encode(default_left: bool, missing: MissingType) -> u8 {
        let missing = match missing {
            MissingType::None => 0,
            MissingType::Zero => 1,
            MissingType::NaN => 2,
        };
        (if default_left { DEFAULT_LEFT } else { 0 }) | (missing << MISSING_SHIFT)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn encode_decode() {
            for missing in [MissingType::None, MissingType::Zero, MissingType::NaN] {
                for left in [true, false] {
                    let d = encode(left, missing);
                    assert_eq!(default_left(d), left);
                    assert_eq!(missing_type(d), missing);
                    assert!(!is_categorical(d));
                }
            }
            assert_eq!(encode(true, MissingType::None), 2);
        }
    }
}
