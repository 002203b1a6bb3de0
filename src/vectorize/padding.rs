//! Fixed-dimension vector padding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What to do with a vector longer than the target dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlengthPolicy {
    /// Return the vector unchanged. The store will see a wrong dimension.
    #[default]
    PassThrough,
    /// Keep the first `target_dim` components
    Truncate,
    /// Fail with [`PaddingError::Overlength`]
    Reject,
}

impl fmt::Display for OverlengthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlengthPolicy::PassThrough => write!(f, "pass_through"),
            OverlengthPolicy::Truncate => write!(f, "truncate"),
            OverlengthPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for OverlengthPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pass_through" | "passthrough" => Ok(OverlengthPolicy::PassThrough),
            "truncate" => Ok(OverlengthPolicy::Truncate),
            "reject" => Ok(OverlengthPolicy::Reject),
            other => anyhow::bail!("unknown overlength policy: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaddingError {
    #[error("vector has {actual} components, more than the target dimension {target}")]
    Overlength { actual: usize, target: usize },
}

/// Right-pad `vector` with zeros up to `target_dim`.
///
/// Vectors that already have `target_dim` components are returned as they
/// are. Longer vectors are handled according to `policy`.
pub fn pad_vector(
    mut vector: Vec<f32>,
    target_dim: usize,
    policy: OverlengthPolicy,
) -> Result<Vec<f32>, PaddingError> {
    if vector.len() <= target_dim {
        vector.resize(target_dim, 0.0);
        return Ok(vector);
    }

    match policy {
        OverlengthPolicy::PassThrough => Ok(vector),
        OverlengthPolicy::Truncate => {
            vector.truncate(target_dim);
            Ok(vector)
        }
        OverlengthPolicy::Reject => Err(PaddingError::Overlength {
            actual: vector.len(),
            target: target_dim,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pads_short_vectors() {
        let padded = pad_vector(vec![1.0, 2.0], 5, OverlengthPolicy::default()).unwrap();
        assert_eq!(padded, vec![1.0, 2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_exact_length_is_unchanged() {
        let padded = pad_vector(vec![1.0, 2.0], 2, OverlengthPolicy::Reject).unwrap();
        assert_eq!(padded, vec![1.0, 2.0]);
    }

    #[test]
    fn test_overlength_passes_through_by_default() {
        let padded = pad_vector(vec![1.0, 2.0, 3.0], 2, OverlengthPolicy::default()).unwrap();
        assert_eq!(padded, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_overlength_policies() {
        assert_eq!(
            pad_vector(vec![1.0, 2.0, 3.0], 2, OverlengthPolicy::Truncate).unwrap(),
            vec![1.0, 2.0]
        );
        assert_eq!(
            pad_vector(vec![1.0, 2.0, 3.0], 2, OverlengthPolicy::Reject),
            Err(PaddingError::Overlength {
                actual: 3,
                target: 2
            })
        );
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "truncate".parse::<OverlengthPolicy>().unwrap(),
            OverlengthPolicy::Truncate
        );
        assert_eq!(
            OverlengthPolicy::PassThrough.to_string(),
            "pass_through"
        );
        assert!("clip".parse::<OverlengthPolicy>().is_err());
    }
}
