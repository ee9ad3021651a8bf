//! Feature References

use crate::OfflineStoreError;
use std::fmt;
use std::str::FromStr;

/// A `<feature_view>:<feature_name>` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureReference {
    pub feature_view: String,
    pub feature_name: String,
}

impl FeatureReference {
    pub fn new(feature_view: impl Into<String>, feature_name: impl Into<String>) -> Self {
        Self {
            feature_view: feature_view.into(),
            feature_name: feature_name.into(),
        }
    }

    /// Build references for every feature name of one view, keeping order
    pub fn for_view<S: AsRef<str>>(feature_view: &str, feature_names: &[S]) -> Vec<Self> {
        feature_names
            .iter()
            .map(|name| Self::new(feature_view, name.as_ref()))
            .collect()
    }
}

impl fmt::Display for FeatureReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.feature_view, self.feature_name)
    }
}

impl FromStr for FeatureReference {
    type Err = OfflineStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((view, name))
                if !view.is_empty() && !name.is_empty() && !name.contains(':') =>
            {
                Ok(Self::new(view, name))
            }
            _ => Err(OfflineStoreError::InvalidReference(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let reference: FeatureReference = "training_fv:fraud".parse().unwrap();
        assert_eq!(reference, FeatureReference::new("training_fv", "fraud"));
        assert_eq!(reference.to_string(), "training_fv:fraud");
    }

    #[test]
    fn test_malformed_references() {
        for bad in ["fraud", ":fraud", "training_fv:", "a:b:c", ""] {
            assert!(
                matches!(
                    bad.parse::<FeatureReference>(),
                    Err(OfflineStoreError::InvalidReference(_))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_for_view_keeps_order() {
        let refs = FeatureReference::for_view("fv", &["b", "a"]);
        let rendered: Vec<_> = refs.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["fv:b", "fv:a"]);
    }
}
