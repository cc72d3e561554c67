//! Scan policy supplied by the host.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Traversal and accounting switches consumed by the scanner.
///
/// The core never persists this; hosts may serialize it however they like.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
pub struct ScanPolicy {
    /// Descend into directories that are mount points of other volumes.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_mount_points: bool,

    /// Descend into junctions and directory symlinks.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_junctions: bool,

    /// Attach a FreeSpace leaf to scanned volumes.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub show_free_space: bool,

    /// Attach an Unknown leaf to scanned volumes.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub show_unknown: bool,

    /// Collect the files of mixed directories under a `<Files>` node.
    #[builder(default = "false")]
    #[serde(default)]
    pub group_files: bool,
}

fn default_true() -> bool {
    true
}

impl ScanPolicy {
    /// Create a new policy builder.
    pub fn builder() -> ScanPolicyBuilder {
        ScanPolicyBuilder::default()
    }

    /// Whether any synthetic volume item is enabled.
    pub fn wants_synthetic_items(&self) -> bool {
        self.show_free_space || self.show_unknown
    }
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            follow_mount_points: false,
            follow_junctions: false,
            show_free_space: true,
            show_unknown: true,
            group_files: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_builder() {
        let policy = ScanPolicy::builder()
            .follow_junctions(true)
            .show_unknown(false)
            .build()
            .unwrap();

        assert!(policy.follow_junctions);
        assert!(!policy.follow_mount_points);
        assert!(policy.show_free_space);
        assert!(!policy.show_unknown);
        assert!(policy.wants_synthetic_items());
    }

    #[test]
    fn test_builder_defaults_match_default() {
        let built = ScanPolicy::builder().build().unwrap();
        assert_eq!(built, ScanPolicy::default());
    }
}
