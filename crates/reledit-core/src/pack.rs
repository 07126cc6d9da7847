//! Pack metadata recorded with every release

use semver::Version;
use serde::{Deserialize, Serialize};

/// Metadata of the pack (chart) a release was deployed from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PackMetadata {
    /// Pack name (required)
    pub name: String,

    /// Pack version (required, SemVer)
    #[serde(with = "version_serde")]
    pub version: Version,
}

impl PackMetadata {
    /// Create metadata
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// `name-version`, as shown in release listings
    pub fn display_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

mod version_serde {
    use semver::Version;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(version: &Version, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&version.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Version, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_deserialize_minimal() {
        let yaml = r#"
name: nginx
version: 1.2.3
"#;
        let meta: PackMetadata = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(meta.name, "nginx");
        assert_eq!(meta.version, Version::new(1, 2, 3));
    }

    #[test]
    fn test_metadata_invalid_version() {
        let yaml = "name: nginx\nversion: not-a-version\n";
        let result: Result<PackMetadata, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_display_name() {
        let meta = PackMetadata::new("redis", Version::new(7, 0, 1));
        assert_eq!(meta.display_name(), "redis-7.0.1");
    }
}
