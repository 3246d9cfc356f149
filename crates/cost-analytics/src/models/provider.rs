use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CloudProvider {
    #[serde(rename = "AWS", alias = "aws")]
    Aws,
    #[serde(rename = "GCP", alias = "gcp")]
    Gcp,
    #[serde(rename = "AZURE", alias = "azure")]
    Azure,
}

impl CloudProvider {
    pub const ALL: [CloudProvider; 3] = [CloudProvider::Aws, CloudProvider::Gcp, CloudProvider::Azure];
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudProvider::Aws => write!(f, "AWS"),
            CloudProvider::Gcp => write!(f, "GCP"),
            CloudProvider::Azure => write!(f, "AZURE"),
        }
    }
}

impl std::str::FromStr for CloudProvider {
    type Err = crate::error::NormalizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aws" | "amazon" => Ok(CloudProvider::Aws),
            "gcp" | "google" => Ok(CloudProvider::Gcp),
            "azure" | "microsoft" => Ok(CloudProvider::Azure),
            _ => Err(crate::error::NormalizationError::invalid_payload(format!(
                "unknown provider: {}",
                s
            ))),
        }
    }
}

/// Cross-provider grouping that provider service names map into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceCategory {
    Compute,
    Storage,
    Database,
    Networking,
    Analytics,
    MachineLearning,
    Security,
    Management,
    Monitoring,
    DeveloperTools,
    Integration,
    Containers,
    Serverless,
    Iot,
    Support,
    Other,
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ServiceCategory::Compute => "COMPUTE",
            ServiceCategory::Storage => "STORAGE",
            ServiceCategory::Database => "DATABASE",
            ServiceCategory::Networking => "NETWORKING",
            ServiceCategory::Analytics => "ANALYTICS",
            ServiceCategory::MachineLearning => "MACHINE_LEARNING",
            ServiceCategory::Security => "SECURITY",
            ServiceCategory::Management => "MANAGEMENT",
            ServiceCategory::Monitoring => "MONITORING",
            ServiceCategory::DeveloperTools => "DEVELOPER_TOOLS",
            ServiceCategory::Integration => "INTEGRATION",
            ServiceCategory::Containers => "CONTAINERS",
            ServiceCategory::Serverless => "SERVERLESS",
            ServiceCategory::Iot => "IOT",
            ServiceCategory::Support => "SUPPORT",
            ServiceCategory::Other => "OTHER",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_provider_from_str() {
        assert_eq!(CloudProvider::from_str("aws").unwrap(), CloudProvider::Aws);
        assert_eq!(CloudProvider::from_str("AWS").unwrap(), CloudProvider::Aws);
        assert_eq!(CloudProvider::from_str("gcp").unwrap(), CloudProvider::Gcp);
        assert_eq!(CloudProvider::from_str("Azure").unwrap(), CloudProvider::Azure);
        assert!(CloudProvider::from_str("onprem").is_err());
    }

    #[test]
    fn test_provider_display() {
        assert_eq!(CloudProvider::Aws.to_string(), "AWS");
        assert_eq!(CloudProvider::Gcp.to_string(), "GCP");
        assert_eq!(CloudProvider::Azure.to_string(), "AZURE");
    }

    #[test]
    fn test_provider_serialization() {
        let json = serde_json::to_string(&CloudProvider::Azure).unwrap();
        assert_eq!(json, "\"AZURE\"");

        let lower: CloudProvider = serde_json::from_str("\"gcp\"").unwrap();
        assert_eq!(lower, CloudProvider::Gcp);
    }

    #[test]
    fn test_category_serialization_matches_display() {
        for category in [
            ServiceCategory::MachineLearning,
            ServiceCategory::DeveloperTools,
            ServiceCategory::Other,
        ] {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category));
        }
    }
}
