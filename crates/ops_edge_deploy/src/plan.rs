use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DEFAULT_ROOT_OBJECT: &str = "index.html";
pub const MINIMUM_TLS_VERSION: &str = "TLSv1.2_2019";

/// Everything needed to provision one distribution in front of a website
/// bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DistributionPlan {
    pub bucket: String,
    pub domain: String,
    pub certificate_arn: String,
}

impl DistributionPlan {
    pub fn origin_domain(&self) -> String {
        format!("{}.s3.amazonaws.com", self.bucket)
    }

    pub fn comment(&self) -> String {
        format!("Static website for {}", self.domain)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn normalize_plan(plan: DistributionPlan) -> Result<DistributionPlan, ValidationError> {
    let bucket = plan.bucket.trim().to_string();
    if bucket.is_empty() {
        return Err(ValidationError::new("bucket cannot be empty"));
    }

    let domain = plan.domain.trim().to_string();
    if domain.is_empty() {
        return Err(ValidationError::new("domain cannot be empty"));
    }

    // The control plane only accepts certificates issued in us-east-1.
    let certificate_arn = plan.certificate_arn.trim().to_string();
    if !certificate_arn.starts_with("arn:aws:acm:us-east-1:") {
        return Err(ValidationError::new(
            "certificate_arn must be an ACM certificate ARN in us-east-1",
        ));
    }

    Ok(DistributionPlan {
        bucket,
        domain,
        certificate_arn,
    })
}

/// Deterministic caller reference for one plan.
///
/// The control plane treats the caller reference as an idempotency token:
/// re-running the same plan is a no-op retry, while any change to the plan
/// provisions a new distribution.
pub fn plan_fingerprint(plan: &DistributionPlan) -> String {
    let mut hasher = Sha256::new();
    hasher.update(stable_plan_json(plan));
    format!("{:x}", hasher.finalize())
}

pub fn stable_plan_json(plan: &DistributionPlan) -> String {
    serde_json::to_string(plan).expect("serialization of distribution plan should not fail")
}
