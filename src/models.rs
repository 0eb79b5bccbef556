use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app_spec::RemoteSpec;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<RemoteSpec>,
    #[serde(default)]
    pub default_ingress: String,
    #[serde(default)]
    pub live_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_deployment: Option<Deployment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_progress_deployment: Option<Deployment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<AppRegion>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl App {
    /// Name from the app's spec, empty when the API omitted the spec
    pub fn name(&self) -> &str {
        self.spec.as_ref().map(|s| s.name()).unwrap_or("")
    }

    /// Deployment whose logs are shown when none is requested explicitly
    pub fn current_deployment(&self) -> Option<&Deployment> {
        self.active_deployment
            .as_ref()
            .or(self.in_progress_deployment.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<RemoteSpec>,
    #[serde(default)]
    pub phase: DeploymentPhase,
    #[serde(default)]
    pub cause: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<DeploymentProgress>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentProgress {
    #[serde(default)]
    pub success_steps: u32,
    #[serde(default)]
    pub total_steps: u32,
}

/// Lifecycle stage of a deployment.
///
/// Values the API sends that are not part of the known set are kept verbatim
/// in `Unrecognized` so they can be reported back to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeploymentPhase {
    PendingBuild,
    PendingDeploy,
    Building,
    Deploying,
    Active,
    Error,
    Canceled,
    Unknown,
    Unrecognized(String),
}

impl DeploymentPhase {
    pub fn as_str(&self) -> &str {
        match self {
            DeploymentPhase::PendingBuild => "PENDING_BUILD",
            DeploymentPhase::PendingDeploy => "PENDING_DEPLOY",
            DeploymentPhase::Building => "BUILDING",
            DeploymentPhase::Deploying => "DEPLOYING",
            DeploymentPhase::Active => "ACTIVE",
            DeploymentPhase::Error => "ERROR",
            DeploymentPhase::Canceled => "CANCELED",
            DeploymentPhase::Unknown => "UNKNOWN",
            DeploymentPhase::Unrecognized(s) => s,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            DeploymentPhase::PendingBuild
                | DeploymentPhase::PendingDeploy
                | DeploymentPhase::Building
                | DeploymentPhase::Deploying
        )
    }
}

/// A deployment without a phase has an empty, unrecognized one
impl Default for DeploymentPhase {
    fn default() -> Self {
        DeploymentPhase::Unrecognized(String::new())
    }
}

impl From<String> for DeploymentPhase {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PENDING_BUILD" => DeploymentPhase::PendingBuild,
            "PENDING_DEPLOY" => DeploymentPhase::PendingDeploy,
            "BUILDING" => DeploymentPhase::Building,
            "DEPLOYING" => DeploymentPhase::Deploying,
            "ACTIVE" => DeploymentPhase::Active,
            "ERROR" => DeploymentPhase::Error,
            "CANCELED" => DeploymentPhase::Canceled,
            "UNKNOWN" => DeploymentPhase::Unknown,
            _ => DeploymentPhase::Unrecognized(s),
        }
    }
}

impl From<DeploymentPhase> for String {
    fn from(phase: DeploymentPhase) -> Self {
        match phase {
            DeploymentPhase::Unrecognized(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for DeploymentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppRegion {
    pub slug: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub flag: String,
    #[serde(default)]
    pub continent: String,
    #[serde(default)]
    pub data_centers: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppTier {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub egress_bandwidth_bytes: String,
    #[serde(default)]
    pub build_seconds: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppInstanceSize {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub cpu_type: String,
    #[serde(default)]
    pub cpus: String,
    #[serde(default)]
    pub memory_bytes: String,
    #[serde(default)]
    pub usd_per_month: String,
    #[serde(default)]
    pub usd_per_second: String,
    #[serde(default)]
    pub tier_slug: String,
    #[serde(default)]
    pub tier_upgrade_to: String,
    #[serde(default)]
    pub tier_downgrade_to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppProposeResponse {
    #[serde(default)]
    pub app_is_static: bool,
    #[serde(default)]
    pub app_name_available: bool,
    #[serde(default)]
    pub app_name_suggestion: String,
    #[serde(default)]
    pub existing_static_apps: String,
    #[serde(default)]
    pub max_free_static_apps: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<RemoteSpec>,
    #[serde(default)]
    pub app_cost: f64,
    #[serde(default)]
    pub app_tier_upgrade_cost: f64,
    #[serde(default)]
    pub app_tier_downgrade_cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppLogs {
    #[serde(default)]
    pub live_url: String,
    #[serde(default)]
    pub historic_urls: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogType {
    Build,
    Deploy,
    Run,
}

impl LogType {
    /// Value of the `type` query parameter
    pub fn as_query(&self) -> &'static str {
        match self {
            LogType::Build => "BUILD",
            LogType::Deploy => "DEPLOY",
            LogType::Run => "RUN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallRule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uuid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_uuid: String,
    #[serde(rename = "type")]
    pub rule_type: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl FirewallRule {
    /// Parse a `type:value` pair as given on the command line
    pub fn parse(s: &str) -> Option<Self> {
        let (rule_type, value) = s.split_once(':')?;
        if rule_type.is_empty() || value.is_empty() {
            return None;
        }
        Some(Self {
            uuid: String::new(),
            cluster_uuid: String::new(),
            rule_type: rule_type.to_string(),
            value: value.to_string(),
            created_at: None,
        })
    }
}
