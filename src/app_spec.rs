//! App specs: the document describing an app's desired configuration.
//!
//! Specs are read from YAML or JSON (JSON being valid YAML, a single decoder
//! handles both). Decoding of user supplied specs is strict: any field the
//! platform schema does not know about is rejected. Specs the API hands back
//! are kept verbatim as a [`RemoteSpec`].

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, instrument};

/// Path value that means "read the spec from standard input"
pub const STDIN_PATH: &str = "-";

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("opening app spec: {0} does not exist")]
    NotFound(PathBuf),
    #[error("opening app spec: {0}")]
    Open(#[source] io::Error),
    #[error("reading app spec: {0}")]
    Read(#[source] io::Error),
    #[error("parsing app spec: {0}")]
    Parse(#[source] serde_yaml_ng::Error),
    #[error("marshaling the spec as yaml: {0}")]
    EncodeYaml(#[source] serde_yaml_ng::Error),
    #[error("marshaling the spec as json: {0}")]
    EncodeJson(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<AppDomainSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<AppServiceSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub static_sites: Vec<AppStaticSiteSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workers: Vec<AppWorkerSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jobs: Vec<AppJobSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub databases: Vec<AppDatabaseSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<AppVariableDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppDomainSpec {
    pub domain: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub domain_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wildcard: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitSourceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_clone_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// Source hosted on GitHub or GitLab
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostedGitSourceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_on_push: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageSourceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppRouteSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserve_path_prefix: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppHealthCheckSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_threshold: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppVariableDefinition {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub var_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppServiceSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitSourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<HostedGitSourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab: Option<HostedGitSourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<AppVariableDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_size_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub internal_ports: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<AppRouteSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<AppHealthCheckSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppStaticSiteSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitSourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<HostedGitSourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab: Option<HostedGitSourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catchall_document: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<AppVariableDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<AppRouteSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppWorkerSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitSourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<HostedGitSourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab: Option<HostedGitSourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<AppVariableDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_size_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_count: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppJobSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitSourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<HostedGitSourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab: Option<HostedGitSourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSourceSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<AppVariableDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_size_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_count: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppDatabaseSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_user: Option<String>,
}

impl AppSpec {
    /// Decode a YAML or JSON document, rejecting unknown fields
    pub fn parse(doc: &[u8]) -> Result<Self, SpecError> {
        serde_yaml_ng::from_slice(doc).map_err(SpecError::Parse)
    }

    pub fn to_yaml(&self) -> Result<String, SpecError> {
        serde_yaml_ng::to_string(self).map_err(SpecError::EncodeYaml)
    }

    /// Two-space indented JSON with a trailing newline
    pub fn to_json_pretty(&self) -> Result<String, SpecError> {
        let mut json = serde_json::to_string_pretty(self).map_err(SpecError::EncodeJson)?;
        json.push('\n');
        Ok(json)
    }
}

/// A spec as returned by the API. The platform may send fields this client
/// does not model, so the document is carried as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteSpec(pub serde_json::Value);

impl RemoteSpec {
    pub fn name(&self) -> &str {
        self.0.get("name").and_then(|n| n.as_str()).unwrap_or("")
    }

    pub fn to_yaml(&self) -> Result<String, SpecError> {
        serde_yaml_ng::to_string(&self.0).map_err(SpecError::EncodeYaml)
    }

    /// Two-space indented JSON with a trailing newline
    pub fn to_json_pretty(&self) -> Result<String, SpecError> {
        let mut json = serde_json::to_string_pretty(&self.0).map_err(SpecError::EncodeJson)?;
        json.push('\n');
        Ok(json)
    }
}

/// Read an app spec from `path`, or from `stdin` when `path` is `-`
#[instrument(skip(stdin))]
pub fn read_app_spec(mut stdin: impl Read, path: &str) -> Result<AppSpec, SpecError> {
    let mut doc = Vec::new();

    if path == STDIN_PATH {
        stdin.read_to_end(&mut doc).map_err(SpecError::Read)?;
    } else {
        let mut file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SpecError::NotFound(PathBuf::from(path)),
            _ => SpecError::Open(e),
        })?;
        file.read_to_end(&mut doc).map_err(SpecError::Read)?;
    }

    debug!("Read {} bytes of app spec", doc.len());
    AppSpec::parse(&doc)
}
