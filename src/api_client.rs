use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::app_spec::AppSpec;
use crate::config::ClientConfig;
use crate::errors::{util::error_message, ApiError, ApiResult};
use crate::models::{
    App, AppInstanceSize, AppLogs, AppProposeResponse, AppRegion, AppTier, Deployment,
    FirewallRule, LogType,
};

const PER_PAGE: usize = 200;

#[derive(Deserialize)]
struct AppRoot {
    app: App,
}

#[derive(Deserialize)]
struct AppsRoot {
    #[serde(default)]
    apps: Vec<App>,
    #[serde(default)]
    links: Links,
}

#[derive(Deserialize)]
struct DeploymentRoot {
    deployment: Option<Deployment>,
}

#[derive(Deserialize)]
struct DeploymentsRoot {
    #[serde(default)]
    deployments: Vec<Deployment>,
    #[serde(default)]
    links: Links,
}

#[derive(Deserialize)]
struct RegionsRoot {
    #[serde(default)]
    regions: Vec<AppRegion>,
}

#[derive(Deserialize)]
struct TiersRoot {
    #[serde(default)]
    tiers: Vec<AppTier>,
}

#[derive(Deserialize)]
struct TierRoot {
    tier: AppTier,
}

#[derive(Deserialize)]
struct InstanceSizesRoot {
    #[serde(default)]
    instance_sizes: Vec<AppInstanceSize>,
}

#[derive(Deserialize)]
struct InstanceSizeRoot {
    instance_size: AppInstanceSize,
}

#[derive(Deserialize)]
struct FirewallRulesRoot {
    #[serde(default)]
    rules: Vec<FirewallRule>,
}

#[derive(Default, Deserialize)]
struct Links {
    pages: Option<Pages>,
}

#[derive(Default, Deserialize)]
struct Pages {
    next: Option<String>,
}

impl Links {
    fn has_next(&self) -> bool {
        self.pages.as_ref().and_then(|p| p.next.as_ref()).is_some()
    }
}

#[derive(Serialize)]
struct SpecRequest<'a> {
    spec: &'a AppSpec,
}

#[derive(Serialize)]
struct ProposeRequest<'a> {
    spec: &'a AppSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    app_id: Option<&'a str>,
}

#[derive(Serialize)]
struct DeploymentRequest {
    force_build: bool,
}

#[derive(Serialize)]
struct FirewallRulesRequest<'a> {
    rules: &'a [FirewallRule],
}

pub struct ApiClient {
    config: ClientConfig,
    client: Client,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let token = self
            .config
            .access_token
            .as_deref()
            .ok_or(ApiError::MissingToken)?;
        Ok(self.client.request(method, self.url(path)).bearer_auth(token))
    }

    async fn send_raw(&self, builder: RequestBuilder) -> ApiResult<reqwest::Response> {
        let request = builder.build()?;
        let method = request.method().to_string();
        let url = request.url().to_string();
        debug!("{} {}", method, url);

        let response = self.client.execute(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await?;
        Err(ApiError::Status {
            method,
            url,
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let response = self.send_raw(builder).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    #[instrument(skip(self, spec))]
    pub async fn create_app(&self, spec: &AppSpec) -> ApiResult<App> {
        let builder = self
            .request(Method::POST, "/v2/apps")?
            .json(&SpecRequest { spec });
        let root: AppRoot = self.send(builder).await?;
        Ok(root.app)
    }

    #[instrument(skip(self))]
    pub async fn get_app(&self, app_id: &str) -> ApiResult<App> {
        let builder = self.request(Method::GET, &format!("/v2/apps/{}", app_id))?;
        let root: AppRoot = self.send(builder).await?;
        Ok(root.app)
    }

    #[instrument(skip(self))]
    pub async fn list_apps(&self) -> ApiResult<Vec<App>> {
        let mut apps = Vec::new();
        let mut page = 1;
        loop {
            let builder = self
                .request(Method::GET, "/v2/apps")?
                .query(&[("page", page), ("per_page", PER_PAGE)]);
            let root: AppsRoot = self.send(builder).await?;
            apps.extend(root.apps);

            if !root.links.has_next() {
                return Ok(apps);
            }
            page += 1;
        }
    }

    #[instrument(skip(self, spec))]
    pub async fn update_app(&self, app_id: &str, spec: &AppSpec) -> ApiResult<App> {
        let builder = self
            .request(Method::PUT, &format!("/v2/apps/{}", app_id))?
            .json(&SpecRequest { spec });
        let root: AppRoot = self.send(builder).await?;
        Ok(root.app)
    }

    #[instrument(skip(self))]
    pub async fn delete_app(&self, app_id: &str) -> ApiResult<()> {
        let builder = self.request(Method::DELETE, &format!("/v2/apps/{}", app_id))?;
        self.send_raw(builder).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn create_deployment(&self, app_id: &str, force_build: bool) -> ApiResult<Deployment> {
        let builder = self
            .request(Method::POST, &format!("/v2/apps/{}/deployments", app_id))?
            .json(&DeploymentRequest { force_build });
        let root: DeploymentRoot = self.send(builder).await?;
        root.deployment.ok_or(ApiError::EmptyResponse("deployment"))
    }

    /// Fetch a deployment; `None` when the API answered without one
    #[instrument(skip(self))]
    pub async fn get_deployment(
        &self,
        app_id: &str,
        deployment_id: &str,
    ) -> ApiResult<Option<Deployment>> {
        let builder = self.request(
            Method::GET,
            &format!("/v2/apps/{}/deployments/{}", app_id, deployment_id),
        )?;
        let root: DeploymentRoot = self.send(builder).await?;
        Ok(root.deployment)
    }

    #[instrument(skip(self))]
    pub async fn list_deployments(&self, app_id: &str) -> ApiResult<Vec<Deployment>> {
        let mut deployments = Vec::new();
        let mut page = 1;
        loop {
            let builder = self
                .request(Method::GET, &format!("/v2/apps/{}/deployments", app_id))?
                .query(&[("page", page), ("per_page", PER_PAGE)]);
            let root: DeploymentsRoot = self.send(builder).await?;
            deployments.extend(root.deployments);

            if !root.links.has_next() {
                return Ok(deployments);
            }
            page += 1;
        }
    }

    #[instrument(skip(self))]
    pub async fn get_logs(
        &self,
        app_id: &str,
        deployment_id: &str,
        component: Option<&str>,
        log_type: LogType,
        follow: bool,
    ) -> ApiResult<AppLogs> {
        let path = match component {
            Some(name) => format!(
                "/v2/apps/{}/deployments/{}/components/{}/logs",
                app_id, deployment_id, name
            ),
            None => format!("/v2/apps/{}/deployments/{}/logs", app_id, deployment_id),
        };
        let builder = self
            .request(Method::GET, &path)?
            .query(&[("type", log_type.as_query())])
            .query(&[("follow", follow)]);
        self.send(builder).await
    }

    /// Stream an archived log file. Historic URLs are pre-signed, so no
    /// credentials are attached.
    pub async fn historic_logs(&self, url: &str) -> ApiResult<BoxStream<'static, ApiResult<Bytes>>> {
        let response = self.send_raw(self.client.get(url)).await?;
        let stream = response
            .bytes_stream()
            .map(|chunk: Result<Bytes, reqwest::Error>| chunk.map_err(ApiError::from))
            .boxed();
        Ok(stream)
    }

    #[instrument(skip(self))]
    pub async fn list_regions(&self) -> ApiResult<Vec<AppRegion>> {
        let builder = self.request(Method::GET, "/v2/apps/regions")?;
        let root: RegionsRoot = self.send(builder).await?;
        Ok(root.regions)
    }

    #[instrument(skip(self, spec))]
    pub async fn propose(&self, spec: &AppSpec, app_id: Option<&str>) -> ApiResult<AppProposeResponse> {
        let builder = self
            .request(Method::POST, "/v2/apps/propose")?
            .json(&ProposeRequest { spec, app_id });
        self.send(builder).await
    }

    #[instrument(skip(self))]
    pub async fn list_tiers(&self) -> ApiResult<Vec<AppTier>> {
        let builder = self.request(Method::GET, "/v2/apps/tiers")?;
        let root: TiersRoot = self.send(builder).await?;
        Ok(root.tiers)
    }

    #[instrument(skip(self))]
    pub async fn get_tier(&self, slug: &str) -> ApiResult<AppTier> {
        let builder = self.request(Method::GET, &format!("/v2/apps/tiers/{}", slug))?;
        let root: TierRoot = self.send(builder).await?;
        Ok(root.tier)
    }

    #[instrument(skip(self))]
    pub async fn list_instance_sizes(&self) -> ApiResult<Vec<AppInstanceSize>> {
        let builder = self.request(Method::GET, "/v2/apps/tiers/instance_sizes")?;
        let root: InstanceSizesRoot = self.send(builder).await?;
        Ok(root.instance_sizes)
    }

    #[instrument(skip(self))]
    pub async fn get_instance_size(&self, slug: &str) -> ApiResult<AppInstanceSize> {
        let builder = self.request(
            Method::GET,
            &format!("/v2/apps/tiers/instance_sizes/{}", slug),
        )?;
        let root: InstanceSizeRoot = self.send(builder).await?;
        Ok(root.instance_size)
    }

    #[instrument(skip(self))]
    pub async fn get_firewall_rules(&self, database_id: &str) -> ApiResult<Vec<FirewallRule>> {
        let builder = self.request(
            Method::GET,
            &format!("/v2/databases/{}/firewall", database_id),
        )?;
        let root: FirewallRulesRoot = self.send(builder).await?;
        Ok(root.rules)
    }

    #[instrument(skip(self, rules))]
    pub async fn update_firewall_rules(
        &self,
        database_id: &str,
        rules: &[FirewallRule],
    ) -> ApiResult<()> {
        let builder = self
            .request(
                Method::PUT,
                &format!("/v2/databases/{}/firewall", database_id),
            )?
            .json(&FirewallRulesRequest { rules });
        self.send_raw(builder).await?;
        Ok(())
    }
}
