use anyhow::{anyhow, Result};
use std::io::Write;
use tracing::{info, instrument};

use crate::api_client::ApiClient;
use crate::display::{notice, warning, Printer};
use crate::watcher::{wait_for_deployment, WaitPolicy};

/// Trigger a deployment, optionally waiting for it to become active.
///
/// When waiting fails the last known deployment is still displayed before the
/// error is returned.
#[instrument(skip(client, printer, policy))]
pub async fn create<W: Write>(
    client: &ApiClient,
    printer: &mut Printer<W>,
    app_id: &str,
    force_rebuild: bool,
    wait: bool,
    policy: WaitPolicy,
) -> Result<()> {
    let deployment = client.create_deployment(app_id, force_rebuild).await?;
    info!("Created deployment {} for app '{}'", deployment.id, app_id);
    notice("Deployment created");

    if !wait {
        return printer.display(&[deployment]);
    }

    notice("App deployment is in progress, waiting for deployment to be running");
    let result = wait_for_deployment(
        client,
        app_id,
        &deployment.id,
        policy,
        &mut std::io::stderr(),
        tokio::time::sleep,
    )
    .await;

    match result {
        Ok(active) => printer.display(&[active]),
        Err(err) => {
            warning(&format!(
                "App deployment couldn't enter `running` state: {}",
                err
            ));
            let last_known = err.deployment().cloned().unwrap_or(deployment);
            printer.display(&[last_known])?;
            Err(err.into())
        }
    }
}

#[instrument(skip(client, printer))]
pub async fn get<W: Write>(
    client: &ApiClient,
    printer: &mut Printer<W>,
    app_id: &str,
    deployment_id: &str,
) -> Result<()> {
    let deployment = match client.get_deployment(app_id, deployment_id).await {
        Ok(deployment) => deployment,
        Err(e) if e.status() == Some(404) => None,
        Err(e) => return Err(e.into()),
    }
    .ok_or_else(|| anyhow!("deployment {} not found for app {}", deployment_id, app_id))?;
    printer.display(&[deployment])
}

#[instrument(skip(client, printer))]
pub async fn list<W: Write>(client: &ApiClient, printer: &mut Printer<W>, app_id: &str) -> Result<()> {
    let deployments = client.list_deployments(app_id).await?;
    printer.display(&deployments)
}
