use anyhow::{Context, Result};
use dialoguer::Confirm;
use tracing::{info, instrument};

use crate::api_client::ApiClient;
use crate::display::notice;

#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error("Operation aborted.")]
    Aborted,
}

/// Delete an app and all of its deployments
#[instrument(skip(client))]
pub async fn execute(client: &ApiClient, app_id: &str, force: bool) -> Result<()> {
    if !force {
        let confirmed = Confirm::new()
            .with_prompt("Warning: Are you sure you want to delete this App?")
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;

        if !confirmed {
            return Err(DeleteError::Aborted.into());
        }
    }

    client.delete_app(app_id).await?;
    info!("Deleted app '{}'", app_id);
    notice("App deleted");

    Ok(())
}
