use anyhow::Result;
use std::io::Write;
use tracing::{info, instrument};

use crate::api_client::ApiClient;
use crate::app_spec::read_app_spec;
use crate::display::{notice, Printer};

/// Create an app from a spec file
#[instrument(skip(client, printer))]
pub async fn execute<W: Write>(
    client: &ApiClient,
    printer: &mut Printer<W>,
    spec_path: &str,
) -> Result<()> {
    let spec = read_app_spec(std::io::stdin(), spec_path)?;

    let app = client.create_app(&spec).await?;
    info!("Created app '{}' ({})", app.name(), app.id);
    notice("App created");

    printer.display(&[app])
}
