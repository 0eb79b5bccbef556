use anyhow::Result;
use std::io::Write;
use tracing::{info, instrument};

use crate::api_client::ApiClient;
use crate::app_spec::read_app_spec;
use crate::display::{notice, Printer};

/// Replace an app's spec
#[instrument(skip(client, printer))]
pub async fn execute<W: Write>(
    client: &ApiClient,
    printer: &mut Printer<W>,
    app_id: &str,
    spec_path: &str,
) -> Result<()> {
    let spec = read_app_spec(std::io::stdin(), spec_path)?;

    let app = client.update_app(app_id, &spec).await?;
    info!("Updated app '{}'", app.id);
    notice("App updated");

    printer.display(&[app])
}
