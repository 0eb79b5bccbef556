use anyhow::Result;
use std::io::Write;
use tracing::instrument;

use crate::api_client::ApiClient;
use crate::app_spec::read_app_spec;
use crate::display::Printer;

/// Ask the platform to review a spec, optionally as an update to an existing app
#[instrument(skip(client, printer))]
pub async fn execute<W: Write>(
    client: &ApiClient,
    printer: &mut Printer<W>,
    spec_path: &str,
    app_id: Option<&str>,
) -> Result<()> {
    let spec = read_app_spec(std::io::stdin(), spec_path)?;

    // An invalid spec comes back as an API error starting with "error validating app spec"
    let res = client.propose(&spec, app_id).await?;

    printer.display(&[res])
}
