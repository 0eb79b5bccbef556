use anyhow::Result;
use std::io::Write;
use tracing::instrument;

use crate::api_client::ApiClient;
use crate::display::Printer;

/// List the regions apps can be deployed to
#[instrument(skip_all)]
pub async fn execute<W: Write>(client: &ApiClient, printer: &mut Printer<W>) -> Result<()> {
    let regions = client.list_regions().await?;
    printer.display(&regions)
}
