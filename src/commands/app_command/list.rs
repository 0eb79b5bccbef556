use anyhow::Result;
use std::io::Write;
use tracing::instrument;

use crate::api_client::ApiClient;
use crate::display::Printer;

#[instrument(skip_all)]
pub async fn execute<W: Write>(client: &ApiClient, printer: &mut Printer<W>) -> Result<()> {
    let apps = client.list_apps().await?;
    printer.display(&apps)
}
