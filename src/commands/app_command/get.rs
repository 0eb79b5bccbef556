use anyhow::Result;
use std::io::Write;
use tracing::instrument;

use crate::api_client::ApiClient;
use crate::display::Printer;

#[instrument(skip(client, printer))]
pub async fn execute<W: Write>(client: &ApiClient, printer: &mut Printer<W>, app_id: &str) -> Result<()> {
    let app = client.get_app(app_id).await?;
    printer.display(&[app])
}
