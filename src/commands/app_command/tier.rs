use anyhow::Result;
use std::io::Write;
use tracing::instrument;

use crate::api_client::ApiClient;
use crate::display::Printer;

#[instrument(skip_all)]
pub async fn list<W: Write>(client: &ApiClient, printer: &mut Printer<W>) -> Result<()> {
    let tiers = client.list_tiers().await?;
    printer.display(&tiers)
}

#[instrument(skip(client, printer))]
pub async fn get<W: Write>(client: &ApiClient, printer: &mut Printer<W>, slug: &str) -> Result<()> {
    let tier = client.get_tier(slug).await?;
    printer.display(&[tier])
}

#[instrument(skip_all)]
pub async fn list_instance_sizes<W: Write>(client: &ApiClient, printer: &mut Printer<W>) -> Result<()> {
    let sizes = client.list_instance_sizes().await?;
    printer.display(&sizes)
}

#[instrument(skip(client, printer))]
pub async fn get_instance_size<W: Write>(
    client: &ApiClient,
    printer: &mut Printer<W>,
    slug: &str,
) -> Result<()> {
    let size = client.get_instance_size(slug).await?;
    printer.display(&[size])
}
