use anyhow::{anyhow, Result};
use std::io::Write;
use tracing::{info, instrument};

use crate::api_client::ApiClient;
use crate::display::Printer;
use crate::models::FirewallRule;

#[instrument(skip(client, printer))]
pub async fn list<W: Write>(client: &ApiClient, printer: &mut Printer<W>, database_id: &str) -> Result<()> {
    let rules = client.get_firewall_rules(database_id).await?;
    printer.display(&rules)
}

/// Replace a database cluster's firewall rules, then show the resulting set
#[instrument(skip(client, printer))]
pub async fn update<W: Write>(
    client: &ApiClient,
    printer: &mut Printer<W>,
    database_id: &str,
    rules: &[String],
) -> Result<()> {
    let rules = rules
        .iter()
        .map(|r| {
            FirewallRule::parse(r).ok_or_else(|| {
                anyhow!(
                    "unexpected format for firewall rule {:?}, must be <type>:<value>",
                    r
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    client.update_firewall_rules(database_id, &rules).await?;
    info!("Updated {} firewall rules for database {}", rules.len(), database_id);

    list(client, printer, database_id).await
}
