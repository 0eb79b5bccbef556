use anyhow::{anyhow, Result};
use std::io::Write;
use tracing::instrument;

use crate::api_client::ApiClient;
use crate::app_spec::read_app_spec;
use crate::display::Printer;

/// Print the spec of an app, or of one of its deployments
#[instrument(skip(client, printer))]
pub async fn get<W: Write>(
    client: &ApiClient,
    printer: &mut Printer<W>,
    app_id: &str,
    deployment_id: Option<&str>,
    format: &str,
) -> Result<()> {
    if format != "json" && format != "yaml" {
        return Err(anyhow!(
            "invalid spec format {:?}, must be one of: json, yaml",
            format
        ));
    }

    let spec = match deployment_id {
        None => client.get_app(app_id).await?.spec,
        Some(id) => client
            .get_deployment(app_id, id)
            .await?
            .and_then(|d| d.spec),
    }
    .ok_or_else(|| anyhow!("no spec found for app {}", app_id))?;

    let doc = match format {
        "json" => spec.to_json_pretty()?,
        _ => spec.to_yaml()?,
    };
    printer.write_raw(doc.as_bytes())
}

/// Check a spec file. With `schema_only` the spec is only decoded locally;
/// otherwise it is also reviewed by the platform.
#[instrument(skip(client, printer))]
pub async fn validate<W: Write>(
    client: &ApiClient,
    printer: &mut Printer<W>,
    spec_path: &str,
    schema_only: bool,
) -> Result<()> {
    let spec = read_app_spec(std::io::stdin(), spec_path)?;

    if schema_only {
        return printer.write_raw(spec.to_yaml()?.as_bytes());
    }

    let res = client.propose(&spec, None).await?;
    let spec = res
        .spec
        .ok_or_else(|| anyhow!("the platform did not return a validated spec"))?;
    printer.write_raw(spec.to_yaml()?.as_bytes())
}
