use anyhow::{anyhow, Context, Result};
use futures_util::StreamExt;
use serde::Deserialize;
use std::io::Write;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info, instrument};
use url::Url;

use crate::api_client::ApiClient;
use crate::display::{warning, Printer};
use crate::errors::ApiError;
use crate::models::LogType;

#[derive(Deserialize)]
struct LogFrame {
    data: String,
}

/// Show build, deploy or run logs for an app's components.
///
/// Without an explicit deployment the active deployment is used, falling back
/// to the one in progress.
#[instrument(skip(client, printer))]
pub async fn execute<W: Write>(
    client: &ApiClient,
    printer: &mut Printer<W>,
    app_id: &str,
    component: Option<&str>,
    deployment_id: Option<&str>,
    log_type: LogType,
    follow: bool,
) -> Result<()> {
    let deployment_id = match deployment_id {
        Some(id) => id.to_string(),
        None => client
            .get_app(app_id)
            .await?
            .current_deployment()
            .map(|d| d.id.clone())
            .ok_or_else(|| {
                anyhow!(
                    "unable to retrieve logs; no deployment found for app {}",
                    app_id
                )
            })?,
    };

    let logs = client
        .get_logs(app_id, &deployment_id, component, log_type, follow)
        .await?;

    if !logs.live_url.is_empty() {
        stream_live_logs(printer, &logs.live_url).await
    } else if let Some(url) = logs.historic_urls.first() {
        let mut chunks = client.historic_logs(url).await?;
        while let Some(chunk) = chunks.next().await {
            printer.write_raw(&chunk?)?;
        }
        Ok(())
    } else {
        warning("No logs found for app component");
        Ok(())
    }
}

/// Websocket address for a live log URL
pub fn live_logs_url(live_url: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(live_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;

    let scheme = match url.scheme() {
        "http" => "ws",
        _ => "wss",
    };
    url.set_scheme(scheme)
        .map_err(|_| ApiError::InvalidUrl(live_url.to_string()))?;

    Ok(url)
}

fn write_frame<W: Write>(printer: &mut Printer<W>, frame: &[u8]) -> Result<()> {
    let frame: LogFrame = serde_json::from_slice(frame)?;
    printer.write_raw(frame.data.as_bytes())
}

async fn stream_live_logs<W: Write>(printer: &mut Printer<W>, live_url: &str) -> Result<()> {
    let url = live_logs_url(live_url)?;
    info!("Following logs at {}://{}", url.scheme(), url.host_str().unwrap_or(""));

    let (mut ws, _) = connect_async(url.as_str())
        .await
        .context("Failed to connect to the live log stream")?;
    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(text) => write_frame(printer, text.as_bytes())?,
            Message::Binary(data) => write_frame(printer, &data)?,
            Message::Close(_) => {
                debug!("Log stream closed by server");
                break;
            }
            _ => {}
        }
    }

    Ok(())
}
