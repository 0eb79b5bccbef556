use std::io::Write;

use chrono::{DateTime, Utc};
use prettytable::{format, Cell, Row, Table};
use serde::Serialize;

use crate::models::{
    App, AppInstanceSize, AppProposeResponse, AppRegion, AppTier, Deployment, FirewallRule,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Something that can be shown as a table row or as JSON
pub trait Displayable: Serialize {
    fn titles() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

pub struct Printer<W: Write> {
    format: OutputFormat,
    out: W,
}

impl Printer<std::io::Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(format, std::io::stdout())
    }
}

impl<W: Write> Printer<W> {
    pub fn new(format: OutputFormat, out: W) -> Self {
        Self { format, out }
    }

    pub fn display<T: Displayable>(&mut self, items: &[T]) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut self.out, items)?;
                writeln!(self.out)?;
            }
            OutputFormat::Text => {
                let mut table = Table::new();
                table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
                table.set_titles(Row::new(T::titles().into_iter().map(Cell::new).collect()));
                for item in items {
                    table.add_row(Row::new(item.row().iter().map(|c| Cell::new(c)).collect()));
                }
                table.print(&mut self.out)?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    /// Write output that is already formatted, such as a spec document
    pub fn write_raw(&mut self, data: &[u8]) -> anyhow::Result<()> {
        self.out.write_all(data)?;
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

pub fn notice(msg: &str) {
    eprintln!("Notice: {}", msg);
}

pub fn warning(msg: &str) {
    eprintln!("Warning: {}", msg);
}

fn time(t: &Option<DateTime<Utc>>) -> String {
    t.map(|t| t.format("%Y-%m-%d %H:%M:%S %z UTC").to_string())
        .unwrap_or_default()
}

impl Displayable for App {
    fn titles() -> Vec<&'static str> {
        vec![
            "ID",
            "Spec Name",
            "Default Ingress",
            "Active Deployment ID",
            "In Progress Deployment ID",
            "Created At",
            "Updated At",
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name().to_string(),
            self.default_ingress.clone(),
            self.active_deployment
                .as_ref()
                .map(|d| d.id.clone())
                .unwrap_or_default(),
            self.in_progress_deployment
                .as_ref()
                .map(|d| d.id.clone())
                .unwrap_or_default(),
            time(&self.created_at),
            time(&self.updated_at),
        ]
    }
}

impl Displayable for Deployment {
    fn titles() -> Vec<&'static str> {
        vec!["ID", "Cause", "Progress", "Phase", "Created At", "Updated At"]
    }

    fn row(&self) -> Vec<String> {
        let progress = match &self.progress {
            Some(p) => format!("{}/{}", p.success_steps, p.total_steps),
            None => String::new(),
        };
        vec![
            self.id.clone(),
            self.cause.clone(),
            progress,
            self.phase.to_string(),
            time(&self.created_at),
            time(&self.updated_at),
        ]
    }
}

impl Displayable for AppRegion {
    fn titles() -> Vec<&'static str> {
        vec![
            "Region",
            "Label",
            "Continent",
            "Data Centers",
            "Is Disabled?",
            "Reason (if disabled)",
            "Is Default?",
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.slug.clone(),
            self.label.clone(),
            self.continent.clone(),
            self.data_centers.join(", "),
            self.disabled.to_string(),
            self.reason.clone().unwrap_or_default(),
            self.default.to_string(),
        ]
    }
}

impl Displayable for AppTier {
    fn titles() -> Vec<&'static str> {
        vec!["Name", "Slug", "Egress Bandwidth", "Build Seconds"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.slug.clone(),
            self.egress_bandwidth_bytes.clone(),
            self.build_seconds.clone(),
        ]
    }
}

impl Displayable for AppInstanceSize {
    fn titles() -> Vec<&'static str> {
        vec![
            "Name",
            "Slug",
            "vCPUs",
            "Memory",
            "$/month",
            "$/second",
            "Tier",
            "Tier Upgrade/Downgrade Path",
        ]
    }

    fn row(&self) -> Vec<String> {
        let mut path = Vec::new();
        if !self.tier_downgrade_to.is_empty() {
            path.push(format!("{} <-", self.tier_downgrade_to));
        }
        path.push(self.slug.clone());
        if !self.tier_upgrade_to.is_empty() {
            path.push(format!("-> {}", self.tier_upgrade_to));
        }

        vec![
            self.name.clone(),
            self.slug.clone(),
            format!("{} {}", self.cpus, self.cpu_type.to_lowercase()),
            self.memory_bytes.clone(),
            self.usd_per_month.clone(),
            self.usd_per_second.clone(),
            self.tier_slug.clone(),
            path.join(" "),
        ]
    }
}

impl Displayable for AppProposeResponse {
    fn titles() -> Vec<&'static str> {
        vec![
            "App Name Available?",
            "Suggested App Name",
            "Is Static?",
            "Static App Usage",
            "$/month",
            "$/month on higher tier",
            "$/month on lower tier",
        ]
    }

    fn row(&self) -> Vec<String> {
        let fmt_cost = |c: f64| {
            if c == 0.0 {
                "n/a".to_string()
            } else {
                format!("{:.2}", c)
            }
        };
        vec![
            if self.app_name_available { "yes" } else { "no" }.to_string(),
            self.app_name_suggestion.clone(),
            if self.app_is_static { "yes" } else { "no" }.to_string(),
            format!(
                "{} of {} free",
                self.existing_static_apps, self.max_free_static_apps
            ),
            format!("{:.2}", self.app_cost),
            fmt_cost(self.app_tier_upgrade_cost),
            fmt_cost(self.app_tier_downgrade_cost),
        ]
    }
}

impl Displayable for FirewallRule {
    fn titles() -> Vec<&'static str> {
        vec!["UUID", "ClusterUUID", "Type", "Value", "Created At"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.uuid.clone(),
            self.cluster_uuid.clone(),
            self.rule_type.clone(),
            self.value.clone(),
            time(&self.created_at),
        ]
    }
}
