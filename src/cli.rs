use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;

use crate::api_client::ApiClient;
use crate::commands::{
    app_command::{
        create, delete, deployment, get, list, logs, propose, regions, spec, tier, update,
    },
    database_command::firewalls,
};
use crate::config::ClientConfig;
use crate::display::{OutputFormat, Printer};
use crate::models::LogType;
use crate::watcher::WaitPolicy;

const SPEC_HELP: &str = "Path to an app spec in JSON or YAML format. Set to \"-\" to read from stdin.";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// API access token
    #[arg(short = 't', long, global = true, env = "APPCTL_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Override the default API endpoint
    #[arg(short = 'u', long, global = true, env = "APPCTL_API_URL")]
    api_url: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display commands for working with apps
    #[command(subcommand, visible_aliases = ["app", "a"])]
    Apps(AppsCommands),

    /// Display commands that manage databases
    #[command(subcommand, visible_aliases = ["database", "db", "d"])]
    Databases(DatabasesCommands),
}

#[derive(Subcommand)]
enum AppsCommands {
    /// Create an app with the given app spec
    #[command(visible_alias = "c")]
    Create {
        #[arg(long, help = SPEC_HELP)]
        spec: String,
    },

    /// Get an app
    #[command(visible_alias = "g")]
    Get {
        /// The app ID
        app_id: String,
    },

    /// List all apps
    #[command(visible_alias = "ls")]
    List,

    /// Update an app with the given app spec
    #[command(visible_alias = "u")]
    Update {
        /// The app ID
        app_id: String,

        #[arg(long, help = SPEC_HELP)]
        spec: String,
    },

    /// Delete an app and all of its deployments
    #[command(visible_alias = "d")]
    Delete {
        /// The app ID
        app_id: String,

        /// Delete the app without a confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Create a deployment, pulling the latest changes from the app's source
    #[command(visible_alias = "cd")]
    CreateDeployment {
        /// The app ID
        app_id: String,

        /// Force a re-build even if a previous build is eligible for reuse
        #[arg(long)]
        force_rebuild: bool,

        /// Wait for the deployment to complete before returning
        #[arg(long)]
        wait: bool,
    },

    /// Get a deployment
    #[command(visible_alias = "gd")]
    GetDeployment {
        /// The app ID
        app_id: String,

        /// The deployment ID
        deployment_id: String,
    },

    /// List all deployments of an app
    #[command(visible_alias = "lsd")]
    ListDeployments {
        /// The app ID
        app_id: String,
    },

    /// Get component logs for a deployment of an app
    #[command(visible_alias = "l")]
    Logs {
        /// The app ID
        app_id: String,

        /// Component name (defaults to all components)
        component: Option<String>,

        /// The deployment ID. Defaults to the current deployment
        #[arg(long)]
        deployment: Option<String>,

        /// The type of logs
        #[arg(long = "type", value_enum, default_value_t = LogType::Run)]
        log_type: LogType,

        /// Follow logs as they are emitted
        #[arg(short, long)]
        follow: bool,
    },

    /// List App Platform regions
    ListRegions,

    /// Review and validate an app spec for a new or existing app
    Propose {
        #[arg(long, help = SPEC_HELP)]
        spec: String,

        /// An existing app ID; the spec is treated as a proposed update to it
        #[arg(long)]
        app: Option<String>,
    },

    /// Display commands for working with app specs
    #[command(subcommand)]
    Spec(SpecCommands),

    /// Display commands for working with app tiers
    #[command(subcommand)]
    Tier(TierCommands),
}

#[derive(Subcommand)]
enum SpecCommands {
    /// Retrieve an app's spec
    Get {
        /// The app ID
        app_id: String,

        /// Get the spec of this deployment instead of the app's latest
        #[arg(long)]
        deployment: Option<String>,

        /// The format to output the spec in; either "yaml" or "json"
        #[arg(long, default_value = "yaml")]
        format: String,
    },

    /// Check whether an app spec is valid
    Validate {
        /// Path to the spec file, or "-" to read from stdin
        spec_file: String,

        /// Only validate the spec schema and not the correctness of the spec
        #[arg(long)]
        schema_only: bool,
    },
}

#[derive(Subcommand)]
enum TierCommands {
    /// List all app tiers
    List,

    /// Retrieve an app tier
    Get {
        /// The tier slug
        slug: String,
    },

    /// Display commands for working with app instance sizes
    #[command(subcommand)]
    InstanceSize(InstanceSizeCommands),
}

#[derive(Subcommand)]
enum InstanceSizeCommands {
    /// List all app instance sizes
    List,

    /// Retrieve an app instance size
    Get {
        /// The instance size slug
        slug: String,
    },
}

#[derive(Subcommand)]
enum DatabasesCommands {
    /// Display commands for managing database firewall rules
    #[command(subcommand, visible_alias = "fw")]
    Firewalls(FirewallsCommands),
}

#[derive(Subcommand)]
enum FirewallsCommands {
    /// List the firewall rules of a database cluster
    List {
        /// The database cluster ID
        database_id: String,
    },

    /// Replace the firewall rules of a database cluster
    Update {
        /// The database cluster ID
        database_id: String,

        /// Rules as <type>:<value>, e.g. ip_addr:192.168.1.1
        #[arg(long, required = true, value_delimiter = ',')]
        rules: Vec<String>,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = ClientConfig::load()
        .context("Failed to load client configuration")?
        .with_overrides(cli.api_url, cli.access_token);
    let client = ApiClient::new(config);
    let mut printer = Printer::stdout(cli.output);

    match cli.command {
        Commands::Apps(cmd) => run_apps(&client, &mut printer, cmd).await,
        Commands::Databases(DatabasesCommands::Firewalls(cmd)) => match cmd {
            FirewallsCommands::List { database_id } => {
                firewalls::list(&client, &mut printer, &database_id).await
            }
            FirewallsCommands::Update { database_id, rules } => {
                firewalls::update(&client, &mut printer, &database_id, &rules).await
            }
        },
    }
}

async fn run_apps<W: Write>(
    client: &ApiClient,
    printer: &mut Printer<W>,
    cmd: AppsCommands,
) -> Result<()> {
    match cmd {
        AppsCommands::Create { spec } => create::execute(client, printer, &spec).await,
        AppsCommands::Get { app_id } => get::execute(client, printer, &app_id).await,
        AppsCommands::List => list::execute(client, printer).await,
        AppsCommands::Update { app_id, spec } => {
            update::execute(client, printer, &app_id, &spec).await
        }
        AppsCommands::Delete { app_id, force } => delete::execute(client, &app_id, force).await,
        AppsCommands::CreateDeployment {
            app_id,
            force_rebuild,
            wait,
        } => {
            deployment::create(
                client,
                printer,
                &app_id,
                force_rebuild,
                wait,
                WaitPolicy::default(),
            )
            .await
        }
        AppsCommands::GetDeployment {
            app_id,
            deployment_id,
        } => deployment::get(client, printer, &app_id, &deployment_id).await,
        AppsCommands::ListDeployments { app_id } => {
            deployment::list(client, printer, &app_id).await
        }
        AppsCommands::Logs {
            app_id,
            component,
            deployment,
            log_type,
            follow,
        } => {
            logs::execute(
                client,
                printer,
                &app_id,
                component.as_deref(),
                deployment.as_deref(),
                log_type,
                follow,
            )
            .await
        }
        AppsCommands::ListRegions => regions::execute(client, printer).await,
        AppsCommands::Propose { spec, app } => {
            propose::execute(client, printer, &spec, app.as_deref()).await
        }
        AppsCommands::Spec(SpecCommands::Get {
            app_id,
            deployment,
            format,
        }) => spec::get(client, printer, &app_id, deployment.as_deref(), &format).await,
        AppsCommands::Spec(SpecCommands::Validate {
            spec_file,
            schema_only,
        }) => spec::validate(client, printer, &spec_file, schema_only).await,
        AppsCommands::Tier(TierCommands::List) => tier::list(client, printer).await,
        AppsCommands::Tier(TierCommands::Get { slug }) => tier::get(client, printer, &slug).await,
        AppsCommands::Tier(TierCommands::InstanceSize(InstanceSizeCommands::List)) => {
            tier::list_instance_sizes(client, printer).await
        }
        AppsCommands::Tier(TierCommands::InstanceSize(InstanceSizeCommands::Get { slug })) => {
            tier::get_instance_size(client, printer, &slug).await
        }
    }
}
