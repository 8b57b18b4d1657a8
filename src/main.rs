use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use redbox_api::{connect, Config, CreateOptions, Oid, PermissionKind, PrincipalDelta};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "redbox-api")]
#[command(author, version, about = "Talk to a ReDBox 1.9 or 2.0 server", long_about = None)]
struct Args {
    /// Configuration file (defaults to <config dir>/redbox-api/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Name of the server entry to use
    #[arg(short, long, env = "REDBOX_API_SERVER")]
    server: String,

    /// Enable JSON formatted logging
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the server's self-description
    Info,
    /// List every record of a package type
    List {
        package_type: String,
        #[arg(long, default_value_t = 0)]
        start: u64,
    },
    /// Create a record from a JSON file
    Create {
        package_type: String,
        file: PathBuf,
        /// Ask for a specific oid
        #[arg(long)]
        oid: Option<String>,
        #[arg(long)]
        skip_reindex: bool,
    },
    /// Fetch a record's metadata
    Get { oid: Oid },
    /// Fetch the metadata about a record
    Metadata { oid: Oid },
    /// Replace the metadata about a record from a JSON file
    UpdateMetadata { oid: Oid, file: PathBuf },
    /// Show a record's permissions
    Permissions { oid: Oid },
    /// Grant view or edit access
    Grant {
        oid: Oid,
        kind: PermissionKind,
        users: Vec<String>,
        /// Users who have not logged in yet
        #[arg(long = "pending")]
        pending: Vec<String>,
    },
    /// Revoke view or edit access
    Revoke {
        oid: Oid,
        kind: PermissionKind,
        users: Vec<String>,
        #[arg(long = "pending")]
        pending: Vec<String>,
    },
    /// Upload a file as a datastream
    WriteDatastream { oid: Oid, dsid: String, file: PathBuf },
    /// Download a datastream to a file, or to stdout
    ReadDatastream {
        oid: Oid,
        dsid: String,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List a record's datastreams
    Datastreams { oid: Oid },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn read_json(path: &PathBuf) -> Result<serde_json::Value> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn delta(users: Vec<String>, pending: Vec<String>) -> Result<PrincipalDelta> {
    let delta = PrincipalDelta::users(users).with_pending(pending);
    if delta.is_empty() {
        bail!("no users given");
    }
    Ok(delta)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_json);

    let config = Config::load(args.config.as_deref())?;
    let server = config.server(&args.server)?;
    let mut backend = connect(server, &config.http)?;
    backend.set_progress(Some(Arc::new(|message: &str| info!("{}", message))));

    match args.command {
        Command::Info => print_json(&backend.info().await?)?,
        Command::List { package_type, start } => {
            let oids = backend.list(&package_type, start).await?;
            info!("{} {} records", oids.len(), package_type);
            print_json(&oids)?;
        }
        Command::Create {
            package_type,
            file,
            oid,
            skip_reindex,
        } => {
            let metadata = read_json(&file).await?;
            let options = CreateOptions { oid, skip_reindex };
            let oid = backend.create_record(&metadata, &package_type, &options).await?;
            println!("{oid}");
        }
        Command::Get { oid } => print_json(&backend.get_record(&oid).await?)?,
        Command::Metadata { oid } => print_json(&backend.get_record_metadata(&oid).await?)?,
        Command::UpdateMetadata { oid, file } => {
            let metadata = read_json(&file).await?;
            print_json(&backend.update_record_metadata(&oid, &metadata).await?)?;
        }
        Command::Permissions { oid } => print_json(&backend.get_permissions(&oid).await?)?,
        Command::Grant {
            oid,
            kind,
            users,
            pending,
        } => {
            let delta = delta(users, pending)?;
            print_json(&backend.grant_permission(&oid, kind, &delta).await?)?;
        }
        Command::Revoke {
            oid,
            kind,
            users,
            pending,
        } => {
            let delta = delta(users, pending)?;
            print_json(&backend.remove_permission(&oid, kind, &delta).await?)?;
        }
        Command::WriteDatastream { oid, dsid, file } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            print_json(&backend.write_datastream(&oid, &dsid, data).await?)?;
        }
        Command::ReadDatastream { oid, dsid, out } => {
            let datastream = backend.read_datastream(&oid, &dsid).await?;
            let mut reader = datastream.into_async_read();
            let written = match out {
                Some(path) => {
                    let mut file = tokio::fs::File::create(&path)
                        .await
                        .with_context(|| format!("creating {}", path.display()))?;
                    tokio::io::copy(&mut reader, &mut file).await?
                }
                None => tokio::io::copy(&mut reader, &mut tokio::io::stdout()).await?,
            };
            info!("Read {} bytes of {}/{}", written, oid, dsid);
        }
        Command::Datastreams { oid } => print_json(&backend.list_datastreams(&oid).await?)?,
    }

    Ok(())
}
