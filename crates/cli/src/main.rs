use anyhow::Context;
use clap::{Parser, Subcommand};
use koderstore_core::{
    CoreConfig, FileKind, NamespaceAccess, Principal, PrincipalId, StorageService,
};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

#[derive(Parser)]
#[command(name = "koderstore")]
#[command(about = "Koderstore per-user file storage CLI")]
struct Cli {
    /// Principal id to act as
    #[arg(long = "as", env = "KODERSTORE_PRINCIPAL")]
    principal: String,
    /// Display name used in commit messages (defaults to the principal id)
    #[arg(long)]
    name: Option<String>,
    /// Read another principal's namespace (administrators only)
    #[arg(long, global = true)]
    user: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List one directory level
    Ls {
        /// Directory relative to the namespace root
        dir: Option<String>,
    },
    /// Print a file to stdout
    Cat {
        /// File path relative to the namespace root
        name: String,
    },
    /// Upload a local file
    Put {
        /// Destination path relative to the namespace root
        name: String,
        /// Local file to upload
        file: PathBuf,
        /// Version token the file must still have
        #[arg(long)]
        sha: Option<String>,
    },
    /// Delete a file
    Rm {
        /// File path relative to the namespace root
        name: String,
        /// Version token the file must still have
        #[arg(long)]
        sha: Option<String>,
    },
    /// Show storage usage
    Usage,
    /// List every namespace (administrators only)
    Users,
}

/// Writes always land in the acting principal's namespace, so `--user` is refused for them.
fn reject_foreign_writes(cli: &Cli) -> anyhow::Result<()> {
    if cli.user.is_some() && matches!(cli.command, Commands::Put { .. } | Commands::Rm { .. }) {
        anyhow::bail!("--user only applies to reads; writes always target your own namespace");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    reject_foreign_writes(&cli)?;

    let cfg = CoreConfig::from_lookup(|key| std::env::var(key).ok())
        .context("invalid configuration")?;
    let service = StorageService::from_config(&cfg)?;

    let id = PrincipalId::new(&cli.principal)?;
    let username = cli.name.unwrap_or_else(|| id.to_string());
    let principal = Principal::new(id, username);
    let session = Some(&principal);

    let access = match cli.user {
        Some(user) => NamespaceAccess::admin(PrincipalId::new(user)?),
        None => NamespaceAccess::own(),
    };

    match cli.command {
        Commands::Ls { dir } => {
            let items = service
                .list_namespace(session, &access, dir.as_deref())
                .await?;
            if items.is_empty() {
                println!("No files found.");
            }
            for item in items {
                match item.kind {
                    FileKind::Directory => println!("{}/", item.name),
                    FileKind::File => println!(
                        "{}\t{}\t{}",
                        item.name,
                        item.size_bytes.unwrap_or_default(),
                        item.content_hash
                    ),
                }
            }
        }
        Commands::Cat { name } => {
            let download = service.read_file(session, &access, &name).await?;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&download.bytes).await?;
            stdout.flush().await?;
        }
        Commands::Put { name, file, sha } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("cannot read {}", file.display()))?;
            let receipt = service
                .write_file(session, &name, &bytes, sha.as_deref())
                .await?;
            let verb = if receipt.created { "Uploaded" } else { "Updated" };
            println!("{verb} {} ({})", receipt.path, receipt.content_hash);
        }
        Commands::Rm { name, sha } => {
            service.delete_file(session, &name, sha.as_deref()).await?;
            println!("Deleted {name}");
        }
        Commands::Usage => {
            let usage = service.get_usage(session, &access).await?;
            println!(
                "{:.2} MB of {:.2} MB used ({}%, {})",
                usage.used_megabytes(),
                usage.quota_megabytes(),
                usage.percentage(),
                usage.severity().as_str()
            );
        }
        Commands::Users => {
            let summaries = service.list_all_namespaces(session).await?;
            if summaries.is_empty() {
                println!("No users found.");
            }
            for summary in summaries {
                println!(
                    "ID: {}, Name: {}, Files: {}, Size: {} bytes",
                    summary.id, summary.username, summary.file_count, summary.total_size
                );
            }
        }
    }

    Ok(())
}
