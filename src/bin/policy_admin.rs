//! Policy Administration CLI Tool
//!
//! Inspect and edit stored branch policies without going through the HTTP API

use clap::{Parser, Subcommand};
use pr_policy_gate::database::Database;
use pr_policy_gate::host::ConfigStore;
use pr_policy_gate::policy::PolicyConfig;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "policy-admin")]
#[command(about = "Branch and pull request policy administration tool")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database URL
    #[arg(long, default_value = "sqlite://policy-gate.db")]
    database_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List every stored policy record
    List,

    /// Show the effective policy of a project or repository
    Show {
        /// Project key
        #[arg(short, long)]
        project: String,

        /// Repository slug (omit for the project policy)
        #[arg(short, long)]
        repo: Option<String>,
    },

    /// Store a policy read from a YAML or JSON file
    Set {
        /// Project key
        #[arg(short, long)]
        project: String,

        /// Repository slug (omit for the project policy)
        #[arg(short, long)]
        repo: Option<String>,

        /// Policy file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Check a policy file without storing it
    Validate {
        /// Policy file
        file: PathBuf,
    },
}

fn read_policy(path: &Path) -> Result<PolicyConfig, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    // YAML is a superset of JSON, so one parser covers both formats.
    let config: PolicyConfig = serde_yaml::from_str(&contents)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
    Ok(config.normalized())
}

async fn open(database_url: &str) -> Result<Database, Box<dyn std::error::Error>> {
    let database = Database::new(database_url).await?;
    database.run_migrations().await?;
    Ok(database)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::List => {
            let database = open(&cli.database_url).await?;
            let records = database.list_configs().await?;
            if records.is_empty() {
                println!("No policies stored");
            }
            for record in records {
                println!(
                    "{}/{}  (updated {})",
                    record.project_key,
                    record.repo_slug.as_deref().unwrap_or("*"),
                    record.updated_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        Commands::Show { project, repo } => {
            let database = open(&cli.database_url).await?;
            let config = match repo {
                Some(repo) => database.config_for_repo(&project, &repo).await?,
                None => database.config_for_project(&project).await?,
            };
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Set {
            project,
            repo,
            file,
        } => {
            let config = read_policy(&file)?;
            let database = open(&cli.database_url).await?;
            match &repo {
                Some(repo) => database.set_config_for_repo(&project, repo, &config).await?,
                None => database.set_config_for_project(&project, &config).await?,
            }
            println!(
                "✅ Stored policy for {}/{}",
                project,
                repo.as_deref().unwrap_or("*")
            );
        }
        Commands::Validate { file } => {
            let config = read_policy(&file)?;
            config.validate()?;
            println!("✅ {} is a valid policy", file.display());
        }
    }

    Ok(())
}
