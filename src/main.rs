use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;

use spark_projects::config::Config;
use spark_projects::projects::{ProjectRecord, ProjectService, ServiceSettings};
use spark_projects::store::FirestoreClient;
use spark_projects::{logging, render};

#[derive(Parser, Debug)]
#[command(name = "spark-projects")]
#[command(about = "Browse the Spark project catalog, cached from Firestore")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/spark-projects/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Firestore collection to read
  #[arg(long, global = true)]
  collection: Option<String>,

  /// Log level, e.g. "debug" (RUST_LOG takes precedence)
  #[arg(long, global = true)]
  log_level: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List the project catalog
  List {
    /// Ignore the cache and fetch again
    #[arg(short, long)]
    refresh: bool,
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
  },
  /// Show one project in detail
  Show { id: String },
  /// Print cache diagnostics
  Info {
    /// Load the catalog before reporting
    #[arg(long)]
    fetch: bool,
  },
  /// Print the built-in fallback catalog
  Fallback {
    #[arg(long)]
    json: bool,
  },
  /// Print catalog updates as they happen, until Ctrl-C
  Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  let level = args
    .log_level
    .clone()
    .unwrap_or_else(|| config.logging.level.clone());
  let _guard = logging::init(&level, config.logging.directory.as_deref())?;

  // Override collection if specified on command line
  let mut settings = ServiceSettings::from(&config.cache);
  if let Some(collection) = args.collection {
    settings.collection = collection;
  }

  let client = FirestoreClient::new(&config.firestore, Config::get_api_key())?;
  let service = ProjectService::with_settings(client, settings);

  match args.command {
    Command::List { refresh, json } => {
      let projects = service.get_projects(refresh).await;
      print_projects(&projects, json)?;
    }
    Command::Show { id } => {
      let projects = service.get_projects(false).await;
      let project = projects
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| eyre!("No project with id {}", id))?;
      print!("{}", render::detail(project));
    }
    Command::Info { fetch } => {
      if fetch {
        service.get_projects(false).await;
      }
      println!("{}", service.cache_info());
    }
    Command::Watch => watch(&service).await?,
    Command::Fallback { json } => print_projects(&service.get_hardcoded_projects(), json)?,
  }

  Ok(())
}

async fn watch(service: &ProjectService<FirestoreClient>) -> Result<()> {
  let subscription = service.subscribe(|projects: &[ProjectRecord]| {
    println!("--- {} projects", projects.len());
    for project in projects {
      println!("{}", render::list_line(project));
    }
  });

  service.start_realtime();
  if !service.is_realtime_active() {
    subscription.unsubscribe();
    return Err(eyre!("Could not start the live update channel"));
  }

  tokio::signal::ctrl_c()
    .await
    .map_err(|e| eyre!("Failed to listen for Ctrl-C: {}", e))?;

  service.stop_realtime();
  subscription.unsubscribe();
  Ok(())
}

fn print_projects(projects: &[ProjectRecord], json: bool) -> Result<()> {
  if json {
    let out = serde_json::to_string_pretty(projects)
      .map_err(|e| eyre!("Failed to serialize projects: {}", e))?;
    println!("{}", out);
  } else {
    for project in projects {
      println!("{}", render::list_line(project));
    }
  }
  Ok(())
}
