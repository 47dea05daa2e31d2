use anyhow::Result;
use clap::Parser;
use mclone::cli::{
    Args, Commands, ConfigDiscovery, McloneConfig, TaskCommand, VolumeCommand, render_info,
};
use mclone::executor::{HostExecutor, Rclone};
use mclone::mounts;
use mclone::session::Session;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args).await {
        eprintln!("ERROR: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "mclone=info" } else { "mclone=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<()> {
    let options = args.session_options();
    let command = args.command.unwrap_or(Commands::Info);
    if let Commands::ShowConfig = command {
        ConfigDiscovery::show_discovery_info();
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration override from: {:?}", path);
            McloneConfig::from_toml_file(path)?
        }
        None => ConfigDiscovery::discover_config()?,
    }
    .apply_env();
    debug!("Using configuration: {:?}", config);

    let rclone = Rclone::new(config.rclone.clone(), Arc::new(HostExecutor::new()));
    let mut session = Session::new(rclone, options);
    session.restore_volumes(mounts::candidate_dirs(&config))?;
    info!(
        "Loaded {} volume(s) with {} task(s)",
        session.volumes().len(),
        session.tasks().len()
    );

    match command {
        Commands::Info | Commands::ShowConfig => print!("{}", render_info(&session)),
        Commands::Volume(VolumeCommand::New { directory }) => {
            session.format_volume(&directory)?;
        }
        Commands::Volume(VolumeCommand::Delete { volume }) => {
            session.delete_volume(&volume)?;
            session.commit().await?;
        }
        Commands::Task(TaskCommand::New(new)) => {
            let task_options = new.options()?;
            session.create_task(&new.source, &new.destination, task_options)?;
            session.commit().await?;
        }
        Commands::Task(TaskCommand::Modify { settings, task }) => {
            session.modify_task(&task, settings.changes()?)?;
            session.commit().await?;
        }
        Commands::Task(TaskCommand::Delete { task }) => {
            session.delete_task(&task)?;
            session.commit().await?;
        }
        Commands::Task(TaskCommand::Process { tasks }) => {
            // tokens derived while processing must reach their holder manifests
            let processed = session.process_tasks(&tasks).await;
            session.commit().await?;
            processed?;
        }
    }
    Ok(())
}
