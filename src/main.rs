mod cli;
mod ui;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use leadflow::config::LeadflowConfig;
use leadflow::notify::{ConfiguredNotifier, LogNotifier, WebhookNotifier};
use leadflow::response::Envelope;
use leadflow::store::MemoryStore;
use leadflow::{CallQueueCoordinator, LifecycleOrchestrator, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        LeadflowConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    logging::init(&config.logging);

    let store = MemoryStore::open(&config.store.data_file)
        .await
        .with_context(|| {
            format!(
                "failed to open data file {}",
                config.store.data_file.display()
            )
        })?;

    let notifier = match config.notifications.active_webhook() {
        Some(url) => ConfiguredNotifier::Webhook(
            WebhookNotifier::from_config(url, &config.notifications)
                .context("failed to build webhook client")?,
        ),
        None => ConfiguredNotifier::Log(LogNotifier),
    };

    let progress = ui::CommandProgress::start(&cli.command.describe());
    let envelope = dispatch(cli.command, store, notifier).await;
    progress.finish(&envelope);

    if !envelope.success {
        std::process::exit(1);
    }
    Ok(())
}

async fn dispatch(command: Command, store: MemoryStore, notifier: ConfiguredNotifier) -> Envelope {
    let queue = CallQueueCoordinator::new(store.clone());
    let orchestrator = LifecycleOrchestrator::new(store, notifier);

    match command {
        Command::Intake(args) => orchestrator.handle_intake(args.into()).await,
        Command::Update(args) => orchestrator.handle_update(&args.lead_id, &args.request()).await,
        Command::Next { agent_id } => queue.handle_next_lead(&agent_id).await,
        Command::Call {
            lead_id,
            outcome,
            notes,
        } => queue.handle_record_call(&lead_id, &outcome, notes).await,
        Command::Queue {
            agent_id,
            ranked: false,
        } => queue.handle_queue_status(&agent_id).await,
        Command::Queue {
            agent_id,
            ranked: true,
        } => Envelope::from_result(queue.ranked(&agent_id).await, |leads| {
            format!("{} open leads", leads.len())
        }),
        Command::Show { lead_id } => orchestrator.handle_show(&lead_id).await,
        Command::Metrics { agent, days } => {
            orchestrator
                .handle_performance(agent.as_deref(), days)
                .await
        }
    }
}
