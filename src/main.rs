mod engine;

use clap::{Parser, Subcommand};
use nudge_channels::gmail::GmailClient;
use nudge_channels::slack::SlackClient;
use nudge_core::{
    config,
    traits::{ChatClient, MailClient},
};
use nudge_memory::Store;
use std::collections::HashMap;

#[derive(Parser)]
#[command(
    name = "nudge",
    version,
    about = "Nudge — actionable-message triage and followup engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List the chat channels the bot can see.
    Channels,
    /// Fetch recent messages from a channel and triage them.
    Analyze {
        /// Channel id to analyze.
        channel: String,
        /// How many messages to fetch.
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// List recent inbox email (read-only).
    Inbox {
        /// Maximum number of messages.
        #[arg(short, long, default_value_t = 10)]
        max: u32,
        /// Provider search query (e.g. "is:unread").
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Send the drafted nudge for a processed record.
    Nudge {
        /// Processed record id (from `analyze` output).
        processed_id: String,
    },
    /// Manage scheduled followups.
    Followups {
        #[command(subcommand)]
        command: FollowupCommands,
    },
    /// Manage the tracker integration.
    Integration {
        #[command(subcommand)]
        command: IntegrationCommands,
    },
}

#[derive(Subcommand)]
enum FollowupCommands {
    /// List followups that are due now.
    List,
    /// Send the secondary reminder for a due followup.
    Remind { id: String },
    /// Mark a followup resolved (and complete its tracker issue).
    Resolve { id: String },
}

#[derive(Subcommand)]
enum IntegrationCommands {
    /// Configure a tracker integration ("linear", "jira", "asana", "webhook").
    Set {
        provider: String,
        /// API token (empty for webhook).
        #[arg(short, long, default_value = "")]
        token: String,
        /// Provider-specific settings as key=value pairs
        /// (e.g. team_id=..., domain=..., project_key=...).
        #[arg(trailing_var_arg = true)]
        config: Vec<String>,
    },
    /// Verify the configured integration's credentials.
    Test,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = config::load(&cli.config)?;
    let store = Store::new(&cfg.memory).await?;

    match cli.command {
        Commands::Channels => {
            let slack = SlackClient::from_config(&cfg.slack);
            let channels = slack.list_channels().await?;
            if channels.is_empty() {
                println!("No channels visible to the bot.");
            }
            for ch in channels {
                let kind = if ch.is_private { "private" } else { "public" };
                println!(
                    "{}  {}  ({kind}, {} members)",
                    ch.id, ch.name, ch.member_count
                );
            }
        }
        Commands::Analyze { channel, limit } => {
            let engine = engine::Engine::from_config(&cfg, store).await?;
            let slack = SlackClient::from_config(&cfg.slack);
            let limit = limit.unwrap_or(cfg.engine.fetch_limit);

            let messages = slack.fetch_messages(&channel, limit).await?;
            if messages.is_empty() {
                println!("No messages in {channel}.");
                return Ok(());
            }

            let outcome = engine.analyze(&channel, messages).await?;
            println!(
                "{} new unit(s), {} actionable. Current actionable set:",
                outcome.new_count, outcome.actionable_count
            );
            for r in &outcome.results {
                let task = r.task_summary.as_deref().unwrap_or("(no summary)");
                let sent = if r.nudge_sent { " [nudged]" } else { "" };
                println!("  [{}] {}  {task}{sent}", r.urgency, r.id);
                if let Some(url) = r.external_task_url.as_deref() {
                    println!("        tracker: {url}");
                }
            }
        }
        Commands::Inbox { max, query } => {
            let gmail = GmailClient::from_config(&cfg.gmail);
            let messages = gmail.list_messages(max, query.as_deref()).await?;
            if messages.is_empty() {
                println!("Inbox is empty.");
            }
            for m in messages {
                println!("{}  {}  {}", m.date, m.from, m.subject);
            }
        }
        Commands::Nudge { processed_id } => {
            let engine = engine::Engine::from_config(&cfg, store).await?;
            engine.send_nudge(&processed_id).await?;
            println!("Nudge sent; followup scheduled.");
        }
        Commands::Followups { command } => {
            let engine = engine::Engine::from_config(&cfg, store).await?;
            match command {
                FollowupCommands::List => {
                    let due = engine.due_followups().await?;
                    if due.is_empty() {
                        println!("Nothing due.");
                    }
                    for f in due {
                        let assignee = f.assignee.as_deref().unwrap_or("unassigned");
                        println!(
                            "{}  [{}] {}  ({assignee}, due {})",
                            f.id,
                            f.urgency(),
                            f.task_summary,
                            f.followup_at
                        );
                    }
                }
                FollowupCommands::Remind { id } => {
                    let outcome = engine.send_reminder(&id).await?;
                    println!("Reminder: {}", outcome.reminder_text);
                    if let Some(err) = outcome.delivery_error {
                        println!("Delivery failed (followup still marked sent): {err}");
                    }
                }
                FollowupCommands::Resolve { id } => {
                    engine.resolve_followup(&id).await?;
                    println!("Followup resolved.");
                }
            }
        }
        Commands::Integration { command } => match command {
            IntegrationCommands::Set {
                provider,
                token,
                config,
            } => {
                if cfg.engine.owner_user_id.is_empty() {
                    anyhow::bail!("set engine.owner_user_id in config.toml first");
                }
                let mut settings = HashMap::new();
                for pair in &config {
                    let Some((key, value)) = pair.split_once('=') else {
                        anyhow::bail!("expected key=value, got: {pair}");
                    };
                    settings.insert(key.to_string(), value.to_string());
                }
                // Validate before persisting.
                nudge_trackers::from_integration(&provider, &settings, &token)?;
                store
                    .upsert_integration(&cfg.engine.owner_user_id, &provider, &settings, &token)
                    .await?;
                println!("Integration '{provider}' saved.");
            }
            IntegrationCommands::Test => {
                if cfg.engine.owner_user_id.is_empty() {
                    anyhow::bail!("set engine.owner_user_id in config.toml first");
                }
                let Some(integration) = store.get_integration(&cfg.engine.owner_user_id).await?
                else {
                    anyhow::bail!("no integration configured. Run `nudge integration set` first.");
                };
                let tracker = nudge_trackers::from_integration(
                    &integration.provider,
                    &integration.config_map(),
                    &integration.api_token,
                )?;
                let who = tracker.test_connection().await?;
                println!("{}: {who}", tracker.name());
            }
        },
    }

    Ok(())
}
