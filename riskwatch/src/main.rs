// riskwatch/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{AlertAction, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG=debug riskwatch run ... to see per-partition details
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let project_dir = cli.project_dir;

    match cli.command {
        Commands::Init => commands::init::execute(&project_dir)?,
        Commands::Import { tickets, events } => {
            commands::import::execute(&project_dir, tickets, events)?
        }
        Commands::Run { now, backfill } => {
            commands::run::execute(&project_dir, now, backfill).await?
        }
        Commands::Alerts { action } => match action {
            AlertAction::List {
                status,
                alert_type,
                level,
                metric,
                since,
                until,
                limit,
            } => {
                let filter = riskwatch_core::domain::alert::AlertFilter {
                    status,
                    alert_type,
                    level,
                    metric,
                    since,
                    until,
                    limit: Some(limit),
                };
                commands::alerts::list(&project_dir, filter).await?
            }
            AlertAction::Ack { id } => commands::alerts::acknowledge(&project_dir, id).await?,
            AlertAction::Close { id } => commands::alerts::close(&project_dir, id).await?,
        },
        Commands::Predict {
            ticket_id,
            category,
            priority,
            prob_high,
            meta,
        } => {
            commands::predict::execute(&project_dir, ticket_id, category, priority, prob_high, meta)
                .await?
        }
        Commands::Series { metric, level, now } => {
            commands::series::execute(&project_dir, &metric, level, now).await?
        }
    }

    Ok(())
}
