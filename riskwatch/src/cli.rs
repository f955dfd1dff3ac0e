// riskwatch/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use riskwatch_core::domain::alert::AlertStatus;
use riskwatch_core::domain::monitoring::Level;
use riskwatch_core::domain::prediction::Priority;

#[derive(Parser)]
#[command(name = "riskwatch")]
#[command(about = "Rolling z-score risk monitoring and alerting for support tickets", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Project directory (holds riskwatch.yaml)
    #[arg(long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🏗️  Creates the fact and alert tables
    Init,

    /// 📥 Loads tickets and/or events from CSV files
    Import {
        /// CSV with id,created_at,customer_id,content,queue,ticket_type,tags
        #[arg(long)]
        tickets: Option<PathBuf>,

        /// CSV with ts,event_type,customer_id,service,value
        #[arg(long)]
        events: Option<PathBuf>,
    },

    /// 🚨 Runs one monitoring pass and materializes alerts
    Run {
        /// Reference time (defaults to now, UTC)
        #[arg(long, value_parser = parse_timestamp)]
        now: Option<NaiveDateTime>,

        /// Also record alerts for past buckets of the range
        #[arg(long)]
        backfill: bool,
    },

    /// 📋 Lists and manages alerts
    Alerts {
        #[command(subcommand)]
        action: AlertAction,
    },

    /// 🎯 Applies the prediction policy and records the result
    Predict {
        #[arg(long)]
        ticket_id: i64,

        #[arg(long)]
        category: String,

        /// Classifier argmax priority (low | medium | high)
        #[arg(long)]
        priority: Priority,

        /// Classifier probability of 'high'
        #[arg(long)]
        prob_high: Option<f64>,

        /// Extra JSON stored with the prediction
        #[arg(long)]
        meta: Option<String>,
    },

    /// 📈 Prints one metric series with its rolling statistics
    Series {
        #[arg(long)]
        metric: String,

        /// global | queue:<name> | tag:<name> | customer:<id>
        #[arg(long, default_value = "global")]
        level: Level,

        #[arg(long, value_parser = parse_timestamp)]
        now: Option<NaiveDateTime>,
    },
}

#[derive(Subcommand)]
pub enum AlertAction {
    List {
        #[arg(long)]
        status: Option<AlertStatus>,

        #[arg(long = "type")]
        alert_type: Option<String>,

        #[arg(long)]
        level: Option<Level>,

        #[arg(long)]
        metric: Option<String>,

        /// Detection bucket lower bound (inclusive)
        #[arg(long, value_parser = parse_timestamp)]
        since: Option<NaiveDateTime>,

        /// Detection bucket upper bound (exclusive)
        #[arg(long, value_parser = parse_timestamp)]
        until: Option<NaiveDateTime>,

        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Acknowledge an open alert
    Ack { id: i64 },
    /// Close an open or acknowledged alert
    Close { id: i64 },
}

/// Accepts `2024-01-15T12:00:00`, `2024-01-15 12:00:00` or a bare date (midnight).
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("invalid timestamp '{}' (expected YYYY-MM-DD[THH:MM:SS])", raw))
}
