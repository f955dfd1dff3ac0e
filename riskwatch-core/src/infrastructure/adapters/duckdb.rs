// riskwatch-core/src/infrastructure/adapters/duckdb.rs

use async_trait::async_trait;
use chrono::NaiveDateTime;
use duckdb::{Config, Connection, params, params_from_iter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

// Imports Hexagonaux
use crate::domain::alert::{Alert, AlertFilter, AlertKey, AlertStatus, InsertOutcome, NewAlert};
use crate::domain::error::DomainError;
use crate::domain::facts::{NewEvent, NewFeedback, NewTicket};
use crate::domain::monitoring::{
    BucketRange, Dimension, Level, MetricSource, SeriesKey, SeriesPoint, Severity,
};
use crate::domain::prediction::NewPrediction;
use crate::error::RiskwatchError;
use crate::infrastructure::adapters::schema::SCHEMA;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::store::{AlertStore, FactSource, PredictionSink};

/// Text form used for every timestamp crossing the SQL boundary.
const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ALERT_COLUMNS: &str = "id, strftime(ts, '%Y-%m-%d %H:%M:%S'), alert_type, level, metric, \
     value, zscore, window_size, severity, status, tracks_latest, details, \
     strftime(created_at, '%Y-%m-%d %H:%M:%S'), strftime(updated_at, '%Y-%m-%d %H:%M:%S')";

pub struct DuckDBStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDBStore {
    pub fn new(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();

        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens the database and makes sure every table exists.
    pub fn open(db_path: &str) -> Result<Self, InfrastructureError> {
        let store = Self::new(db_path)?;
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, InfrastructureError> {
        self.conn
            .lock()
            .map_err(|_| InfrastructureError::Io(std::io::Error::other("DuckDB Mutex Poisoned")))
    }

    pub fn init_schema(&self) -> Result<(), InfrastructureError> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA)?;
        debug!("Schema ready");
        Ok(())
    }

    // --- FACT INTAKE ---

    pub fn insert_ticket(&self, ticket: &NewTicket) -> Result<(), InfrastructureError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO tickets (id, created_at, customer_id, content, queue, ticket_type, status)
             VALUES (?, CAST(? AS TIMESTAMP), ?, ?, ?, ?, ?)",
            params![
                ticket.id,
                ts_param(ticket.created_at),
                ticket.customer_id,
                ticket.content,
                ticket.queue,
                ticket.ticket_type,
                ticket.status.as_str(),
            ],
        )?;
        for tag in &ticket.tags {
            tx.execute(
                "INSERT OR IGNORE INTO ticket_tags (ticket_id, tag) VALUES (?, ?)",
                params![ticket.id, tag],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_event(&self, event: &NewEvent) -> Result<i64, InfrastructureError> {
        let conn = self.lock()?;
        let id: i64 = conn.query_row("SELECT nextval('seq_event_id')", [], |row| row.get(0))?;
        conn.execute(
            "INSERT INTO events (id, ts, event_type, customer_id, service, value)
             VALUES (?, CAST(? AS TIMESTAMP), ?, ?, ?, ?)",
            params![
                id,
                ts_param(event.ts),
                event.event_type,
                event.customer_id,
                event.service,
                event.value,
            ],
        )?;
        Ok(id)
    }

    pub fn insert_feedback(
        &self,
        feedback: &NewFeedback,
        at: NaiveDateTime,
    ) -> Result<i64, InfrastructureError> {
        let conn = self.lock()?;
        let id: i64 = conn.query_row("SELECT nextval('seq_feedback_id')", [], |row| row.get(0))?;
        conn.execute(
            "INSERT INTO feedback (id, ticket_id, created_at, category, priority, note)
             VALUES (?, ?, CAST(? AS TIMESTAMP), ?, ?, ?)",
            params![
                id,
                feedback.ticket_id,
                ts_param(at),
                feedback.category,
                feedback.priority.as_ref().map(|p| p.as_str()),
                feedback.note,
            ],
        )?;
        Ok(id)
    }

    /// Loads `id,created_at,customer_id,content,queue,ticket_type,tags` rows.
    ///
    /// `tags` is `;`-separated. Tickets already present are skipped. Returns the rows inserted.
    pub fn import_tickets_csv(&self, path: &Path) -> Result<usize, InfrastructureError> {
        let source = csv_source(path);
        let conn = self.lock()?;
        let inserted = conn.execute(
            &format!(
                "INSERT OR IGNORE INTO tickets (id, created_at, customer_id, content, queue, ticket_type)
                 SELECT CAST(id AS BIGINT), CAST(created_at AS TIMESTAMP), CAST(customer_id AS VARCHAR),
                        coalesce(CAST(content AS VARCHAR), ''), CAST(queue AS VARCHAR), CAST(ticket_type AS VARCHAR)
                 FROM {}",
                source
            ),
            [],
        )?;
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO ticket_tags (ticket_id, tag)
                 SELECT DISTINCT ticket_id, trim(tag) FROM (
                     SELECT CAST(id AS BIGINT) AS ticket_id,
                            unnest(string_split(CAST(tags AS VARCHAR), ';')) AS tag
                     FROM {}
                 ) WHERE trim(tag) <> ''",
                source
            ),
            [],
        )?;
        info!(path = ?path, inserted, "Imported tickets");
        Ok(inserted)
    }

    /// Loads `ts,event_type,customer_id,service,value` rows.
    pub fn import_events_csv(&self, path: &Path) -> Result<usize, InfrastructureError> {
        let source = csv_source(path);
        let conn = self.lock()?;
        let inserted = conn.execute(
            &format!(
                "INSERT INTO events (ts, event_type, customer_id, service, value)
                 SELECT CAST(ts AS TIMESTAMP), CAST(event_type AS VARCHAR), CAST(customer_id AS VARCHAR),
                        CAST(service AS VARCHAR), coalesce(CAST(value AS DOUBLE), 1.0)
                 FROM {}",
                source
            ),
            [],
        )?;
        info!(path = ?path, inserted, "Imported events");
        Ok(inserted)
    }

    fn query_alerts(
        conn: &Connection,
        clause: &str,
        args: &[String],
    ) -> Result<Vec<Alert>, RiskwatchError> {
        let sql = format!("SELECT {} FROM alerts {}", ALERT_COLUMNS, clause);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
            Ok(AlertRow {
                id: row.get(0)?,
                ts: row.get(1)?,
                alert_type: row.get(2)?,
                level: row.get(3)?,
                metric: row.get(4)?,
                value: row.get(5)?,
                zscore: row.get(6)?,
                window_size: row.get(7)?,
                severity: row.get(8)?,
                status: row.get(9)?,
                tracks_latest: row.get(10)?,
                details: row.get(11)?,
                created_at: row.get(12)?,
                updated_at: row.get(13)?,
            })
        })?;

        let mut alerts = Vec::new();
        for row in rows {
            alerts.push(row?.into_alert()?);
        }
        Ok(alerts)
    }
}

// --- HELPERS ---

fn ts_param(ts: NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

fn parse_ts(raw: &str) -> Result<NaiveDateTime, RiskwatchError> {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT)
        .map_err(|e| RiskwatchError::InternalError(format!("Bad timestamp '{}': {}", raw, e)))
}

fn csv_source(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\'', "''");
    format!("read_csv_auto('{}', header = true)", escaped)
}

struct AlertRow {
    id: i64,
    ts: String,
    alert_type: String,
    level: String,
    metric: String,
    value: f64,
    zscore: f64,
    window_size: i64,
    severity: String,
    status: String,
    tracks_latest: bool,
    details: String,
    created_at: String,
    updated_at: String,
}

impl AlertRow {
    fn into_alert(self) -> Result<Alert, RiskwatchError> {
        let level: Level = self.level.parse()?;
        let severity: Severity = self.severity.parse().map_err(RiskwatchError::InternalError)?;
        let status: AlertStatus = self.status.parse().map_err(RiskwatchError::InternalError)?;
        let details = serde_json::from_str(&self.details).map_err(InfrastructureError::from)?;
        Ok(Alert {
            id: self.id,
            key: AlertKey {
                alert_type: self.alert_type,
                level,
                metric: self.metric,
                bucket: parse_ts(&self.ts)?,
            },
            value: self.value,
            zscore: self.zscore,
            window_size: usize::try_from(self.window_size).unwrap_or_default(),
            severity,
            status,
            tracks_latest: self.tracks_latest,
            details,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

/// SQL returning `(bucket_text, value)` rows for one metric/level, plus its bound arguments.
fn bucket_query(
    source: &MetricSource,
    level: &Level,
    range: &BucketRange,
) -> Result<(String, Vec<String>), RiskwatchError> {
    let unit = range.granularity.as_sql_unit();
    let mut args = Vec::new();

    let (from, ts_col, value_expr, mut filters) = match source {
        MetricSource::TicketCount => (
            "tickets t".to_string(),
            "t.created_at",
            "count(*)::DOUBLE",
            Vec::new(),
        ),
        MetricSource::HighRate => (
            "tickets t
             LEFT JOIN (SELECT ticket_id, pred_priority,
                               row_number() OVER (PARTITION BY ticket_id ORDER BY created_at DESC, id DESC) AS rn
                        FROM predictions) l
               ON l.ticket_id = t.id AND l.rn = 1"
                .to_string(),
            "t.created_at",
            "avg(CASE WHEN l.pred_priority = 'high' THEN 1.0 ELSE 0.0 END)::DOUBLE",
            Vec::new(),
        ),
        MetricSource::EventSum { event_type } => {
            args.push(event_type.clone());
            (
                "events e".to_string(),
                "e.ts",
                "sum(e.value)::DOUBLE",
                vec!["e.event_type = ?".to_string()],
            )
        }
    };

    filters.push(format!("{} >= CAST(? AS TIMESTAMP)", ts_col));
    filters.push(format!("{} < CAST(? AS TIMESTAMP)", ts_col));
    args.push(ts_param(range.first));
    args.push(ts_param(range.end_exclusive()));

    if let Some(dimension) = level.dimension() {
        filters.push(partition_filter(source, dimension)?);
        args.push(level.key().unwrap_or_default().to_string());
    }

    let sql = format!(
        "SELECT strftime(date_trunc('{unit}', {ts_col}), '%Y-%m-%d %H:%M:%S') AS bucket, {value_expr} AS value
         FROM {from}
         WHERE {filters}
         GROUP BY 1
         ORDER BY 1",
        filters = filters.join(" AND ")
    );
    Ok((sql, args))
}

fn partition_filter(source: &MetricSource, dimension: Dimension) -> Result<String, RiskwatchError> {
    match (source, dimension) {
        (MetricSource::EventSum { .. }, Dimension::Customer) => Ok("e.customer_id = ?".into()),
        (MetricSource::EventSum { .. }, other) => Err(unsupported_partition(other)),
        (_, Dimension::Queue) => Ok("t.queue = ?".into()),
        (_, Dimension::Customer) => Ok("t.customer_id = ?".into()),
        (_, Dimension::Tag) => Ok(
            "EXISTS (SELECT 1 FROM ticket_tags tt WHERE tt.ticket_id = t.id AND tt.tag = ?)".into(),
        ),
    }
}

fn unsupported_partition(dimension: Dimension) -> RiskwatchError {
    RiskwatchError::Domain(DomainError::Configuration(format!(
        "event metrics cannot be partitioned by {}",
        dimension.as_str()
    )))
}

#[async_trait]
impl FactSource for DuckDBStore {
    async fn observed_buckets(
        &self,
        source: &MetricSource,
        level: &Level,
        range: &BucketRange,
    ) -> Result<Vec<SeriesPoint>, RiskwatchError> {
        let (sql, args) = bucket_query(source, level, range)?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut points = Vec::new();
        for row in rows {
            let (bucket, value) = row?;
            points.push(SeriesPoint {
                bucket: parse_ts(&bucket)?,
                value,
            });
        }
        Ok(points)
    }

    async fn top_partitions(
        &self,
        source: &MetricSource,
        dimension: Dimension,
        range: &BucketRange,
        limit: usize,
    ) -> Result<Vec<String>, RiskwatchError> {
        let mut args = Vec::new();
        let sql = match (source, dimension) {
            (MetricSource::EventSum { event_type }, Dimension::Customer) => {
                args.push(event_type.clone());
                "SELECT e.customer_id FROM events e
                 WHERE e.event_type = ? AND e.customer_id IS NOT NULL
                   AND e.ts >= CAST(? AS TIMESTAMP) AND e.ts < CAST(? AS TIMESTAMP)
                 GROUP BY 1 ORDER BY count(*) DESC, 1"
            }
            (MetricSource::EventSum { .. }, other) => return Err(unsupported_partition(other)),
            (_, Dimension::Queue) => {
                "SELECT t.queue FROM tickets t
                 WHERE t.queue IS NOT NULL
                   AND t.created_at >= CAST(? AS TIMESTAMP) AND t.created_at < CAST(? AS TIMESTAMP)
                 GROUP BY 1 ORDER BY count(*) DESC, 1"
            }
            (_, Dimension::Customer) => {
                "SELECT t.customer_id FROM tickets t
                 WHERE t.customer_id IS NOT NULL
                   AND t.created_at >= CAST(? AS TIMESTAMP) AND t.created_at < CAST(? AS TIMESTAMP)
                 GROUP BY 1 ORDER BY count(*) DESC, 1"
            }
            (_, Dimension::Tag) => {
                "SELECT tt.tag FROM ticket_tags tt JOIN tickets t ON t.id = tt.ticket_id
                 WHERE t.created_at >= CAST(? AS TIMESTAMP) AND t.created_at < CAST(? AS TIMESTAMP)
                 GROUP BY 1 ORDER BY count(*) DESC, 1"
            }
        };
        args.push(ts_param(range.first));
        args.push(ts_param(range.end_exclusive()));

        let sql = format!("{} LIMIT {}", sql, limit);
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| row.get::<_, String>(0))?;
        let mut values = Vec::new();
        for row in rows {
            values.push(row?);
        }
        Ok(values)
    }
}

#[async_trait]
impl AlertStore for DuckDBStore {
    async fn insert_unless_active(
        &self,
        alert: &NewAlert,
    ) -> Result<InsertOutcome, RiskwatchError> {
        let now = ts_param(chrono::Utc::now().naive_utc());
        let details = serde_json::to_string(&alert.details).map_err(InfrastructureError::from)?;
        let conn = self.lock()?;
        let id: i64 = conn.query_row("SELECT nextval('seq_alert_id')", [], |row| row.get(0))?;

        // The UNIQUE active_key turns a concurrent duplicate into a no-op instead of a second row.
        let inserted = conn.execute(
            "INSERT INTO alerts (id, ts, alert_type, level, metric, value, zscore, window_size,
                                 severity, status, tracks_latest, details, active_key, created_at, updated_at)
             VALUES (?, CAST(? AS TIMESTAMP), ?, ?, ?, ?, ?, ?, ?, 'open', ?, ?, ?,
                     CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))
             ON CONFLICT (active_key) DO NOTHING",
            params![
                id,
                ts_param(alert.key.bucket),
                alert.key.alert_type,
                alert.key.level.to_string(),
                alert.key.metric,
                alert.value,
                alert.zscore,
                alert.window_size as i64,
                alert.severity.as_str(),
                alert.tracks_latest,
                details,
                alert.key.to_string(),
                now,
                now,
            ],
        )?;

        if inserted == 0 {
            Ok(InsertOutcome::AlreadyActive)
        } else {
            Ok(InsertOutcome::Created(id))
        }
    }

    async fn exists(&self, key: &AlertKey) -> Result<bool, RiskwatchError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT count(*) FROM alerts
             WHERE alert_type = ? AND level = ? AND metric = ? AND ts = CAST(? AS TIMESTAMP)",
            params![
                key.alert_type,
                key.level.to_string(),
                key.metric,
                ts_param(key.bucket)
            ],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    async fn open_tracking(&self, series: &SeriesKey) -> Result<Vec<Alert>, RiskwatchError> {
        let conn = self.lock()?;
        Self::query_alerts(
            &conn,
            "WHERE alert_type = ? AND level = ? AND metric = ? AND status = 'open' AND tracks_latest
             ORDER BY ts, id",
            &[
                series.alert_type.clone(),
                series.level.to_string(),
                series.metric.clone(),
            ],
        )
    }

    async fn get(&self, id: i64) -> Result<Option<Alert>, RiskwatchError> {
        let conn = self.lock()?;
        let mut alerts = Self::query_alerts(&conn, "WHERE id = ?", &[id.to_string()])?;
        Ok(alerts.pop())
    }

    async fn set_status(
        &self,
        id: i64,
        from: AlertStatus,
        to: AlertStatus,
    ) -> Result<bool, RiskwatchError> {
        let now = ts_param(chrono::Utc::now().naive_utc());
        let conn = self.lock()?;
        let changed = if to == AlertStatus::Closed {
            conn.execute(
                "UPDATE alerts SET status = 'closed', active_key = NULL,
                                   updated_at = CAST(? AS TIMESTAMP)
                 WHERE id = ? AND status = ?",
                params![now, id, from.as_str()],
            )?
        } else {
            conn.execute(
                "UPDATE alerts SET status = ?, updated_at = CAST(? AS TIMESTAMP)
                 WHERE id = ? AND status = ?",
                params![to.as_str(), now, id, from.as_str()],
            )?
        };
        if changed > 0 {
            return Ok(true);
        }
        let known: i64 = conn.query_row(
            "SELECT count(*) FROM alerts WHERE id = ?",
            params![id],
            |row| row.get(0),
        )?;
        if known == 0 {
            return Err(DomainError::AlertNotFound(id).into());
        }
        Ok(false)
    }

    async fn list(&self, filter: &AlertFilter) -> Result<Vec<Alert>, RiskwatchError> {
        let mut clauses = Vec::new();
        let mut args = Vec::new();
        if let Some(status) = filter.status {
            clauses.push("status = ?");
            args.push(status.as_str().to_string());
        }
        if let Some(alert_type) = &filter.alert_type {
            clauses.push("alert_type = ?");
            args.push(alert_type.clone());
        }
        if let Some(level) = &filter.level {
            clauses.push("level = ?");
            args.push(level.to_string());
        }
        if let Some(metric) = &filter.metric {
            clauses.push("metric = ?");
            args.push(metric.clone());
        }
        if let Some(since) = filter.since {
            clauses.push("ts >= CAST(? AS TIMESTAMP)");
            args.push(ts_param(since));
        }
        if let Some(until) = filter.until {
            clauses.push("ts < CAST(? AS TIMESTAMP)");
            args.push(ts_param(until));
        }

        let mut clause = String::new();
        if !clauses.is_empty() {
            clause.push_str("WHERE ");
            clause.push_str(&clauses.join(" AND "));
        }
        clause.push_str(" ORDER BY ts DESC, id DESC");
        if let Some(limit) = filter.limit {
            clause.push_str(&format!(" LIMIT {}", limit));
        }

        let conn = self.lock()?;
        Self::query_alerts(&conn, &clause, &args)
    }
}

#[async_trait]
impl PredictionSink for DuckDBStore {
    async fn append_prediction(&self, prediction: &NewPrediction) -> Result<i64, RiskwatchError> {
        let meta = serde_json::to_string(&prediction.meta).map_err(InfrastructureError::from)?;
        let conn = self.lock()?;
        let id: i64 = conn.query_row("SELECT nextval('seq_prediction_id')", [], |row| row.get(0))?;
        conn.execute(
            "INSERT INTO predictions (id, ticket_id, created_at, model_name, model_version, policy,
                                      threshold_high, pred_category, pred_priority, proba_high, meta)
             VALUES (?, ?, CAST(? AS TIMESTAMP), ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                prediction.ticket_id,
                ts_param(prediction.created_at),
                prediction.model_name,
                prediction.model_version,
                prediction.policy.as_str(),
                prediction.threshold_high,
                prediction.pred_category,
                prediction.pred_priority.as_str(),
                prediction.proba_high,
                meta,
            ],
        )?;
        Ok(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::monitoring::Granularity;
    use crate::domain::prediction::{PolicyName, Priority};
    use anyhow::Result;
    use chrono::{Duration, NaiveDate};

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn ticket(id: i64, at: NaiveDateTime, queue: &str, tags: &[&str]) -> NewTicket {
        NewTicket {
            id,
            created_at: at,
            customer_id: Some(format!("c{}", id % 2)),
            content: "printer on fire".into(),
            queue: Some(queue.into()),
            ticket_type: Some("incident".into()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            status: Default::default(),
        }
    }

    fn prediction(ticket_id: i64, at: NaiveDateTime, priority: Priority) -> NewPrediction {
        NewPrediction {
            ticket_id,
            created_at: at,
            model_name: "m".into(),
            model_version: "1".into(),
            policy: PolicyName::Balanced,
            threshold_high: None,
            pred_category: "hardware".into(),
            pred_priority: priority,
            proba_high: None,
            meta: serde_json::json!({}),
        }
    }

    fn new_alert(bucket: NaiveDateTime) -> NewAlert {
        NewAlert {
            key: AlertKey {
                alert_type: "tickets_spike".into(),
                level: Level::Global,
                metric: "tickets_total".into(),
                bucket,
            },
            value: 50.0,
            zscore: f64::INFINITY,
            window_size: 14,
            severity: Severity::Critical,
            tracks_latest: true,
            details: serde_json::json!({ "mean": 10.0 }),
        }
    }

    fn range() -> BucketRange {
        BucketRange::ending_at(day(3), Granularity::Day, 3)
    }

    #[tokio::test]
    async fn test_ticket_counts_by_level() -> Result<()> {
        let store = DuckDBStore::open(":memory:")?;
        store.insert_ticket(&ticket(1, day(1), "billing", &["vip"]))?;
        store.insert_ticket(&ticket(2, day(1), "tech", &[]))?;
        store.insert_ticket(&ticket(3, day(3), "billing", &["vip", "outage"]))?;
        store.insert_ticket(&ticket(4, day(9), "billing", &[]))?; // outside range

        let global = store
            .observed_buckets(&MetricSource::TicketCount, &Level::Global, &range())
            .await?;
        let values: Vec<(u32, f64)> = global
            .iter()
            .map(|p| (chrono::Datelike::day(&p.bucket), p.value))
            .collect();
        assert_eq!(values, vec![(1, 2.0), (3, 1.0)]);

        let billing = store
            .observed_buckets(
                &MetricSource::TicketCount,
                &Level::Queue("billing".into()),
                &range(),
            )
            .await?;
        assert_eq!(billing.len(), 2);

        let outage = store
            .observed_buckets(&MetricSource::TicketCount, &Level::Tag("outage".into()), &range())
            .await?;
        assert_eq!(outage.len(), 1);
        assert_eq!(outage[0].value, 1.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_high_rate_uses_latest_prediction() -> Result<()> {
        let store = DuckDBStore::open(":memory:")?;
        store.insert_ticket(&ticket(1, day(2), "billing", &[]))?;
        store.insert_ticket(&ticket(2, day(2), "billing", &[]))?;
        store
            .append_prediction(&prediction(1, day(2), Priority::High))
            .await?;
        // Re-scored later: ticket 1 is no longer high.
        store
            .append_prediction(&prediction(1, day(2) + Duration::hours(1), Priority::Low))
            .await?;
        store
            .append_prediction(&prediction(2, day(2), Priority::High))
            .await?;
        // Not scored yet: still counts in the denominator.
        store.insert_ticket(&ticket(3, day(2), "billing", &[]))?;

        let points = store
            .observed_buckets(&MetricSource::HighRate, &Level::Global, &range())
            .await?;
        assert_eq!(points.len(), 1);
        assert!((points[0].value - 1.0 / 3.0).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn test_event_sums_and_partitions() -> Result<()> {
        let store = DuckDBStore::open(":memory:")?;
        for (customer, value) in [("acme", 2.0), ("acme", 3.0), ("globex", 1.0)] {
            store.insert_event(&NewEvent {
                ts: day(2),
                event_type: "auth".into(),
                customer_id: Some(customer.into()),
                service: Some("sso".into()),
                value,
            })?;
        }
        let source = MetricSource::EventSum {
            event_type: "auth".into(),
        };
        let acme = store
            .observed_buckets(&source, &Level::Customer("acme".into()), &range())
            .await?;
        assert_eq!(acme[0].value, 5.0);

        let top = store
            .top_partitions(&source, Dimension::Customer, &range(), 1)
            .await?;
        assert_eq!(top, vec!["acme".to_string()]);

        let by_queue = store
            .observed_buckets(&source, &Level::Queue("billing".into()), &range())
            .await;
        assert!(by_queue.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_top_partitions_busiest_first() -> Result<()> {
        let store = DuckDBStore::open(":memory:")?;
        store.insert_ticket(&ticket(1, day(1), "tech", &["b"]))?;
        store.insert_ticket(&ticket(2, day(2), "billing", &["a", "b"]))?;
        store.insert_ticket(&ticket(3, day(3), "billing", &["a"]))?;
        store.insert_ticket(&ticket(4, day(3), "billing", &["a"]))?;

        let queues = store
            .top_partitions(&MetricSource::TicketCount, Dimension::Queue, &range(), 5)
            .await?;
        assert_eq!(queues, vec!["billing".to_string(), "tech".to_string()]);

        let tags = store
            .top_partitions(&MetricSource::TicketCount, Dimension::Tag, &range(), 1)
            .await?;
        assert_eq!(tags, vec!["a".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_active_key_blocks_duplicates_until_closed() -> Result<()> {
        let store = DuckDBStore::open(":memory:")?;
        let alert = new_alert(day(1));

        let first = store.insert_unless_active(&alert).await?;
        let InsertOutcome::Created(id) = first else {
            panic!("first insert must create");
        };
        assert_eq!(
            store.insert_unless_active(&alert).await?,
            InsertOutcome::AlreadyActive
        );

        assert!(
            store
                .set_status(id, AlertStatus::Open, AlertStatus::Acknowledged)
                .await?
        );
        assert_eq!(
            store.insert_unless_active(&alert).await?,
            InsertOutcome::AlreadyActive
        );

        assert!(
            store
                .set_status(id, AlertStatus::Acknowledged, AlertStatus::Closed)
                .await?
        );
        let reopened = store.insert_unless_active(&alert).await?;
        assert!(matches!(reopened, InsertOutcome::Created(new_id) if new_id != id));
        assert!(store.exists(&alert.key).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_alert_round_trip_keeps_infinite_score() -> Result<()> {
        let store = DuckDBStore::open(":memory:")?;
        let InsertOutcome::Created(id) = store.insert_unless_active(&new_alert(day(2))).await?
        else {
            panic!("expected creation");
        };
        let alert = store.get(id).await?.expect("alert exists");
        assert_eq!(alert.status, AlertStatus::Open);
        assert_eq!(alert.key.bucket, day(2));
        assert_eq!(alert.zscore, f64::INFINITY);
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.details["mean"], 10.0);
        assert!(alert.tracks_latest);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_filters() -> Result<()> {
        let store = DuckDBStore::open(":memory:")?;
        let mut queue_alert = new_alert(day(2));
        queue_alert.key.level = Level::Queue("billing".into());
        store.insert_unless_active(&new_alert(day(1))).await?;
        store.insert_unless_active(&queue_alert).await?;

        let all = store.list(&AlertFilter::default()).await?;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].key.bucket, day(2), "newest first");

        let billing = store
            .list(&AlertFilter {
                level: Some(Level::Queue("billing".into())),
                ..Default::default()
            })
            .await?;
        assert_eq!(billing.len(), 1);

        let since = store
            .list(&AlertFilter {
                since: Some(day(2)),
                status: Some(AlertStatus::Open),
                ..Default::default()
            })
            .await?;
        assert_eq!(since.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_status_unknown_alert() -> Result<()> {
        let store = DuckDBStore::open(":memory:")?;
        let res = store
            .set_status(999, AlertStatus::Open, AlertStatus::Closed)
            .await;
        assert!(matches!(
            res,
            Err(RiskwatchError::Domain(DomainError::AlertNotFound(999)))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_status_only_moves_from_expected_status() -> Result<()> {
        let store = DuckDBStore::open(":memory:")?;
        let alert = new_alert(day(1));
        let InsertOutcome::Created(id) = store.insert_unless_active(&alert).await? else {
            panic!("expected creation");
        };
        assert!(
            store
                .set_status(id, AlertStatus::Open, AlertStatus::Closed)
                .await?
        );

        // A late acknowledgement computed against the open row must not revive it.
        assert!(
            !store
                .set_status(id, AlertStatus::Open, AlertStatus::Acknowledged)
                .await?
        );
        let stored = store.get(id).await?.expect("alert exists");
        assert_eq!(stored.status, AlertStatus::Closed);
        assert!(matches!(
            store.insert_unless_active(&alert).await?,
            InsertOutcome::Created(_)
        ));
        Ok(())
    }

    #[test]
    fn test_feedback_and_events_get_sequential_ids() -> Result<()> {
        let store = DuckDBStore::open(":memory:")?;
        let feedback = NewFeedback {
            ticket_id: 1,
            category: Some("billing".into()),
            priority: Some(Priority::High),
            note: None,
        };
        assert_eq!(store.insert_feedback(&feedback, day(1))?, 1);
        assert_eq!(store.insert_feedback(&feedback, day(2))?, 2);

        let conn = store.lock()?;
        let priority: String =
            conn.query_row("SELECT priority FROM feedback WHERE id = 2", [], |r| r.get(0))?;
        assert_eq!(priority, "high");
        Ok(())
    }

    #[tokio::test]
    async fn test_import_events_csv() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let csv = dir.path().join("events.csv");
        std::fs::write(
            &csv,
            "ts,event_type,customer_id,service,value\n\
             2024-01-02 10:00:00,auth,acme,sso,3\n\
             2024-01-02 11:00:00,auth,acme,sso,2\n\
             2024-01-02 12:00:00,billing,acme,pay,9\n",
        )?;
        let store = DuckDBStore::open(":memory:")?;
        assert_eq!(store.import_events_csv(&csv)?, 3);

        let auth = store
            .observed_buckets(
                &MetricSource::EventSum {
                    event_type: "auth".into(),
                },
                &Level::Global,
                &range(),
            )
            .await?;
        assert_eq!(auth.len(), 1);
        assert_eq!(auth[0].value, 5.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_import_tickets_csv_is_idempotent() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let csv = dir.path().join("tickets.csv");
        std::fs::write(
            &csv,
            "id,created_at,customer_id,content,queue,ticket_type,tags\n\
             1,2024-01-01 08:00:00,c1,login broken,tech,incident,auth;vip\n\
             2,2024-01-02 09:00:00,c2,refund,billing,request,\n",
        )?;
        let store = DuckDBStore::open(":memory:")?;
        assert_eq!(store.import_tickets_csv(&csv)?, 2);
        assert_eq!(store.import_tickets_csv(&csv)?, 0);

        let vip = store
            .observed_buckets(&MetricSource::TicketCount, &Level::Tag("vip".into()), &range())
            .await?;
        assert_eq!(vip.len(), 1);
        Ok(())
    }
}
