// riskwatch-core/src/application/alerting.rs

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::alert::{Alert, AlertFilter, AlertKey, AlertStatus, InsertOutcome, NewAlert};
use crate::domain::error::DomainError;
use crate::domain::monitoring::{AlertScope, AnomalyRules, RetryPolicy, SeriesKey, Verdict};
use crate::error::RiskwatchError;
use crate::infrastructure::retry::with_backoff;
use crate::ports::store::AlertStore;

/// Scored series of one partition, ready to be written as alerts.
#[derive(Debug, Clone)]
pub struct PartitionEvaluation {
    pub series: SeriesKey,
    /// One verdict per bucket, oldest first. The last one is the latest bucket.
    pub verdicts: Vec<Verdict>,
    pub window_size: usize,
    pub rules: AnomalyRules,
    pub scope: AlertScope,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaterializeReport {
    pub created: usize,
    pub unchanged: usize,
    pub closed: usize,
}

pub struct AlertMaterializer;

impl AlertMaterializer {
    /// Writes the partition's alertable buckets and resolves stale latest-bucket alerts.
    ///
    /// Idempotent: a second call with the same evaluation creates and closes nothing.
    pub async fn materialize(
        store: &dyn AlertStore,
        eval: &PartitionEvaluation,
        retry: &RetryPolicy,
    ) -> Result<MaterializeReport, RiskwatchError> {
        let mut report = MaterializeReport::default();
        let Some((latest, history)) = eval.verdicts.split_last() else {
            return Ok(report);
        };

        // 1. Latest bucket
        let latest_key = AlertKey::new(&eval.series, latest.stat.bucket);
        let latest_alert = Self::to_alert(eval, latest, true);
        if let Some(alert) = &latest_alert {
            match with_backoff(retry, "insert alert", || store.insert_unless_active(alert)).await? {
                InsertOutcome::Created(id) => {
                    info!(alert_id = id, key = %alert.key, severity = %alert.severity, "Alert opened");
                    report.created += 1;
                }
                InsertOutcome::AlreadyActive => report.unchanged += 1,
            }
        }

        // 2. Auto-resolution: only alerts raised for a latest bucket, only while open.
        let tracking = with_backoff(retry, "open alerts", || store.open_tracking(&eval.series)).await?;
        for alert in tracking {
            let still_reported = latest_alert.is_some() && alert.key == latest_key;
            if still_reported {
                continue;
            }
            let closed = with_backoff(retry, "close alert", || {
                store.set_status(alert.id, AlertStatus::Open, AlertStatus::Closed)
            })
            .await?;
            if closed {
                info!(alert_id = alert.id, key = %alert.key, "Alert auto-resolved");
                report.closed += 1;
            } else {
                debug!(alert_id = alert.id, "Alert left open state meanwhile, not auto-resolved");
            }
        }

        // 3. Backfill: past buckets only when the key never had an alert.
        if eval.scope == AlertScope::All {
            for verdict in history {
                let Some(alert) = Self::to_alert(eval, verdict, false) else {
                    continue;
                };
                if with_backoff(retry, "alert exists", || store.exists(&alert.key)).await? {
                    report.unchanged += 1;
                    continue;
                }
                match with_backoff(retry, "insert alert", || store.insert_unless_active(&alert))
                    .await?
                {
                    InsertOutcome::Created(id) => {
                        debug!(alert_id = id, key = %alert.key, "Historical alert recorded");
                        report.created += 1;
                    }
                    InsertOutcome::AlreadyActive => report.unchanged += 1,
                }
            }
        }

        Ok(report)
    }

    fn to_alert(eval: &PartitionEvaluation, verdict: &Verdict, tracks_latest: bool) -> Option<NewAlert> {
        if !verdict.alertable {
            return None;
        }
        let zscore = verdict.stat.zscore?;
        let severity = verdict.severity?;
        Some(NewAlert {
            key: AlertKey::new(&eval.series, verdict.stat.bucket),
            value: verdict.stat.value,
            zscore,
            window_size: eval.window_size,
            severity,
            tracks_latest,
            details: serde_json::json!({
                "mean": verdict.stat.mean,
                "stddev": verdict.stat.stddev,
                "threshold": eval.rules.threshold,
                "direction": eval.rules.direction,
            }),
        })
    }
}

// --- OPERATOR ACTIONS ---

/// `open -> acknowledged`. Acknowledging twice is a no-op.
pub async fn acknowledge_alert(store: &dyn AlertStore, id: i64) -> Result<Alert, RiskwatchError> {
    transition_alert(store, id, AlertStatus::Acknowledged).await
}

/// `open | acknowledged -> closed`. Closing a closed alert is a no-op.
pub async fn close_alert(store: &dyn AlertStore, id: i64) -> Result<Alert, RiskwatchError> {
    transition_alert(store, id, AlertStatus::Closed).await
}

async fn transition_alert(
    store: &dyn AlertStore,
    id: i64,
    target: AlertStatus,
) -> Result<Alert, RiskwatchError> {
    // Statuses only move forward, so a lost race is re-read at most twice.
    loop {
        let alert = store.get(id).await?.ok_or(DomainError::AlertNotFound(id))?;
        if !alert.status.transition(target)? {
            return Ok(alert);
        }
        if store.set_status(id, alert.status, target).await? {
            info!(alert_id = id, from = %alert.status, to = %target, "Alert status changed");
            return store
                .get(id)
                .await?
                .ok_or_else(|| DomainError::AlertNotFound(id).into());
        }
        debug!(alert_id = id, "Alert status changed concurrently, re-reading");
    }
}

pub async fn list_alerts(
    store: &dyn AlertStore,
    filter: &AlertFilter,
) -> Result<Vec<Alert>, RiskwatchError> {
    store.list(filter).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::domain::monitoring::{Direction, Level, RollingStat, Severity};
    use crate::infrastructure::adapters::DuckDBStore;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn series() -> SeriesKey {
        SeriesKey {
            alert_type: "tickets_spike".into(),
            metric: "tickets_total".into(),
            level: Level::Global,
        }
    }

    fn verdict(d: u32, z: f64, rules: &AnomalyRules) -> Verdict {
        let stat = RollingStat {
            bucket: day(d),
            value: 10.0 + z,
            mean: Some(10.0),
            stddev: Some(1.0),
            zscore: Some(z),
        };
        crate::domain::monitoring::AnomalyEvaluator::evaluate(&[stat], rules)[0]
    }

    fn eval(zscores: &[(u32, f64)], scope: AlertScope) -> PartitionEvaluation {
        let rules = AnomalyRules::default();
        PartitionEvaluation {
            series: series(),
            verdicts: zscores.iter().map(|(d, z)| verdict(*d, *z, &rules)).collect(),
            window_size: 14,
            rules,
            scope,
        }
    }

    fn retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 1,
            base_delay_ms: 1,
            max_delay_ms: 1,
        }
    }

    async fn open_alerts(store: &DuckDBStore) -> Result<Vec<Alert>> {
        Ok(store
            .list(&AlertFilter {
                status: Some(AlertStatus::Open),
                ..Default::default()
            })
            .await?)
    }

    #[tokio::test]
    async fn test_same_anomaly_twice_yields_one_alert() -> Result<()> {
        let store = DuckDBStore::open(":memory:")?;
        let e = eval(&[(1, 0.0), (2, 4.0)], AlertScope::Latest);

        let first = AlertMaterializer::materialize(&store, &e, &retry()).await?;
        let second = AlertMaterializer::materialize(&store, &e, &retry()).await?;

        assert_eq!(first.created, 1);
        assert_eq!(second, MaterializeReport { created: 0, unchanged: 1, closed: 0 });
        let open = open_alerts(&store).await?;
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].severity, Severity::Critical);
        assert!(open[0].tracks_latest);
        Ok(())
    }

    #[tokio::test]
    async fn test_latest_alert_resolves_when_next_bucket_is_calm() -> Result<()> {
        let store = DuckDBStore::open(":memory:")?;
        AlertMaterializer::materialize(&store, &eval(&[(1, 3.0)], AlertScope::Latest), &retry())
            .await?;

        let report = AlertMaterializer::materialize(
            &store,
            &eval(&[(1, 3.0), (2, 0.5)], AlertScope::Latest),
            &retry(),
        )
        .await?;

        assert_eq!(report.closed, 1);
        assert!(open_alerts(&store).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_acknowledged_alert_is_not_auto_closed() -> Result<()> {
        let store = DuckDBStore::open(":memory:")?;
        AlertMaterializer::materialize(&store, &eval(&[(1, 3.0)], AlertScope::Latest), &retry())
            .await?;
        let id = store.list(&AlertFilter::default()).await?[0].id;
        acknowledge_alert(&store, id).await?;

        let report = AlertMaterializer::materialize(
            &store,
            &eval(&[(1, 3.0), (2, 0.0)], AlertScope::Latest),
            &retry(),
        )
        .await?;
        assert_eq!(report.closed, 0);
        let alert = store.get(id).await?.expect("alert");
        assert_eq!(alert.status, AlertStatus::Acknowledged);
        Ok(())
    }

    #[tokio::test]
    async fn test_drop_is_not_alerted_for_increase_metric() -> Result<()> {
        let store = DuckDBStore::open(":memory:")?;
        let e = eval(&[(1, 3.0), (2, -3.0)], AlertScope::All);
        assert_eq!(e.rules.direction, Direction::Increase);
        assert!(e.verdicts[1].is_anomalous);

        let report = AlertMaterializer::materialize(&store, &e, &retry()).await?;
        assert_eq!(report.created, 1);
        let alerts = store.list(&AlertFilter::default()).await?;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].key.bucket, day(1));
        assert!(!alerts[0].tracks_latest);
        Ok(())
    }

    #[tokio::test]
    async fn test_backfill_never_resurrects_closed_history() -> Result<()> {
        let store = DuckDBStore::open(":memory:")?;
        let e = eval(&[(1, 5.0), (2, 0.0)], AlertScope::All);
        AlertMaterializer::materialize(&store, &e, &retry()).await?;
        let id = store.list(&AlertFilter::default()).await?[0].id;
        close_alert(&store, id).await?;

        let report = AlertMaterializer::materialize(&store, &e, &retry()).await?;
        assert_eq!(report.created, 0);
        assert_eq!(store.list(&AlertFilter::default()).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_operator_actions_are_idempotent() -> Result<()> {
        let store = DuckDBStore::open(":memory:")?;
        AlertMaterializer::materialize(&store, &eval(&[(1, 3.0)], AlertScope::Latest), &retry())
            .await?;
        let id = store.list(&AlertFilter::default()).await?[0].id;

        assert_eq!(acknowledge_alert(&store, id).await?.status, AlertStatus::Acknowledged);
        assert_eq!(acknowledge_alert(&store, id).await?.status, AlertStatus::Acknowledged);
        assert_eq!(close_alert(&store, id).await?.status, AlertStatus::Closed);
        assert_eq!(close_alert(&store, id).await?.status, AlertStatus::Closed);

        let reopen = acknowledge_alert(&store, id).await;
        assert!(matches!(
            reopen,
            Err(RiskwatchError::Domain(DomainError::InvalidTransition { .. }))
        ));
        assert!(matches!(
            close_alert(&store, 404).await,
            Err(RiskwatchError::Domain(DomainError::AlertNotFound(404)))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_recurrence_after_close_gets_new_identity() -> Result<()> {
        let store = DuckDBStore::open(":memory:")?;
        let e = eval(&[(1, 3.0)], AlertScope::Latest);
        AlertMaterializer::materialize(&store, &e, &retry()).await?;
        let first = store.list(&AlertFilter::default()).await?[0].id;
        close_alert(&store, first).await?;

        let report = AlertMaterializer::materialize(&store, &e, &retry()).await?;
        assert_eq!(report.created, 1);
        let open = open_alerts(&store).await?;
        assert_eq!(open.len(), 1);
        assert_ne!(open[0].id, first);
        Ok(())
    }

    /// Lets an operator acknowledge every alert right after the engine listed it as open.
    struct AckAfterScan(DuckDBStore);

    #[async_trait]
    impl AlertStore for AckAfterScan {
        async fn insert_unless_active(
            &self,
            alert: &NewAlert,
        ) -> Result<InsertOutcome, RiskwatchError> {
            self.0.insert_unless_active(alert).await
        }

        async fn exists(&self, key: &AlertKey) -> Result<bool, RiskwatchError> {
            self.0.exists(key).await
        }

        async fn open_tracking(&self, series: &SeriesKey) -> Result<Vec<Alert>, RiskwatchError> {
            let open = self.0.open_tracking(series).await?;
            for alert in &open {
                acknowledge_alert(&self.0, alert.id).await?;
            }
            Ok(open)
        }

        async fn get(&self, id: i64) -> Result<Option<Alert>, RiskwatchError> {
            self.0.get(id).await
        }

        async fn set_status(
            &self,
            id: i64,
            from: AlertStatus,
            to: AlertStatus,
        ) -> Result<bool, RiskwatchError> {
            self.0.set_status(id, from, to).await
        }

        async fn list(&self, filter: &AlertFilter) -> Result<Vec<Alert>, RiskwatchError> {
            self.0.list(filter).await
        }
    }

    #[tokio::test]
    async fn test_acknowledgement_during_resolution_wins() -> Result<()> {
        let store = AckAfterScan(DuckDBStore::open(":memory:")?);
        AlertMaterializer::materialize(&store.0, &eval(&[(1, 3.0)], AlertScope::Latest), &retry())
            .await?;
        let id = store.0.list(&AlertFilter::default()).await?[0].id;

        let report = AlertMaterializer::materialize(
            &store,
            &eval(&[(1, 3.0), (2, 0.0)], AlertScope::Latest),
            &retry(),
        )
        .await?;

        assert_eq!(report.closed, 0);
        let alert = store.0.get(id).await?.expect("alert");
        assert_eq!(alert.status, AlertStatus::Acknowledged);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_materialize_opens_one_alert() -> Result<()> {
        let store = DuckDBStore::open(":memory:")?;
        let e = eval(&[(1, 0.0), (2, 4.0)], AlertScope::All);

        let (retry_a, retry_b) = (retry(), retry());
        let (a, b) = tokio::join!(
            AlertMaterializer::materialize(&store, &e, &retry_a),
            AlertMaterializer::materialize(&store, &e, &retry_b),
        );
        let (a, b) = (a?, b?);

        assert_eq!(a.created + b.created, 1);
        assert_eq!(a.unchanged + b.unchanged, 1);
        assert_eq!(open_alerts(&store).await?.len(), 1);
        Ok(())
    }
}
