// riskwatch-core/src/infrastructure/adapters/schema.rs
//
// DDL for the fact and alert tables. Every statement is idempotent.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tickets (
    id          BIGINT PRIMARY KEY,
    created_at  TIMESTAMP NOT NULL,
    customer_id VARCHAR,
    content     VARCHAR NOT NULL,
    queue       VARCHAR,
    ticket_type VARCHAR,
    status      VARCHAR NOT NULL DEFAULT 'open'
);
CREATE INDEX IF NOT EXISTS idx_tickets_created_at ON tickets (created_at);
CREATE INDEX IF NOT EXISTS idx_tickets_queue ON tickets (queue, created_at);
CREATE INDEX IF NOT EXISTS idx_tickets_customer ON tickets (customer_id, created_at);

CREATE TABLE IF NOT EXISTS ticket_tags (
    ticket_id BIGINT NOT NULL,
    tag       VARCHAR NOT NULL,
    PRIMARY KEY (ticket_id, tag)
);
CREATE INDEX IF NOT EXISTS idx_ticket_tags_tag ON ticket_tags (tag);

CREATE SEQUENCE IF NOT EXISTS seq_prediction_id START 1;
CREATE TABLE IF NOT EXISTS predictions (
    id             BIGINT PRIMARY KEY,
    ticket_id      BIGINT NOT NULL,
    created_at     TIMESTAMP NOT NULL,
    model_name     VARCHAR NOT NULL,
    model_version  VARCHAR NOT NULL,
    policy         VARCHAR NOT NULL,
    threshold_high DOUBLE,
    pred_category  VARCHAR NOT NULL,
    pred_priority  VARCHAR NOT NULL,
    proba_high     DOUBLE,
    meta           VARCHAR NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS idx_predictions_ticket ON predictions (ticket_id, created_at);

CREATE SEQUENCE IF NOT EXISTS seq_event_id START 1;
CREATE TABLE IF NOT EXISTS events (
    id          BIGINT PRIMARY KEY DEFAULT nextval('seq_event_id'),
    ts          TIMESTAMP NOT NULL,
    event_type  VARCHAR NOT NULL,
    customer_id VARCHAR,
    service     VARCHAR,
    value       DOUBLE NOT NULL DEFAULT 1.0
);
CREATE INDEX IF NOT EXISTS idx_events_type_ts ON events (event_type, ts);
CREATE INDEX IF NOT EXISTS idx_events_customer ON events (customer_id, ts);

CREATE SEQUENCE IF NOT EXISTS seq_feedback_id START 1;
CREATE TABLE IF NOT EXISTS feedback (
    id         BIGINT PRIMARY KEY DEFAULT nextval('seq_feedback_id'),
    ticket_id  BIGINT NOT NULL,
    created_at TIMESTAMP NOT NULL,
    category   VARCHAR,
    priority   VARCHAR,
    note       VARCHAR
);

-- active_key holds the natural key while the alert is open or acknowledged and NULL once closed,
-- so the UNIQUE constraint allows one active alert per key and any number of closed ones.
CREATE SEQUENCE IF NOT EXISTS seq_alert_id START 1;
CREATE TABLE IF NOT EXISTS alerts (
    id            BIGINT PRIMARY KEY,
    ts            TIMESTAMP NOT NULL,
    alert_type    VARCHAR NOT NULL,
    level         VARCHAR NOT NULL,
    metric        VARCHAR NOT NULL,
    value         DOUBLE NOT NULL,
    zscore        DOUBLE NOT NULL,
    window_size   BIGINT NOT NULL,
    severity      VARCHAR NOT NULL,
    status        VARCHAR NOT NULL,
    tracks_latest BOOLEAN NOT NULL,
    details       VARCHAR NOT NULL,
    active_key    VARCHAR UNIQUE,
    created_at    TIMESTAMP NOT NULL,
    updated_at    TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alerts_series ON alerts (alert_type, level, metric, ts);
"#;
