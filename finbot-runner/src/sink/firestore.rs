//! Firestore sink over the REST API.
//!
//! Each trade becomes one document in
//! `artifacts/{app_id}/users/{user_id}/fish_trades`, written with
//! `createDocument` so the store assigns the id. Values are sent as typed
//! Firestore values; a missing price is an explicit `nullValue`.

use std::time::Duration;

use serde_json::{json, Map, Value};
use tracing::debug;

use finbot_core::data::{SinkAck, SinkError, TradeSink};
use finbot_core::domain::CommittedTrade;

use crate::config::FirestoreConfig;

pub struct FirestoreSink {
    client: reqwest::blocking::Client,
    config: FirestoreConfig,
}

impl FirestoreSink {
    pub fn new(config: FirestoreConfig) -> Result<Self, SinkError> {
        if config.project_id.trim().is_empty() {
            return Err(SinkError::Config("firestore project_id is empty".into()));
        }
        if config.app_id.trim().is_empty() || config.user_id.trim().is_empty() {
            return Err(SinkError::Config(
                "firestore app_id and user_id must be set".into(),
            ));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SinkError::Config(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Collection path relative to the database root.
    pub fn collection_path(&self) -> String {
        format!(
            "artifacts/{}/users/{}/fish_trades",
            self.config.app_id, self.config.user_id
        )
    }

    pub fn collection_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.project_id,
            self.collection_path()
        )
    }

    fn token(&self) -> Result<String, SinkError> {
        std::env::var(&self.config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                SinkError::Config(format!(
                    "bearer token variable {} is not set (try `gcloud auth print-access-token`)",
                    self.config.token_env
                ))
            })
    }
}

/// Encode a trade as a Firestore document body.
pub fn encode_document(trade: &CommittedTrade) -> Value {
    let mut fields = Map::new();
    fields.insert("decision".into(), json!({ "stringValue": trade.decision.to_string() }));
    fields.insert("stock".into(), json!({ "stringValue": trade.stock }));
    fields.insert(
        "price".into(),
        match trade.price {
            Some(p) => json!({ "doubleValue": p }),
            None => json!({ "nullValue": null }),
        },
    );
    // Firestore carries int64 as a decimal string.
    fields.insert("position_x".into(), json!({ "integerValue": trade.position_x.to_string() }));
    fields.insert("position_y".into(), json!({ "integerValue": trade.position_y.to_string() }));
    fields.insert(
        "canvas_width".into(),
        json!({ "integerValue": trade.canvas_width.to_string() }),
    );
    fields.insert(
        "timestamp".into(),
        json!({ "timestampValue": trade.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true) }),
    );
    fields.insert("status".into(), json!({ "stringValue": trade.status.as_str() }));
    json!({ "fields": fields })
}

/// Last path segment of a document `name`, i.e. the generated id.
fn document_id(body: &Value) -> Option<String> {
    body.get("name")?
        .as_str()?
        .rsplit('/')
        .next()
        .map(str::to_string)
}

impl TradeSink for FirestoreSink {
    fn describe(&self) -> String {
        format!("firestore:{}/{}", self.config.project_id, self.collection_path())
    }

    fn append(&mut self, trade: &CommittedTrade) -> Result<SinkAck, SinkError> {
        let token = self.token()?;
        let response = self
            .client
            .post(self.collection_url())
            .bearer_auth(token)
            .json(&encode_document(trade))
            .send()
            .map_err(|e| SinkError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .map_err(|e| SinkError::Encode(format!("unreadable createDocument response: {e}")))?;
        let document_id = document_id(&body);
        debug!(document = ?document_id, "trade stored");
        Ok(SinkAck { document_id })
    }
}
