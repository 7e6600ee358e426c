//! Airtable record operations: asset resolution and the idempotent lead
//! upsert. The store is the sole source of truth; nothing is persisted
//! locally.

use crate::config::{Config, LeadFieldIds};
use crate::errors::AppError;
use crate::models::{LeadPayload, RecordList};
use crate::transport::RetryingClient;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Escapes single quotes so a user-supplied asset name cannot break out of
/// the filterByFormula string literal.
fn escape_formula_quotes(name: &str) -> String {
    name.replace('\'', "\\'")
}

/// Exact-match filter formula for an asset name.
fn name_filter_formula(asset_name: &str) -> String {
    format!("({{Asset Name}} = '{}')", escape_formula_quotes(asset_name))
}

/// Resolves an asset name to a stable record id, creating the asset record
/// if no exact-name match exists.
///
/// Resolution failure is non-fatal: the caller proceeds without an asset
/// link, and the failure detail is logged here.
pub struct AssetResolver {
    transport: RetryingClient,
    base_url: String,
    token: String,
    assets_table: String,
    pinned_asset_id: Option<String>,
    // Per-name locks serializing lookup-then-create, so two concurrent
    // first-time resolutions of the same name cannot both create the record
    // while distinct names resolve in parallel. Entries are never evicted;
    // the asset catalog is a handful of names. Cross-process races remain
    // possible; the store has no unique constraint on names.
    resolve_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AssetResolver {
    pub fn new(config: &Config, transport: RetryingClient) -> Self {
        Self {
            transport,
            base_url: config.record_api_base(),
            token: config.airtable_token.clone(),
            assets_table: config.airtable_assets_table_id.clone(),
            pinned_asset_id: config.airtable_asset_id_cost_calculator.clone(),
            resolve_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves (or creates) the asset record id for `asset_name`.
    ///
    /// A `preferred_id` from the submission wins outright, then a pinned id
    /// from configuration; both paths make no network call. Otherwise the
    /// store is queried by exact name and the record is created when absent.
    ///
    /// Returns `None` when lookup or create fails; the lead write then
    /// proceeds unlinked.
    pub async fn resolve(&self, preferred_id: Option<&str>, asset_name: &str) -> Option<String> {
        if let Some(id) = preferred_id {
            return Some(id.to_string());
        }
        if let Some(ref id) = self.pinned_asset_id {
            return Some(id.clone());
        }

        let name_lock = {
            let mut locks = self.resolve_locks.lock().await;
            locks
                .entry(asset_name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = name_lock.lock().await;

        match self.lookup_by_name(asset_name).await {
            Ok(Some(id)) => {
                tracing::debug!("Asset '{}' resolved to existing record {}", asset_name, id);
                return Some(id);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Assets lookup failed: {}", e);
                return None;
            }
        }

        match self.create_asset(asset_name).await {
            Ok(id) => {
                tracing::info!("Created asset record {} for '{}'", id, asset_name);
                Some(id)
            }
            Err(e) => {
                tracing::error!("Asset create failed: {}", e);
                None
            }
        }
    }

    async fn lookup_by_name(&self, asset_name: &str) -> Result<Option<String>, AppError> {
        // parse_with_params handles the formula's url-encoding
        let url = reqwest::Url::parse_with_params(
            &format!("{}/{}", self.base_url, self.assets_table),
            &[
                ("maxRecords", "1"),
                ("filterByFormula", name_filter_formula(asset_name).as_str()),
            ],
        )
        .map_err(|e| AppError::Internal(format!("Failed to build assets URL: {}", e)))?;

        let request = self
            .transport
            .client()
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .build()?;

        let response = self.transport.execute(request).await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Upstream { status, body });
        }

        let list: RecordList = response.json().await.map_err(|e| {
            AppError::Internal(format!("Failed to parse assets lookup response: {}", e))
        })?;

        Ok(list.records.into_iter().next().map(|r| r.id))
    }

    async fn create_asset(&self, asset_name: &str) -> Result<String, AppError> {
        let url = format!("{}/{}", self.base_url, self.assets_table);
        // Field names (not ids) on asset create; the asset schema changes
        // rarely enough that readability wins here.
        let body = json!({
            "records": [{
                "fields": {
                    "Asset Name": asset_name,
                    "Type": "Form",
                    "Description": "Interactive cost calculator / instant pricing estimator.",
                }
            }],
            "typecast": true
        });

        let request = self
            .transport
            .client()
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&body)
            .build()?;

        let response = self.transport.execute(request).await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Upstream { status, body });
        }

        let created: RecordList = response.json().await.map_err(|e| {
            AppError::Internal(format!("Failed to parse asset create response: {}", e))
        })?;

        created
            .records
            .into_iter()
            .next()
            .map(|r| r.id)
            .ok_or_else(|| {
                AppError::Internal("Asset create response missing records".to_string())
            })
    }
}

/// Performs the idempotent create-or-update of a lead record, keyed by
/// email, linking the asset resolved for the submission.
pub struct LeadService {
    transport: RetryingClient,
    resolver: AssetResolver,
    base_url: String,
    token: String,
    leads_table: String,
    field_ids: LeadFieldIds,
}

impl LeadService {
    pub fn new(config: &Config, transport: RetryingClient) -> Self {
        Self {
            resolver: AssetResolver::new(config, transport.clone()),
            transport,
            base_url: config.record_api_base(),
            token: config.airtable_token.clone(),
            leads_table: config.airtable_leads_table_id.clone(),
            field_ids: config.lead_field_ids.clone(),
        }
    }

    /// Upserts the lead keyed on its email and returns the store's response
    /// body. Repeated calls for the same email converge to one record:
    /// fields are last-write-wins and the asset link accumulates via the
    /// store's own merge behavior.
    pub async fn upsert_lead(&self, payload: &LeadPayload) -> Result<Value, AppError> {
        if self.token.trim().is_empty() {
            return Err(AppError::Config("Missing AIRTABLE_TOKEN".to_string()));
        }

        let asset_id = self
            .resolver
            .resolve(payload.asset_id.as_deref(), &payload.asset_name)
            .await;

        let mut fields = Map::new();
        fields.insert(
            self.field_ids.first_name.clone(),
            json!(payload.first_name),
        );
        fields.insert(self.field_ids.last_name.clone(), json!(payload.last_name));
        fields.insert(self.field_ids.email.clone(), json!(payload.email));
        fields.insert(self.field_ids.phone.clone(), json!(payload.phone));
        fields.insert(
            self.field_ids.consultation_status.clone(),
            json!(payload.consultation_status.as_str()),
        );
        // Only set the link when resolution produced an id. Omitting the key
        // entirely preserves existing links on update; an empty list would
        // clear them.
        if let Some(id) = asset_id {
            fields.insert(self.field_ids.assets_interacted.clone(), json!([id]));
        } else {
            tracing::warn!(
                "Asset resolution failed for '{}'; upserting lead without asset link",
                payload.asset_name
            );
        }

        let body = json!({
            "performUpsert": { "fieldsToMergeOn": [self.field_ids.email] },
            "records": [{ "fields": Value::Object(fields) }],
            "typecast": true
        });

        let url = format!("{}/{}", self.base_url, self.leads_table);
        let request = self
            .transport
            .client()
            .patch(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&body)
            .build()?;

        tracing::info!("Upserting lead keyed on {}", payload.email);
        let response = self.transport.execute(request).await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Upstream { status, body });
        }

        let result: Value = response.json().await.map_err(|e| {
            AppError::Internal(format!("Failed to parse upsert response: {}", e))
        })?;

        tracing::info!("Lead upserted successfully for {}", payload.email);
        Ok(result)
    }
}
