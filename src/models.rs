use serde::{Deserialize, Serialize};

/// Asset name recorded when the form does not say which asset produced the
/// lead. Matches the cost-calculator embed shipped on the marketing site.
pub const DEFAULT_ASSET_NAME: &str = "Instant Pricing Estimator";

/// Raw inbound body from the web form, before trimming and validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSubmission {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub asset_name: Option<String>,
}

/// Whether the lead has booked a consultation. New submissions always start
/// out as `NotBooked`; the sales side flips it in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsultationStatus {
    #[serde(rename = "Booked")]
    Booked,
    #[default]
    #[serde(rename = "Not Booked")]
    NotBooked,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Booked => "Booked",
            ConsultationStatus::NotBooked => "Not Booked",
        }
    }
}

/// Normalized lead fields handed to the upsert pipeline.
///
/// Email is the merge key and is guaranteed non-empty, trimmed, and
/// shape-checked by the handler before this struct is built.
#[derive(Debug, Clone)]
pub struct LeadPayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Sanitized phone; empty string when the form omitted it.
    pub phone: String,
    pub asset_name: String,
    /// Direct asset record id; takes precedence over `asset_name` when set.
    pub asset_id: Option<String>,
    pub consultation_status: ConsultationStatus,
}

/// Record-list envelope returned by the store's list and create endpoints.
/// Only the record ids matter to us.
#[derive(Debug, Deserialize)]
pub struct RecordList {
    #[serde(default)]
    pub records: Vec<RecordRef>,
}

#[derive(Debug, Deserialize)]
pub struct RecordRef {
    pub id: String,
}
