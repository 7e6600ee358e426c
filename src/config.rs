use serde::Deserialize;

/// Default public Airtable REST endpoint. Overridable so tests and
/// self-hosted proxies can point the client elsewhere.
const DEFAULT_AIRTABLE_API_URL: &str = "https://api.airtable.com/v0";

/// Store-assigned field ids for the Leads table.
///
/// The lead upsert writes field ids rather than display names so the write
/// survives column renames on the store side. The ids below are the current
/// schema; each one can be overridden from the environment when the base is
/// migrated, without a rebuild.
#[derive(Debug, Clone, Deserialize)]
pub struct LeadFieldIds {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub consultation_status: String,
    pub assets_interacted: String,
}

impl Default for LeadFieldIds {
    fn default() -> Self {
        Self {
            first_name: "fldzqrzegFC2pHIKy".to_string(),
            last_name: "fldyNmcGU8COY2gyO".to_string(),
            email: "fldFiL8aVLy0T9dIf".to_string(),
            phone: "fldKQ1oaoF2KJbJgu".to_string(),
            consultation_status: "fldwn42WCMRaJvfDx".to_string(),
            assets_interacted: "fldhitKKfghXviFpc".to_string(),
        }
    }
}

impl LeadFieldIds {
    fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str, default: String| {
            std::env::var(name)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(default)
        };
        Self {
            first_name: var("AIRTABLE_FIELD_ID_FIRST_NAME", defaults.first_name),
            last_name: var("AIRTABLE_FIELD_ID_LAST_NAME", defaults.last_name),
            email: var("AIRTABLE_FIELD_ID_EMAIL", defaults.email),
            phone: var("AIRTABLE_FIELD_ID_PHONE", defaults.phone),
            consultation_status: var(
                "AIRTABLE_FIELD_ID_CONSULTATION_STATUS",
                defaults.consultation_status,
            ),
            assets_interacted: var(
                "AIRTABLE_FIELD_ID_ASSETS_INTERACTED",
                defaults.assets_interacted,
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub airtable_api_url: String,
    pub airtable_base_id: String,
    pub airtable_leads_table_id: String,
    pub airtable_assets_table_id: String,
    pub airtable_token: String,
    /// Pinned record id for the cost-calculator asset. When set, asset
    /// resolution short-circuits and never touches the network.
    pub airtable_asset_id_cost_calculator: Option<String>,
    pub lead_field_ids: LeadFieldIds,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            airtable_api_url: std::env::var("AIRTABLE_API_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AIRTABLE_API_URL.to_string()),
            airtable_base_id: std::env::var("AIRTABLE_BASE_ID")
                .map_err(|_| anyhow::anyhow!("AIRTABLE_BASE_ID environment variable required"))
                .and_then(|id| {
                    if id.trim().is_empty() {
                        anyhow::bail!("AIRTABLE_BASE_ID cannot be empty");
                    }
                    Ok(id)
                })?,
            airtable_leads_table_id: std::env::var("AIRTABLE_LEADS_TABLE_ID")
                .map_err(|_| {
                    anyhow::anyhow!("AIRTABLE_LEADS_TABLE_ID environment variable required")
                })
                .and_then(|id| {
                    if id.trim().is_empty() {
                        anyhow::bail!("AIRTABLE_LEADS_TABLE_ID cannot be empty");
                    }
                    Ok(id)
                })?,
            airtable_assets_table_id: std::env::var("AIRTABLE_ASSETS_TABLE_ID")
                .map_err(|_| {
                    anyhow::anyhow!("AIRTABLE_ASSETS_TABLE_ID environment variable required")
                })
                .and_then(|id| {
                    if id.trim().is_empty() {
                        anyhow::bail!("AIRTABLE_ASSETS_TABLE_ID cannot be empty");
                    }
                    Ok(id)
                })?,
            airtable_token: std::env::var("AIRTABLE_TOKEN")
                .map_err(|_| anyhow::anyhow!("AIRTABLE_TOKEN environment variable required"))
                .and_then(|token| {
                    if token.trim().is_empty() {
                        anyhow::bail!("AIRTABLE_TOKEN cannot be empty");
                    }
                    Ok(token)
                })?,
            airtable_asset_id_cost_calculator: std::env::var("AIRTABLE_ASSET_ID_COST_CALCULATOR")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            lead_field_ids: LeadFieldIds::from_env(),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Airtable API URL: {}", config.airtable_api_url);
        tracing::debug!("Airtable base: {}", config.airtable_base_id);
        if let Some(ref pinned) = config.airtable_asset_id_cost_calculator {
            tracing::info!("Pinned asset record id configured: {}", pinned);
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Base URL for record operations against this config's Airtable base.
    pub fn record_api_base(&self) -> String {
        format!("{}/{}", self.airtable_api_url, self.airtable_base_id)
    }
}
