//! # Provider Configuration Store
//!
//! Holds one `ProviderConfig` per supported provider. Readers take an `Arc` snapshot
//! at call start; writers build a complete new record and swap it in, so an update
//! never tears into a read that is already in flight.

use crate::{errors::PromptError, providers::ai::ProviderId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Credentials and model selection for a single provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model_name: String,
    pub api_url: String,
}

impl ProviderConfig {
    /// A config with the provider's default model and public endpoint.
    pub fn new(provider: ProviderId, api_key: Option<String>) -> Self {
        Self {
            api_key,
            model_name: provider.default_model().to_string(),
            api_url: provider.default_api_url().to_string(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Returns a new record with the present fields of `update` applied.
    pub fn merged(&self, update: &ProviderConfigUpdate) -> Self {
        Self {
            api_key: update.api_key.clone().or_else(|| self.api_key.clone()),
            model_name: update
                .model_name
                .clone()
                .unwrap_or_else(|| self.model_name.clone()),
            api_url: update
                .api_url
                .clone()
                .unwrap_or_else(|| self.api_url.clone()),
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .field("model_name", &self.model_name)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// A partial configuration. Absent fields leave the stored value untouched.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderConfigUpdate {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
}

impl ProviderConfigUpdate {
    pub fn model_name(model_name: impl Into<String>) -> Self {
        Self {
            model_name: Some(model_name.into()),
            ..Default::default()
        }
    }

    pub fn api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.model_name.is_none() && self.api_url.is_none()
    }
}

impl fmt::Debug for ProviderConfigUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfigUpdate")
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .field("model_name", &self.model_name)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// What callers may see about a provider's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub model_name: String,
    pub has_api_key: bool,
}

/// The process-wide provider configuration, owned explicitly and passed by handle.
#[derive(Debug)]
pub struct ConfigStore {
    records: RwLock<HashMap<ProviderId, Arc<ProviderConfig>>>,
}

impl ConfigStore {
    /// Creates a store seeded with defaults for every provider, then applies `configs`.
    pub fn new(configs: HashMap<ProviderId, ProviderConfig>) -> Self {
        let mut records: HashMap<ProviderId, Arc<ProviderConfig>> = ProviderId::ALL
            .iter()
            .map(|&id| (id, Arc::new(ProviderConfig::new(id, None))))
            .collect();
        for (id, config) in configs {
            records.insert(id, Arc::new(config));
        }
        Self {
            records: RwLock::new(records),
        }
    }

    /// Initializes from `OPENAI_API_KEY` / `CLAUDE_API_KEY` and the optional
    /// `OPENAI_MODEL` / `CLAUDE_MODEL` overrides, reading `.env` if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let configs = ProviderId::ALL
            .iter()
            .map(|&id| {
                let api_key = std::env::var(id.api_key_var())
                    .ok()
                    .filter(|k| !k.is_empty());
                let mut config = ProviderConfig::new(id, api_key);
                if let Ok(model) = std::env::var(id.model_var()) {
                    if !model.is_empty() {
                        config.model_name = model;
                    }
                }
                (id, config)
            })
            .collect();
        Self::new(configs)
    }

    /// Returns the record current at the time of the call.
    pub fn snapshot(&self, provider: ProviderId) -> Arc<ProviderConfig> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| Arc::new(ProviderConfig::new(provider, None)))
    }

    /// Merges `update` into the stored config for `provider_id`.
    ///
    /// The raw key is never logged; only its presence is reported.
    pub fn update_config(
        &self,
        provider_id: &str,
        update: &ProviderConfigUpdate,
    ) -> Result<(), PromptError> {
        let provider: ProviderId = provider_id.parse()?;
        if update.is_empty() {
            return Err(PromptError::InvalidRequest(
                "configuration update contains no fields".to_string(),
            ));
        }

        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let current = records
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| Arc::new(ProviderConfig::new(provider, None)));
        let next = Arc::new(current.merged(update));

        info!(
            provider = %provider,
            model = %next.model_name,
            api_key = if next.has_api_key() { "****" } else { "Not set" },
            "Updated provider configuration"
        );
        records.insert(provider, next);
        Ok(())
    }

    /// Model names and key presence for every provider. Never exposes secrets.
    pub fn summary(&self) -> BTreeMap<ProviderId, ProviderSummary> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records
            .iter()
            .map(|(&id, config)| {
                (
                    id,
                    ProviderSummary {
                        model_name: config.model_name.clone(),
                        has_api_key: config.has_api_key(),
                    },
                )
            })
            .collect()
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}
