//! Provider capability and configuration.
//!
//! The router treats a provider implementation opaquely: it needs an identity
//! string (for logging and the configuration fingerprint) and an awaitable
//! completion method that reports failures through the router's error
//! taxonomy.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};

use llm_router_core::RouterError;

use crate::model::CompletionParams;

/// The result of a completed provider call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The concrete model that served the call.
    pub model: String,
    /// The generated text.
    pub content: String,
}

impl CompletionResponse {
    pub fn new(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self { model: model.into(), content: content.into() }
    }
}

/// An LLM endpoint the router can dispatch to.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Stable identity string for this implementation.
    fn name(&self) -> &str;

    /// Runs one completion call.
    async fn completion(
        &self,
        params: &CompletionParams,
    ) -> Result<CompletionResponse, RouterError>;
}

/// Stable fingerprint of a canonical JSON document: lowercase hex SHA-256.
pub fn generate_unique_id(canonical_json: &str) -> String {
    hex::encode(Sha256::digest(canonical_json.as_bytes()))
}

/// Identity and capacity of one concrete provider within a group.
///
/// The `id` is derived from a canonical (sorted-key, compact) JSON
/// serialization of `{impl, model_id, rpm, tpm}`, so two configurations with
/// identical fields share an id — and share accounting buckets. Distinct
/// providers in one router should therefore have distinct fields.
#[derive(Clone)]
pub struct ProviderConfig {
    id: String,
    pub model_id: String,
    pub implementation: Arc<dyn LlmProvider>,
    pub rpm: Option<u32>,
    pub tpm: Option<u32>,
    pub weight: Option<u32>,
}

impl ProviderConfig {
    /// Starts building a provider configuration.
    pub fn builder(
        model_id: impl Into<String>,
        implementation: Arc<dyn LlmProvider>,
    ) -> ProviderConfigBuilder {
        ProviderConfigBuilder {
            model_id: model_id.into(),
            implementation,
            rpm: None,
            tpm: None,
            weight: None,
        }
    }

    /// The configuration fingerprint.
    pub fn id(&self) -> &str {
        &self.id
    }

    fn canonical_fingerprint(
        model_id: &str,
        impl_name: &str,
        rpm: Option<u32>,
        tpm: Option<u32>,
    ) -> String {
        let mut fields: BTreeMap<&str, serde_json::Value> = BTreeMap::new();
        fields.insert("impl", impl_name.into());
        fields.insert("model_id", model_id.into());
        fields.insert("rpm", rpm.map_or(serde_json::Value::Null, Into::into));
        fields.insert("tpm", tpm.map_or(serde_json::Value::Null, Into::into));
        // BTreeMap iterates keys in sorted order; serde_json writes compactly.
        serde_json::to_string(&fields).unwrap_or_default()
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("id", &self.id)
            .field("model_id", &self.model_id)
            .field("impl", &self.implementation.name())
            .field("rpm", &self.rpm)
            .field("tpm", &self.tpm)
            .field("weight", &self.weight)
            .finish()
    }
}

impl Serialize for ProviderConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ProviderConfig", 6)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("model_id", &self.model_id)?;
        s.serialize_field("impl", self.implementation.name())?;
        s.serialize_field("rpm", &self.rpm)?;
        s.serialize_field("tpm", &self.tpm)?;
        s.serialize_field("weight", &self.weight)?;
        s.end()
    }
}

/// Builder for [`ProviderConfig`].
pub struct ProviderConfigBuilder {
    model_id: String,
    implementation: Arc<dyn LlmProvider>,
    rpm: Option<u32>,
    tpm: Option<u32>,
    weight: Option<u32>,
}

impl ProviderConfigBuilder {
    /// Requests-per-minute ceiling. Absent means unlimited.
    pub fn rpm(mut self, rpm: u32) -> Self {
        self.rpm = Some(rpm);
        self
    }

    /// Tokens-per-minute ceiling. Absent means unlimited.
    pub fn tpm(mut self, tpm: u32) -> Self {
        self.tpm = Some(tpm);
        self
    }

    /// Relative weight for capacity-based scheduling. Absent means unit weight.
    pub fn weight(mut self, weight: u32) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Finalizes the configuration, computing its fingerprint.
    pub fn build(self) -> ProviderConfig {
        let canonical = ProviderConfig::canonical_fingerprint(
            &self.model_id,
            self.implementation.name(),
            self.rpm,
            self.tpm,
        );
        ProviderConfig {
            id: generate_unique_id(&canonical),
            model_id: self.model_id,
            implementation: self.implementation,
            rpm: self.rpm,
            tpm: self.tpm,
            weight: self.weight,
        }
    }
}
