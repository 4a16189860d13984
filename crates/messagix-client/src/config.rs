// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Config service, storage port, and the client's own settings.

use messagix_proto::wire::DEFAULT_DUMP_LIMIT;
use messagix_proto::{Endpoints, Platform};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Storage port for raw config blobs (keyed by logical name).
pub trait ConfigStore {
    /// Load a raw config blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persist a raw config blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}

/// Serializes config values as JSON and delegates storage to a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Create a new service using the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> ConfigService<S>
where
    S: ConfigStore,
{
    /// Load and deserialize `key`. `Ok(None)` if missing or empty.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
    {
        match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Serialize and persist `value` under `key`.
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), ConfigError>
    where
        T: Serialize,
    {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }
}

/// Per-client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Surface the client talks to; fixed for the client's lifetime.
    pub platform: Platform,
    /// Device id sent with every LightSpeed request.
    pub device_id: String,
    /// App-state version stamped on task batches.
    pub version_id: String,
    /// Endpoint override; platform defaults when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Endpoints>,
    /// Byte bound for diagnostic body dumps.
    pub dump_limit: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            device_id: String::new(),
            version_id: String::new(),
            endpoints: None,
            dump_limit: DEFAULT_DUMP_LIMIT,
        }
    }
}

impl ClientConfig {
    /// Store key the config lives under.
    pub const KEY: &'static str = "client";

    /// Default config for `platform`.
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            platform,
            ..Self::default()
        }
    }

    /// Effective endpoints.
    pub fn endpoints(&self) -> Endpoints {
        self.endpoints
            .clone()
            .unwrap_or_else(|| self.platform.endpoints())
    }

    /// Load from `service`, falling back to defaults when nothing is stored.
    pub fn load<S: ConfigStore>(service: &ConfigService<S>) -> Result<Self, ConfigError> {
        Ok(service.load(Self::KEY)?.unwrap_or_default())
    }

    /// Persist to `service`.
    pub fn save<S: ConfigStore>(&self, service: &ConfigService<S>) -> Result<(), ConfigError> {
        service.save(Self::KEY, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapStore(RefCell<HashMap<String, Vec<u8>>>);

    impl ConfigStore for MapStore {
        fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
            self.0.borrow().get(key).cloned().ok_or(ConfigError::NotFound)
        }

        fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
            self.0.borrow_mut().insert(key.to_owned(), data.to_vec());
            Ok(())
        }
    }

    #[test]
    fn missing_config_loads_defaults() {
        let service = ConfigService::new(MapStore::default());
        let config = ClientConfig::load(&service).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.dump_limit, 4096);
        assert_eq!(config.endpoints(), Platform::Facebook.endpoints());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let store = MapStore::default();
        store
            .save_raw(ClientConfig::KEY, br#"{"platform":"instagram","device_id":"d1"}"#)
            .unwrap();
        let config = ClientConfig::load(&ConfigService::new(store)).unwrap();
        assert_eq!(config.platform, Platform::Instagram);
        assert_eq!(config.device_id, "d1");
        assert_eq!(config.dump_limit, DEFAULT_DUMP_LIMIT);
    }

    #[test]
    fn endpoint_override_wins() {
        let mut config = ClientConfig::for_platform(Platform::Messenger);
        config.endpoints = Some(Endpoints {
            base_url: "http://localhost:8080".into(),
            messages: "http://localhost:8080/t".into(),
            graphql: "http://localhost:8080/api/graphql/".into(),
        });
        let service = ConfigService::new(MapStore::default());
        config.save(&service).unwrap();
        let loaded = ClientConfig::load(&service).unwrap();
        assert_eq!(loaded.endpoints().graphql, "http://localhost:8080/api/graphql/");
    }

    #[test]
    fn garbage_is_a_serde_error() {
        let store = MapStore::default();
        store.save_raw(ClientConfig::KEY, b"not json").unwrap();
        let err = ClientConfig::load(&ConfigService::new(store)).unwrap_err();
        assert!(matches!(err, ConfigError::Serde(_)));
    }
}
