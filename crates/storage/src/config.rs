// SPDX-License-Identifier: MIT

//! Versioned, sectioned YAML configuration (§6, §9 "two coexisting
//! configurations ... keep only the YAML variant"). Only version `"1"` is
//! accepted; a missing service or section is a hard error at load time, not
//! a default.

use crate::StoreError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// One `services.<name>` block: arbitrary named sections of free-form YAML,
/// looked up by `(service, section)` (§6 "Lookup by service name and
/// section").
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(flatten)]
    pub sections: HashMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: String,
    pub services: HashMap<String, ServiceConfig>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, StoreError> {
        let config: Config = serde_yaml::from_str(text)?;
        if config.version != "1" {
            return Err(StoreError::ConfigVersionMismatch {
                found: config.version,
            });
        }
        Ok(config)
    }

    /// Look up `services.<service>.<section>`, deserializing into `T`. A
    /// missing service or section is a hard error (§6, §7 "Config
    /// failures"), never a silent default.
    pub fn section<T: serde::de::DeserializeOwned>(
        &self,
        service: &str,
        section: &str,
    ) -> Result<T, StoreError> {
        let svc = self
            .services
            .get(service)
            .ok_or_else(|| StoreError::ConfigMissingService {
                service: service.to_string(),
            })?;
        let value = svc
            .sections
            .get(section)
            .ok_or_else(|| StoreError::ConfigMissingSection {
                service: service.to_string(),
                section: section.to_string(),
            })?;
        Ok(serde_yaml::from_value(value.clone())?)
    }
}

/// `services.<name>.store` section: store URI and logical database name
/// (§6 "A versioned, sectioned configuration document selects store URI
/// and logical database name").
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    pub uri: String,
    pub database: String,
}
