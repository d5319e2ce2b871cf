//! # Network Profile
//!
//! Describes the network the gateway serves: the channel, the token to
//! instantiate, the issuer policy, and the member organizations whose
//! identities the gateway can act as. Loaded from JSON; a built-in default
//! mirrors the two-organization test network (`Intage` and `WS1`).

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use datamarket_protocol::config::DEFAULT_CHANNEL;

/// Parameters passed to the token chaincode's `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenProfile {
    pub name: String,
    pub symbol: String,
    /// Common name of the only identity allowed to mint.
    pub publisher: String,
    pub initial_supply: u64,
}

/// A member organization and the identity the gateway enrolls for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationProfile {
    /// Short name used in API requests, e.g. `Intage`.
    pub name: String,
    pub msp_id: String,
    pub common_name: String,
    /// Organization of the CA that issued the identity.
    pub ca_organization: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    pub channel: String,
    pub token: TokenProfile,
    /// When set, minting also requires the caller's certificate to be
    /// issued by this organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_organization: Option<String>,
    /// Market owner recorded by the data market chaincode's `init`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_owner: Option<String>,
    pub organizations: Vec<OrganizationProfile>,
}

impl Default for NetworkProfile {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            token: TokenProfile {
                name: "Intage Token".into(),
                symbol: "ITK".into(),
                publisher: "Intage".into(),
                initial_supply: 1000,
            },
            issuer_organization: Some("intage.example.com".into()),
            market_owner: None,
            organizations: vec![
                OrganizationProfile {
                    name: "Intage".into(),
                    msp_id: "IntageMSP".into(),
                    common_name: "Intage".into(),
                    ca_organization: "intage.example.com".into(),
                },
                OrganizationProfile {
                    name: "WS1".into(),
                    msp_id: "WS1MSP".into(),
                    common_name: "WS1".into(),
                    ca_organization: "ws1.example.com".into(),
                },
            ],
        }
    }
}

impl NetworkProfile {
    /// Reads and validates a profile from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read profile {}", path.display()))?;
        let profile: NetworkProfile = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse profile {}", path.display()))?;
        profile.validate()?;
        Ok(profile)
    }

    /// Loads `path` if given, otherwise the built-in default.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Writes the profile as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to encode profile")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write profile {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.channel.is_empty() {
            bail!("channel can not be empty");
        }
        if self.token.name.is_empty() || self.token.symbol.is_empty() || self.token.publisher.is_empty() {
            bail!("token name, symbol and publisher are required");
        }
        if self.organizations.is_empty() {
            bail!("at least one organization is required");
        }
        let mut names = HashSet::new();
        let mut msps = HashSet::new();
        for org in &self.organizations {
            if org.name.is_empty() || org.msp_id.is_empty() || org.common_name.is_empty() {
                bail!("organization entries need a name, an MSP id and a common name");
            }
            if !names.insert(org.name.as_str()) {
                bail!("duplicate organization name {}", org.name);
            }
            if !msps.insert(org.msp_id.as_str()) {
                bail!("duplicate MSP id {}", org.msp_id);
            }
        }
        if self.publisher_organization().is_none() {
            bail!(
                "no organization enrolls the token publisher {}",
                self.token.publisher
            );
        }
        Ok(())
    }

    /// The organization whose identity carries the publisher's common name.
    pub fn publisher_organization(&self) -> Option<&OrganizationProfile> {
        self.organizations
            .iter()
            .find(|o| o.common_name == self.token.publisher)
    }
}
