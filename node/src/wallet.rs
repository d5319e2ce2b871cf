//! Identities the gateway can act as, one per configured organization.

use std::collections::BTreeMap;

use datamarket_protocol::identity::SerializedIdentity;

use crate::config::NetworkProfile;

#[derive(Debug, Clone, Default)]
pub struct Wallet {
    identities: BTreeMap<String, SerializedIdentity>,
}

impl Wallet {
    /// Enrolls one identity per organization in the profile.
    pub fn from_profile(profile: &NetworkProfile) -> Self {
        let identities = profile
            .organizations
            .iter()
            .map(|org| {
                let identity = SerializedIdentity::enroll(
                    org.msp_id.as_str(),
                    org.common_name.as_str(),
                    org.name.as_str(),
                    org.ca_organization.as_str(),
                );
                (org.name.clone(), identity)
            })
            .collect();
        Self { identities }
    }

    /// Identity for an organization, by name or MSP id.
    pub fn identity(&self, name_or_msp: &str) -> Option<&SerializedIdentity> {
        self.identities.get(name_or_msp).or_else(|| {
            self.identities
                .values()
                .find(|identity| identity.msp_id == name_or_msp)
        })
    }

    pub fn organizations(&self) -> impl Iterator<Item = &str> {
        self.identities.keys().map(String::as_str)
    }
}
