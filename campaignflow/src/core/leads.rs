//! Candidates and enriched leads.

use serde::{Deserialize, Serialize};

/// A prospective contact returned by a people-search provider.
///
/// Candidates carry no verified contact address; they live only inside one
/// enrichment iteration until enriched or discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Provider-side identifier, when the provider exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Full name.
    pub name: String,
    /// Job title.
    #[serde(default)]
    pub title: String,
    /// Affiliated organization.
    #[serde(default)]
    pub organization: String,
    /// Free-text location.
    #[serde(default)]
    pub location: String,
    /// Free-text biography or headline.
    #[serde(default)]
    pub biography: String,
    /// Public profile URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
}

impl Candidate {
    /// Creates a candidate with a name and title.
    #[must_use]
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Sets the provider identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the organization.
    #[must_use]
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = organization.into();
        self
    }

    /// Sets the location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Key used to drop duplicates returned across pages.
    #[must_use]
    pub fn dedupe_key(&self) -> String {
        match &self.id {
            Some(id) if !id.is_empty() => format!("id:{id}"),
            _ => format!(
                "name:{}|{}",
                self.name.trim().to_lowercase(),
                self.organization.trim().to_lowercase()
            ),
        }
    }
}

/// A verified contact address for a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactAddress {
    /// Email address.
    pub email: String,
    /// Provider verification status (e.g. "verified", "likely").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_status: Option<String>,
}

impl ContactAddress {
    /// Creates a verified address.
    #[must_use]
    pub fn verified(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            verification_status: Some("verified".to_string()),
        }
    }
}

/// Where a lead came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadOrigin {
    /// Found by the candidate source and verified by the enrichment provider.
    #[default]
    Provider,
    /// Regenerated placeholder used when sourcing produced nothing.
    Synthetic,
}

/// A candidate plus a verified contact address.
///
/// Every enriched lead traces back to exactly one [`Candidate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedLead {
    /// The candidate this lead was built from.
    pub candidate: Candidate,
    /// The verified address.
    pub contact: ContactAddress,
    /// Lead origin.
    #[serde(default)]
    pub origin: LeadOrigin,
}

impl EnrichedLead {
    /// Builds a provider lead from a successfully enriched candidate.
    #[must_use]
    pub fn new(candidate: Candidate, contact: ContactAddress) -> Self {
        Self {
            candidate,
            contact,
            origin: LeadOrigin::Provider,
        }
    }

    /// Builds a synthetic lead.
    #[must_use]
    pub fn synthetic(candidate: Candidate, contact: ContactAddress) -> Self {
        Self {
            candidate,
            contact,
            origin: LeadOrigin::Synthetic,
        }
    }

    /// Returns the lead's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.candidate.name
    }

    /// Returns true for synthetic leads.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.origin == LeadOrigin::Synthetic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_key_prefers_id() {
        let a = Candidate::new("Ana Ruiz", "CTO").with_id("p-1");
        let b = Candidate::new("Someone Else", "CTO").with_id("p-1");
        assert_eq!(a.dedupe_key(), b.dedupe_key());
    }

    #[test]
    fn test_dedupe_key_falls_back_to_name_and_org() {
        let a = Candidate::new("Ana Ruiz", "CTO").with_organization("Acme");
        let b = Candidate::new(" ana ruiz ", "VP").with_organization("ACME");
        assert_eq!(a.dedupe_key(), b.dedupe_key());
    }

    #[test]
    fn test_candidate_deserializes_with_defaults() {
        let candidate: Candidate = serde_json::from_str(r#"{"name": "Ana"}"#).unwrap();
        assert_eq!(candidate.name, "Ana");
        assert!(candidate.title.is_empty());
        assert!(candidate.id.is_none());
    }

    #[test]
    fn test_enriched_lead_origin() {
        let lead = EnrichedLead::new(
            Candidate::new("Ana", "CTO"),
            ContactAddress::verified("ana@acme.io"),
        );
        assert!(!lead.is_synthetic());
        assert_eq!(lead.name(), "Ana");

        let synthetic = EnrichedLead::synthetic(
            Candidate::new("Sample", "CTO"),
            ContactAddress::verified("sample@example.com"),
        );
        assert!(synthetic.is_synthetic());
    }
}
