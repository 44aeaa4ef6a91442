//! Targeting criteria consumed by candidate sources.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Organization headcount bucket, as understood by people-search providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OrgSizeBucket {
    /// 1-10 employees.
    #[serde(rename = "1-10")]
    Micro,
    /// 11-50 employees.
    #[serde(rename = "11-50")]
    Small,
    /// 51-200 employees.
    #[serde(rename = "51-200")]
    Medium,
    /// 201-500 employees.
    #[serde(rename = "201-500")]
    MidMarket,
    /// 501-1000 employees.
    #[serde(rename = "501-1000")]
    Large,
    /// 1001-5000 employees.
    #[serde(rename = "1001-5000")]
    Enterprise,
    /// 5001-10000 employees.
    #[serde(rename = "5001-10000")]
    LargeEnterprise,
    /// More than 10000 employees.
    #[serde(rename = "10001+")]
    Giant,
}

impl OrgSizeBucket {
    /// All buckets, smallest first.
    pub const ALL: [Self; 8] = [
        Self::Micro,
        Self::Small,
        Self::Medium,
        Self::MidMarket,
        Self::Large,
        Self::Enterprise,
        Self::LargeEnterprise,
        Self::Giant,
    ];

    /// Returns the bucket containing `headcount`.
    #[must_use]
    pub fn from_headcount(headcount: u64) -> Self {
        match headcount {
            0..=10 => Self::Micro,
            11..=50 => Self::Small,
            51..=200 => Self::Medium,
            201..=500 => Self::MidMarket,
            501..=1000 => Self::Large,
            1001..=5000 => Self::Enterprise,
            5001..=10000 => Self::LargeEnterprise,
            _ => Self::Giant,
        }
    }

    /// Inclusive bounds of the bucket; `None` upper bound means open-ended.
    #[must_use]
    pub fn bounds(&self) -> (u64, Option<u64>) {
        match self {
            Self::Micro => (1, Some(10)),
            Self::Small => (11, Some(50)),
            Self::Medium => (51, Some(200)),
            Self::MidMarket => (201, Some(500)),
            Self::Large => (501, Some(1000)),
            Self::Enterprise => (1001, Some(5000)),
            Self::LargeEnterprise => (5001, Some(10000)),
            Self::Giant => (10001, None),
        }
    }

    /// Returns the provider label, e.g. `"51-200"`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Micro => "1-10",
            Self::Small => "11-50",
            Self::Medium => "51-200",
            Self::MidMarket => "201-500",
            Self::Large => "501-1000",
            Self::Enterprise => "1001-5000",
            Self::LargeEnterprise => "5001-10000",
            Self::Giant => "10001+",
        }
    }
}

impl fmt::Display for OrgSizeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrgSizeBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .find(|bucket| bucket.as_str() == trimmed)
            .copied()
            .ok_or_else(|| format!("unknown organization size bucket: {trimmed}"))
    }
}

/// Structured targeting criteria used to query a people-search provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSet {
    /// Job title keywords.
    #[serde(default)]
    pub title_keywords: Vec<String>,
    /// Organization size buckets.
    #[serde(default)]
    pub org_sizes: Vec<OrgSizeBucket>,
    /// Industry tags.
    #[serde(default)]
    pub industries: Vec<String>,
    /// Location tags.
    #[serde(default)]
    pub locations: Vec<String>,
    /// Seniority levels.
    #[serde(default)]
    pub seniorities: Vec<String>,
    /// Free-text keywords.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl FilterSet {
    /// Creates an empty filter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title keywords.
    #[must_use]
    pub fn with_titles<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.title_keywords = titles.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the organization size buckets.
    #[must_use]
    pub fn with_org_sizes(mut self, sizes: impl IntoIterator<Item = OrgSizeBucket>) -> Self {
        self.org_sizes = sizes.into_iter().collect();
        self
    }

    /// Sets the industry tags.
    #[must_use]
    pub fn with_industries<I, S>(mut self, industries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.industries = industries.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the location tags.
    #[must_use]
    pub fn with_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locations = locations.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if no criteria are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title_keywords.is_empty()
            && self.org_sizes.is_empty()
            && self.industries.is_empty()
            && self.locations.is_empty()
            && self.seniorities.is_empty()
            && self.keywords.is_empty()
    }

    /// Stable short hash of the criteria, independent of list order.
    ///
    /// Used to correlate log lines of enrichment runs sharing the same
    /// targeting.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        fn feed(hasher: &mut Sha256, label: &str, values: impl Iterator<Item = String>) {
            let mut values: Vec<String> = values.map(|v| v.to_lowercase()).collect();
            values.sort();
            values.dedup();
            hasher.update(label.as_bytes());
            for value in values {
                hasher.update([0x1f]);
                hasher.update(value.as_bytes());
            }
            hasher.update([0x1e]);
        }

        let mut hasher = Sha256::new();
        feed(&mut hasher, "titles", self.title_keywords.iter().cloned());
        feed(
            &mut hasher,
            "sizes",
            self.org_sizes.iter().map(ToString::to_string),
        );
        feed(&mut hasher, "industries", self.industries.iter().cloned());
        feed(&mut hasher, "locations", self.locations.iter().cloned());
        feed(&mut hasher, "seniorities", self.seniorities.iter().cloned());
        feed(&mut hasher, "keywords", self.keywords.iter().cloned());
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_from_headcount() {
        assert_eq!(OrgSizeBucket::from_headcount(0), OrgSizeBucket::Micro);
        assert_eq!(OrgSizeBucket::from_headcount(50), OrgSizeBucket::Small);
        assert_eq!(OrgSizeBucket::from_headcount(51), OrgSizeBucket::Medium);
        assert_eq!(OrgSizeBucket::from_headcount(10_000), OrgSizeBucket::LargeEnterprise);
        assert_eq!(OrgSizeBucket::from_headcount(250_000), OrgSizeBucket::Giant);
    }

    #[test]
    fn test_bucket_parse_and_serde() {
        assert_eq!("51-200".parse::<OrgSizeBucket>(), Ok(OrgSizeBucket::Medium));
        assert!("51-199".parse::<OrgSizeBucket>().is_err());

        let json = serde_json::to_string(&OrgSizeBucket::Giant).unwrap();
        assert_eq!(json, r#""10001+""#);
    }

    #[test]
    fn test_filter_set_camel_case() {
        let filters: FilterSet = serde_json::from_str(
            r#"{"titleKeywords": ["CTO"], "orgSizes": ["11-50"], "locations": ["Texas"]}"#,
        )
        .unwrap();
        assert_eq!(filters.title_keywords, vec!["CTO"]);
        assert_eq!(filters.org_sizes, vec![OrgSizeBucket::Small]);
        assert!(filters.industries.is_empty());
        assert!(!filters.is_empty());
    }

    #[test]
    fn test_fingerprint_ignores_order_and_case() {
        let a = FilterSet::new()
            .with_titles(["CTO", "VP Engineering"])
            .with_locations(["Texas"]);
        let b = FilterSet::new()
            .with_titles(["vp engineering", "cto"])
            .with_locations(["texas"]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 16);
    }

    #[test]
    fn test_fingerprint_separates_fields() {
        let titles = FilterSet::new().with_titles(["Texas"]);
        let locations = FilterSet::new().with_locations(["Texas"]);
        assert_ne!(titles.fingerprint(), locations.fingerprint());
    }

    #[test]
    fn test_empty_filter_set() {
        assert!(FilterSet::new().is_empty());
    }
}
