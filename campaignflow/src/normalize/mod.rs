//! Pluggable text normalization for names, organizations, places and filters.
//!
//! The heuristics here are policy, not pipeline logic: swap the
//! [`Normalizer`] handed to the pipeline to change them.

pub mod geo;

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::core::{Candidate, FilterSet, OrgSizeBucket};

#[allow(clippy::expect_used)]
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

#[allow(clippy::expect_used)]
static HONORIFIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(dr|mr|mrs|ms|mx|prof|sir)\.?\s+").expect("valid honorific pattern")
});

#[allow(clippy::expect_used)]
static CREDENTIALS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(,\s*|\s+)(phd|ph\.d\.|mba|md|m\.d\.|cpa|pmp|esq\.?|jr\.?|sr\.?|ii|iii|cfa|pe)\.?$")
        .expect("valid credentials pattern")
});

#[allow(clippy::expect_used)]
static CORPORATE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)[,\s]+(inc|incorporated|llc|l\.l\.c|ltd|limited|corp|corporation|co|company|gmbh|plc|s\.a|ag|bv|pty)\.?$",
    )
    .expect("valid corporate suffix pattern")
});

#[allow(clippy::expect_used)]
static HEADCOUNT_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,]*)(\s*k)?").expect("valid headcount pattern")
});

#[allow(clippy::expect_used)]
static DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)+$")
        .expect("valid domain pattern")
});

const TITLE_ABBREVIATIONS: &[(&str, &str)] = &[
    ("sr", "Senior"),
    ("jr", "Junior"),
    ("mgr", "Manager"),
    ("dir", "Director"),
    ("eng", "Engineering"),
    ("mktg", "Marketing"),
    ("ops", "Operations"),
];

/// Normalization strategy applied to filters and candidates.
pub trait Normalizer: Send + Sync {
    /// Normalizes a domain or URL into a subject key, e.g. `"acme.io"`.
    /// Returns `None` if the input is not a domain.
    fn subject_key(&self, raw: &str) -> Option<String>;

    /// Cleans a person's name.
    fn person_name(&self, raw: &str) -> String;

    /// Cleans an organization name.
    fn organization(&self, raw: &str) -> String;

    /// Canonicalizes a location.
    fn location(&self, raw: &str) -> String;

    /// Cleans a job title.
    fn title(&self, raw: &str) -> String;

    /// Maps a free-text headcount or range to a size bucket.
    fn org_size_bucket(&self, raw: &str) -> Option<OrgSizeBucket>;

    /// Normalizes every field of a filter set and drops duplicates.
    fn filter_set(&self, filters: &FilterSet) -> FilterSet {
        let mut org_sizes = filters.org_sizes.clone();
        org_sizes.sort();
        org_sizes.dedup();
        FilterSet {
            title_keywords: clean_list(&filters.title_keywords, |t| self.title(t)),
            org_sizes,
            industries: clean_list(&filters.industries, |i| collapse_whitespace(i)),
            locations: clean_list(&filters.locations, |l| self.location(l)),
            seniorities: clean_list(&filters.seniorities, |s| collapse_whitespace(s).to_lowercase()),
            keywords: clean_list(&filters.keywords, |k| collapse_whitespace(k)),
        }
    }

    /// Normalizes a candidate as it enters the enrichment loop.
    fn candidate(&self, candidate: Candidate) -> Candidate {
        Candidate {
            name: self.person_name(&candidate.name),
            title: self.title(&candidate.title),
            organization: self.organization(&candidate.organization),
            location: self.location(&candidate.location),
            ..candidate
        }
    }
}

/// Regex-backed default heuristics.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNormalizer;

impl DefaultNormalizer {
    /// Creates the default normalizer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Normalizer for DefaultNormalizer {
    fn subject_key(&self, raw: &str) -> Option<String> {
        let mut key = raw.trim().to_lowercase();
        for scheme in ["https://", "http://"] {
            if let Some(rest) = key.strip_prefix(scheme) {
                key = rest.to_string();
            }
        }
        let host = key
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default()
            .split(':')
            .next()
            .unwrap_or_default()
            .trim_end_matches('.');
        let host = host.strip_prefix("www.").unwrap_or(host);
        DOMAIN.is_match(host).then(|| host.to_string())
    }

    fn person_name(&self, raw: &str) -> String {
        let mut name = collapse_whitespace(raw);
        name = HONORIFIC.replace(&name, "").into_owned();
        loop {
            let stripped = CREDENTIALS.replace(&name, "").into_owned();
            if stripped == name {
                break;
            }
            name = stripped;
        }
        let name = name.trim().trim_end_matches(',').trim();
        let has_lower = name.chars().any(char::is_lowercase);
        let has_upper = name.chars().any(char::is_uppercase);
        if has_lower && has_upper {
            name.to_string()
        } else {
            title_case(name)
        }
    }

    fn organization(&self, raw: &str) -> String {
        let mut org = collapse_whitespace(raw);
        loop {
            let stripped = CORPORATE_SUFFIX.replace(&org, "").into_owned();
            if stripped == org || stripped.is_empty() {
                break;
            }
            org = stripped;
        }
        org.trim().trim_end_matches(',').trim().to_string()
    }

    fn location(&self, raw: &str) -> String {
        let parts: Vec<String> = raw
            .split(',')
            .map(collapse_whitespace)
            .filter(|p| !p.is_empty())
            .collect();
        let multi = parts.len() > 1;
        parts
            .iter()
            .enumerate()
            .map(|(idx, part)| {
                if let Some(country) = geo::canonical_country(part) {
                    return country.to_string();
                }
                // Two-letter codes only count as states after a city.
                let is_code = part.len() == 2 && part.chars().all(|c| c.is_ascii_uppercase());
                if (idx > 0 && multi) || !is_code {
                    if let Some(state) = geo::canonical_state(part) {
                        if part.len() > 2 || idx > 0 {
                            return state.to_string();
                        }
                    }
                }
                part.clone()
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn title(&self, raw: &str) -> String {
        collapse_whitespace(raw)
            .split(' ')
            .map(|word| {
                let bare = word.trim_end_matches('.').to_lowercase();
                TITLE_ABBREVIATIONS
                    .iter()
                    .find(|(abbr, _)| *abbr == bare)
                    .map_or_else(|| word.to_string(), |(_, full)| (*full).to_string())
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn org_size_bucket(&self, raw: &str) -> Option<OrgSizeBucket> {
        if let Ok(bucket) = raw.parse::<OrgSizeBucket>() {
            return Some(bucket);
        }
        let numbers: Vec<u64> = HEADCOUNT_NUMBER
            .captures_iter(raw)
            .filter_map(|caps| {
                let digits: String = caps.get(1)?.as_str().chars().filter(char::is_ascii_digit).collect();
                let value: u64 = digits.parse().ok()?;
                Some(if caps.get(2).is_some() { value * 1000 } else { value })
            })
            .collect();
        match numbers.as_slice() {
            [] => None,
            [single] if raw.contains('+') => Some(OrgSizeBucket::from_headcount(single + 1)),
            [single] => Some(OrgSizeBucket::from_headcount(*single)),
            [_, upper, ..] => Some(OrgSizeBucket::from_headcount(*upper)),
        }
    }
}

/// Collapses runs of whitespace and trims.
#[must_use]
pub fn collapse_whitespace(raw: &str) -> String {
    WHITESPACE.replace_all(raw.trim(), " ").into_owned()
}

fn title_case(raw: &str) -> String {
    raw.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn clean_list(values: &[String], f: impl Fn(&str) -> String) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|v| f(v))
        .filter(|v| !v.is_empty() && seen.insert(v.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_subject_key() {
        let n = DefaultNormalizer::new();
        assert_eq!(n.subject_key("https://www.Acme.io/about?x=1"), Some("acme.io".to_string()));
        assert_eq!(n.subject_key("acme.co.uk:8080"), Some("acme.co.uk".to_string()));
        assert_eq!(n.subject_key("  http://sub.acme.io. "), Some("sub.acme.io".to_string()));
        assert_eq!(n.subject_key("not a domain"), None);
        assert_eq!(n.subject_key("localhost"), None);
    }

    #[test]
    fn test_person_name() {
        let n = DefaultNormalizer::new();
        assert_eq!(n.person_name("Dr. Jane  Smith, PhD"), "Jane Smith");
        assert_eq!(n.person_name("JOHN DOE"), "John Doe");
        assert_eq!(n.person_name("maría lópez, MBA, CPA"), "María López");
        assert_eq!(n.person_name("Ana McDonald"), "Ana McDonald");
    }

    #[test]
    fn test_organization() {
        let n = DefaultNormalizer::new();
        assert_eq!(n.organization("Acme, Inc."), "Acme");
        assert_eq!(n.organization("Globex Corporation"), "Globex");
        assert_eq!(n.organization("Initech LLC"), "Initech");
        assert_eq!(n.organization("Umbrella Holdings Co. Ltd."), "Umbrella Holdings");
        assert_eq!(n.organization("Inc"), "Inc");
    }

    #[test]
    fn test_location() {
        let n = DefaultNormalizer::new();
        assert_eq!(n.location("Austin, TX, USA"), "Austin, Texas, United States");
        assert_eq!(n.location("london,  UK"), "london, United Kingdom");
        assert_eq!(n.location("texas"), "Texas");
        assert_eq!(n.location("Berlin"), "Berlin");
    }

    #[test]
    fn test_title() {
        let n = DefaultNormalizer::new();
        assert_eq!(n.title("Sr.  Mgr, Growth"), "Senior Mgr, Growth");
        assert_eq!(n.title("Sr. Dir. Mktg"), "Senior Director Marketing");
        assert_eq!(n.title("CTO"), "CTO");
    }

    #[test]
    fn test_org_size_bucket() {
        let n = DefaultNormalizer::new();
        assert_eq!(n.org_size_bucket("51-200"), Some(OrgSizeBucket::Medium));
        assert_eq!(n.org_size_bucket("200-500 employees"), Some(OrgSizeBucket::MidMarket));
        assert_eq!(n.org_size_bucket("10,000+"), Some(OrgSizeBucket::Giant));
        assert_eq!(n.org_size_bucket("1k-5k"), Some(OrgSizeBucket::Enterprise));
        assert_eq!(n.org_size_bucket("about 40 people"), Some(OrgSizeBucket::Small));
        assert_eq!(n.org_size_bucket("startup"), None);
    }

    #[test]
    fn test_filter_set_dedupes_and_canonicalizes() {
        let n = DefaultNormalizer::new();
        let raw = FilterSet::new()
            .with_titles(["Sr. Engineer", "Senior Engineer", " "])
            .with_locations(["Austin, TX", "austin, Texas"])
            .with_org_sizes([OrgSizeBucket::Medium, OrgSizeBucket::Small, OrgSizeBucket::Medium]);
        let clean = n.filter_set(&raw);
        assert_eq!(clean.title_keywords, vec!["Senior Engineer"]);
        assert_eq!(clean.locations, vec!["Austin, Texas"]);
        assert_eq!(clean.org_sizes, vec![OrgSizeBucket::Small, OrgSizeBucket::Medium]);
    }

    #[test]
    fn test_candidate_normalization_keeps_identity() {
        let n = DefaultNormalizer::new();
        let candidate = Candidate::new("MR. BOB JONES", "VP Ops")
            .with_id("c-9")
            .with_organization("Acme, Inc.")
            .with_location("Denver, CO");
        let clean = n.candidate(candidate);
        assert_eq!(clean.id.as_deref(), Some("c-9"));
        assert_eq!(clean.name, "Bob Jones");
        assert_eq!(clean.title, "VP Operations");
        assert_eq!(clean.organization, "Acme");
        assert_eq!(clean.location, "Denver, Colorado");
    }
}
