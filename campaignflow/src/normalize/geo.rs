//! US state and country alias tables.

/// US states and DC: (postal code, full name).
pub const US_STATES: &[(&str, &str)] = &[
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("DC", "District of Columbia"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
];

/// Country spellings mapped to the canonical provider name.
pub const COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("us", "United States"),
    ("u.s.", "United States"),
    ("usa", "United States"),
    ("u.s.a.", "United States"),
    ("united states", "United States"),
    ("united states of america", "United States"),
    ("america", "United States"),
    ("uk", "United Kingdom"),
    ("u.k.", "United Kingdom"),
    ("great britain", "United Kingdom"),
    ("britain", "United Kingdom"),
    ("england", "United Kingdom"),
    ("united kingdom", "United Kingdom"),
    ("uae", "United Arab Emirates"),
    ("united arab emirates", "United Arab Emirates"),
    ("deutschland", "Germany"),
    ("germany", "Germany"),
    ("france", "France"),
    ("canada", "Canada"),
    ("australia", "Australia"),
    ("india", "India"),
    ("holland", "Netherlands"),
    ("the netherlands", "Netherlands"),
    ("netherlands", "Netherlands"),
    ("españa", "Spain"),
    ("spain", "Spain"),
    ("brasil", "Brazil"),
    ("brazil", "Brazil"),
    ("mexico", "Mexico"),
    ("méxico", "Mexico"),
    ("ireland", "Ireland"),
    ("singapore", "Singapore"),
];

/// Full state name for a postal code or any-case full name.
#[must_use]
pub fn canonical_state(raw: &str) -> Option<&'static str> {
    let trimmed = raw.trim().trim_end_matches('.');
    US_STATES
        .iter()
        .find(|(code, name)| {
            code.eq_ignore_ascii_case(trimmed) || name.eq_ignore_ascii_case(trimmed)
        })
        .map(|(_, name)| *name)
}

/// Canonical country name for a known alias.
#[must_use]
pub fn canonical_country(raw: &str) -> Option<&'static str> {
    let lowered = raw.trim().to_lowercase();
    COUNTRY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| *canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_codes_and_names() {
        assert_eq!(canonical_state("TX"), Some("Texas"));
        assert_eq!(canonical_state("tx"), Some("Texas"));
        assert_eq!(canonical_state("new york"), Some("New York"));
        assert_eq!(canonical_state("Gotham"), None);
        assert_eq!(US_STATES.len(), 51);
    }

    #[test]
    fn test_country_aliases() {
        assert_eq!(canonical_country("USA"), Some("United States"));
        assert_eq!(canonical_country(" U.K. "), Some("United Kingdom"));
        assert_eq!(canonical_country("Atlantis"), None);
    }
}
