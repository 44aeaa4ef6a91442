//! Assertions over campaign results and progress.

use crate::core::{CampaignResult, DegradationKind, StageName};

/// Asserts that `stage` ran and succeeded.
pub fn assert_stage_completed(result: &CampaignResult, stage: StageName) {
    let found = result.stage(stage);
    assert!(
        found.is_some_and(|s| s.is_success()),
        "Expected stage {stage} to complete, got {:?}",
        found.map(|s| s.status)
    );
}

/// Asserts that the run recorded a degradation of `kind`.
pub fn assert_has_degradation(result: &CampaignResult, kind: DegradationKind) {
    assert!(
        result.degradations.iter().any(|d| d.kind == kind),
        "Expected a {kind:?} degradation, got {:?}",
        result.degradations
    );
}

/// Asserts that the run recorded no degradation of `kind`.
pub fn assert_no_degradation(result: &CampaignResult, kind: DegradationKind) {
    assert!(
        !result.degradations.iter().any(|d| d.kind == kind),
        "Unexpected {kind:?} degradation in {:?}",
        result.degradations
    );
}

/// Asserts that `percentages` never decrease.
pub fn assert_monotonic(percentages: &[u8]) {
    assert!(
        percentages.windows(2).all(|w| w[0] <= w[1]),
        "Progress went backwards: {percentages:?}"
    );
}
