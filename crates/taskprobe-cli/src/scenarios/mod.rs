//! Acceptance scenarios, grouped by suite

mod auth;
mod edge;
mod tasks;

use crate::runner::{Scenario, ScenarioContext, Steps, Suite};
use taskprobe::TaskRef;

/// Every scenario, suite by suite
#[must_use]
pub fn all() -> Vec<Scenario> {
    auth::SCENARIOS
        .iter()
        .chain(tasks::SCENARIOS)
        .chain(edge::SCENARIOS)
        .copied()
        .collect()
}

/// Scenarios of `suite` (all when `None`) whose id contains `filter`
#[must_use]
pub fn select(suite: Option<Suite>, filter: Option<&str>) -> Vec<Scenario> {
    all()
        .into_iter()
        .filter(|s| suite.map_or(true, |suite| s.suite == suite))
        .filter(|s| filter.map_or(true, |f| s.id().contains(f)))
        .collect()
}

/// Delete what a scenario created; failures become warnings
async fn tidy(ctx: &ScenarioContext, steps: &mut Steps, tasks: Vec<TaskRef>) {
    let report = ctx.page.delete_many(tasks).await;
    tracing::info!(%report, "scenario cleanup");
    steps.cleanup(&report);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let ids: Vec<String> = all().iter().map(Scenario::id).collect();
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(ids.len(), unique.len());
    }

    #[test]
    fn test_every_suite_is_populated() {
        for suite in [Suite::Auth, Suite::Tasks, Suite::Edge] {
            assert!(!select(Some(suite), None).is_empty(), "{suite}");
        }
    }

    #[test]
    fn test_filter_matches_id_substring() {
        let selected = select(None, Some("delete"));
        assert!(!selected.is_empty());
        assert!(selected.iter().all(|s| s.id().contains("delete")));
        assert!(select(Some(Suite::Auth), Some("no-such-scenario")).is_empty());
    }
}
