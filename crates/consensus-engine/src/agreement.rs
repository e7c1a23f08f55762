//! Per-field agreement across completed agent runs
//!
//! Values are compared by their trimmed, lowercased string form, so `120`,
//! `"120"` and `"120 "` from three agents count as one value.

use std::collections::BTreeSet;

use serde::Serialize;
use shared_types::{AgentRun, AgreementClass, FieldValue, ProviderId};

/// Comparison key for a value
pub fn normalize_value(value: &FieldValue) -> String {
    value.to_string().trim().to_lowercase()
}

/// Every field name reported by at least one completed run
pub fn field_names(runs: &[AgentRun]) -> BTreeSet<String> {
    runs.iter()
        .filter(|r| r.is_completed())
        .flat_map(|r| r.results.keys().cloned())
        .collect()
}

/// Normalized, non-empty values of one field from completed runs, in run order
fn collected_values<'a>(
    field_name: &'a str,
    runs: &'a [AgentRun],
) -> impl Iterator<Item = (&'a ProviderId, String)> + 'a {
    runs.iter()
        .filter(|r| r.is_completed())
        .filter_map(move |r| {
            let result = r.result(field_name)?;
            let normalized = normalize_value(result.value());
            (!normalized.is_empty()).then_some((&r.provider, normalized))
        })
}

/// Agreement class of one field, or `None` when no completed run reported it
pub fn agreement_for(field_name: &str, runs: &[AgentRun]) -> Option<AgreementClass> {
    let values: Vec<String> = collected_values(field_name, runs).map(|(_, v)| v).collect();
    if values.is_empty() {
        return None;
    }

    let distinct: BTreeSet<&String> = values.iter().collect();
    Some(if distinct.len() == 1 {
        AgreementClass::Full
    } else if distinct.len() < values.len() {
        AgreementClass::Partial
    } else {
        AgreementClass::None
    })
}

/// One provider's contribution to a field, for side-by-side review
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderValue {
    pub provider: ProviderId,
    pub normalized: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAgreement {
    pub field_name: String,
    /// Absent when no completed run reported the field
    pub agreement: Option<AgreementClass>,
    pub values: Vec<ProviderValue>,
}

/// Agreement for every reported field, ordered by field name
pub fn agreement_report(runs: &[AgentRun]) -> Vec<FieldAgreement> {
    field_names(runs)
        .into_iter()
        .map(|field_name| {
            let values = collected_values(&field_name, runs)
                .map(|(provider, normalized)| ProviderValue {
                    provider: provider.clone(),
                    normalized,
                })
                .collect();
            FieldAgreement {
                agreement: agreement_for(&field_name, runs),
                field_name,
                values,
            }
        })
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementStats {
    pub full: usize,
    pub partial: usize,
    pub none: usize,
    /// Fields present only with empty values; excluded from the percentage
    pub unclassified: usize,
    pub overall_percent: u32,
}

pub fn agreement_stats(runs: &[AgentRun]) -> AgreementStats {
    let mut stats = AgreementStats::default();
    for field_name in field_names(runs) {
        match agreement_for(&field_name, runs) {
            Some(AgreementClass::Full) => stats.full += 1,
            Some(AgreementClass::Partial) => stats.partial += 1,
            Some(AgreementClass::None) => stats.none += 1,
            None => stats.unclassified += 1,
        }
    }

    let classified = stats.full + stats.partial + stats.none;
    stats.overall_percent = if classified == 0 {
        0
    } else {
        (stats.full as f64 / classified as f64 * 100.0).round() as u32
    };
    stats
}

/// Share of classified fields with full agreement, 0-100
pub fn overall_agreement_percent(runs: &[AgentRun]) -> u32 {
    agreement_stats(runs).overall_percent
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use shared_types::{ExtractedFieldResult, GroundedFieldResult, UngroundedReason};

    pub(crate) fn completed(provider: &str, fields: Vec<(&str, FieldValue)>) -> AgentRun {
        let mut run = AgentRun::pending(provider.into());
        run.start().unwrap();
        run.complete(fields.into_iter().map(|(name, value)| {
            GroundedFieldResult::ungrounded(
                ExtractedFieldResult::new(name, value),
                None,
                UngroundedReason::NoMatch,
            )
        }))
        .unwrap();
        run
    }

    fn failed(provider: &str) -> AgentRun {
        let mut run = AgentRun::pending(provider.into());
        run.start().unwrap();
        run.fail("timeout").unwrap();
        run
    }

    #[test]
    fn test_number_and_string_forms_agree() {
        let runs = vec![
            completed("a", vec![("totalN", 120.into())]),
            completed("b", vec![("totalN", 120.into())]),
            completed("c", vec![("totalN", "120".into())]),
        ];
        assert_eq!(agreement_for("totalN", &runs), Some(AgreementClass::Full));
    }

    #[test]
    fn test_two_of_three_is_partial() {
        let runs = vec![
            completed("a", vec![("totalN", 120.into())]),
            completed("b", vec![("totalN", 118.into())]),
            completed("c", vec![("totalN", 120.into())]),
        ];
        assert_eq!(agreement_for("totalN", &runs), Some(AgreementClass::Partial));
    }

    #[test]
    fn test_case_and_whitespace_ignored() {
        let runs = vec![
            completed("a", vec![("blinded", "Yes".into())]),
            completed("b", vec![("blinded", "yes ".into())]),
        ];
        assert_eq!(agreement_for("blinded", &runs), Some(AgreementClass::Full));
    }

    #[test]
    fn test_all_different_is_none() {
        let runs = vec![
            completed("a", vec![("arm", "placebo".into())]),
            completed("b", vec![("arm", "drug".into())]),
        ];
        assert_eq!(agreement_for("arm", &runs), Some(AgreementClass::None));
    }

    #[test]
    fn test_failed_runs_and_empty_values_ignored() {
        let runs = vec![
            completed("a", vec![("sponsor", "Acme".into()), ("phase", "  ".into())]),
            failed("b"),
            completed("c", vec![("phase", "".into())]),
        ];
        assert_eq!(agreement_for("sponsor", &runs), Some(AgreementClass::Full));
        assert_eq!(agreement_for("phase", &runs), None);
        assert_eq!(agreement_for("missing", &runs), None);
    }

    #[test]
    fn test_stats_and_rounding() {
        let runs = vec![
            completed(
                "a",
                vec![("x", 1.into()), ("y", 2.into()), ("z", 3.into()), ("e", "".into())],
            ),
            completed("b", vec![("x", 1.into()), ("y", 2.into()), ("z", 4.into())]),
            completed("c", vec![("x", 1.into()), ("y", 2.into()), ("z", 3.into())]),
        ];
        let stats = agreement_stats(&runs);
        assert_eq!(
            stats,
            AgreementStats {
                full: 2,
                partial: 1,
                none: 0,
                unclassified: 1,
                overall_percent: 67,
            }
        );
    }

    #[test]
    fn test_percent_is_zero_without_fields() {
        assert_eq!(overall_agreement_percent(&[]), 0);
        assert_eq!(overall_agreement_percent(&[failed("a")]), 0);
    }

    #[test]
    fn test_report_lists_values_per_provider() {
        let runs = vec![
            completed("a", vec![("totalN", 120.into())]),
            failed("b"),
            completed("c", vec![("totalN", " 118".into())]),
        ];
        let report = agreement_report(&runs);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].agreement, Some(AgreementClass::None));
        assert_eq!(
            report[0].values,
            vec![
                ProviderValue {
                    provider: "a".into(),
                    normalized: "120".into()
                },
                ProviderValue {
                    provider: "c".into(),
                    normalized: "118".into()
                },
            ]
        );
    }

    fn value() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["Yes", "yes ", " YES", "No", "no", "120", "118", ""])
            .prop_map(str::to_string)
    }

    proptest! {
        /// Property: reordering providers never changes the class
        #[test]
        fn agreement_is_commutative(values in prop::collection::vec(value(), 1..6), seed in any::<u64>()) {
            let runs: Vec<AgentRun> = values
                .iter()
                .enumerate()
                .map(|(i, v)| completed(&format!("p{i}"), vec![("f", v.as_str().into())]))
                .collect();

            let mut shuffled = runs.clone();
            let len = shuffled.len();
            // deterministic rotation + reversal driven by the seed
            shuffled.rotate_left((seed as usize) % len);
            if seed % 2 == 1 {
                shuffled.reverse();
            }

            prop_assert_eq!(agreement_for("f", &runs), agreement_for("f", &shuffled));
        }
    }
}
