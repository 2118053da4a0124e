//! Direction resolution: which Jingle of a pair is the repeat.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use super::model::{DirectionRule, Resolution};
use super::RepeatEngine;
use crate::error::RepeatResult;
use crate::jingle::model::{NodeRecord, Publication};
use crate::store::GraphStore;

impl<S: GraphStore> RepeatEngine<S> {
    /// Resolve the orientation of a proposed "`a` repeats `b`".
    ///
    /// Fails with `NotFound` when either Jingle is missing.
    pub async fn resolve(&self, a: &str, b: &str) -> RepeatResult<Resolution> {
        let node_a = self.store.get_node(a).await?;
        let node_b = self.store.get_node(b).await?;

        let resolution = resolve_direction(&node_a, &node_b);
        debug!(
            proposed_source = a,
            proposed_target = b,
            source = %resolution.source,
            target = %resolution.target,
            rule = resolution.rule.as_str(),
            "Resolved repeat direction"
        );
        Ok(resolution)
    }
}

/// Decide which of `a` (proposed repeat) and `b` (proposed original) is which.
///
/// Ties and missing creation times keep the proposed orientation; the rule
/// in the result says so.
pub fn resolve_direction(a: &NodeRecord, b: &NodeRecord) -> Resolution {
    match (a.publication, b.publication) {
        (Publication::Published(date_a), Publication::Published(date_b)) => {
            if date_a > date_b {
                keep(a, b, DirectionRule::BothPublished, format!(
                    "both published: {} ({}) airs after {} ({})",
                    a.id, stamp(date_a), b.id, stamp(date_b)
                ))
            } else if date_b > date_a {
                flip(a, b, DirectionRule::BothPublished, format!(
                    "both published: {} ({}) airs after {} ({})",
                    b.id, stamp(date_b), a.id, stamp(date_a)
                ))
            } else {
                keep(a, b, DirectionRule::BothPublishedTie, format!(
                    "both published on {}: {} and {} tie, proposed orientation kept",
                    stamp(date_a), a.id, b.id
                ))
            }
        }
        (Publication::Inedito, Publication::Published(date_b)) => keep(
            a,
            b,
            DirectionRule::IneditoIsRepeat,
            format!("{} is inedito, {} published on {}", a.id, b.id, stamp(date_b)),
        ),
        (Publication::Published(date_a), Publication::Inedito) => flip(
            a,
            b,
            DirectionRule::IneditoIsRepeat,
            format!("{} is inedito, {} published on {}", b.id, a.id, stamp(date_a)),
        ),
        (Publication::Inedito, Publication::Inedito) => match (a.created_at, b.created_at) {
            (Some(created_a), Some(created_b)) if created_a > created_b => keep(
                a,
                b,
                DirectionRule::CreatedAtOrder,
                format!(
                    "both inedito: {} (created {}) is newer than {} (created {})",
                    a.id, stamp(created_a), b.id, stamp(created_b)
                ),
            ),
            (Some(created_a), Some(created_b)) if created_b > created_a => flip(
                a,
                b,
                DirectionRule::CreatedAtOrder,
                format!(
                    "both inedito: {} (created {}) is newer than {} (created {})",
                    b.id, stamp(created_b), a.id, stamp(created_a)
                ),
            ),
            (Some(created_a), Some(_)) => keep(
                a,
                b,
                DirectionRule::CreatedAtTie,
                format!(
                    "both inedito and created at {}: {} and {} tie, proposed orientation kept",
                    stamp(created_a), a.id, b.id
                ),
            ),
            (created_a, created_b) => keep(
                a,
                b,
                DirectionRule::MissingCreatedAt,
                format!(
                    "both inedito and creation time missing ({}: {}, {}: {}), proposed orientation kept",
                    a.id, stamp_opt(created_a), b.id, stamp_opt(created_b)
                ),
            ),
        },
    }
}

fn keep(a: &NodeRecord, b: &NodeRecord, rule: DirectionRule, reason: String) -> Resolution {
    Resolution {
        source: a.id.clone(),
        target: b.id.clone(),
        corrected: false,
        rule,
        reason,
    }
}

fn flip(a: &NodeRecord, b: &NodeRecord, rule: DirectionRule, reason: String) -> Resolution {
    Resolution {
        source: b.id.clone(),
        target: a.id.clone(),
        corrected: true,
        rule,
        reason,
    }
}

fn stamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn stamp_opt(ts: Option<DateTime<Utc>>) -> String {
    ts.map(stamp).unwrap_or_else(|| "missing".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_both_published_later_is_repeat() {
        let j1 = NodeRecord::published("J1", day(2024, 1, 1), day(2023, 6, 1));
        let j2 = NodeRecord::published("J2", day(2024, 2, 1), day(2023, 1, 1));

        let res = resolve_direction(&j1, &j2);
        assert_eq!((res.source.as_str(), res.target.as_str()), ("J2", "J1"));
        assert!(res.corrected);
        assert_eq!(res.rule, DirectionRule::BothPublished);
        assert!(res.reason.contains("2024-02-01T00:00:00Z"));
        assert!(res.reason.contains("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_publication_beats_creation_order() {
        // J1 was created later but published earlier: publication wins.
        let j1 = NodeRecord::published("J1", day(2024, 1, 1), day(2024, 3, 1));
        let j2 = NodeRecord::published("J2", day(2024, 2, 1), day(2023, 1, 1));
        let res = resolve_direction(&j2, &j1);
        assert_eq!(res.source, "J2");
        assert!(!res.corrected);
    }

    #[test]
    fn test_equal_publication_keeps_proposal() {
        let j1 = NodeRecord::published("J1", day(2024, 1, 1), day(2023, 1, 1));
        let j2 = NodeRecord::published("J2", day(2024, 1, 1), day(2023, 6, 1));

        let forward = resolve_direction(&j1, &j2);
        assert_eq!(forward.source, "J1");
        assert!(!forward.corrected);
        assert_eq!(forward.rule, DirectionRule::BothPublishedTie);

        // Creation time does not break publication ties.
        let backward = resolve_direction(&j2, &j1);
        assert_eq!(backward.source, "J2");
        assert!(!backward.corrected);
    }

    #[test]
    fn test_inedito_is_always_repeat() {
        // Inedito created long before the published Jingle still repeats it.
        let j3 = NodeRecord::inedito("J3", Some(day(2020, 1, 1)));
        let j4 = NodeRecord::published("J4", day(2024, 1, 1), day(2023, 12, 1));

        let res = resolve_direction(&j4, &j3);
        assert_eq!((res.source.as_str(), res.target.as_str()), ("J3", "J4"));
        assert!(res.corrected);
        assert_eq!(res.rule, DirectionRule::IneditoIsRepeat);

        let res = resolve_direction(&j3, &j4);
        assert_eq!(res.source, "J3");
        assert!(!res.corrected);
    }

    #[test]
    fn test_inedito_pair_uses_created_at() {
        let old = NodeRecord::inedito("OLD", Some(day(2023, 1, 1)));
        let new = NodeRecord::inedito("NEW", Some(day(2023, 5, 1)));

        let res = resolve_direction(&old, &new);
        assert_eq!((res.source.as_str(), res.target.as_str()), ("NEW", "OLD"));
        assert!(res.corrected);
        assert_eq!(res.rule, DirectionRule::CreatedAtOrder);
    }

    #[test]
    fn test_inedito_created_at_tie() {
        let a = NodeRecord::inedito("A", Some(day(2023, 1, 1)));
        let b = NodeRecord::inedito("B", Some(day(2023, 1, 1)));
        let res = resolve_direction(&a, &b);
        assert_eq!(res.rule, DirectionRule::CreatedAtTie);
        assert_eq!(res.source, "A");
        assert!(!res.is_ambiguous());
    }

    #[test]
    fn test_missing_created_at_is_ambiguous() {
        let a = NodeRecord::inedito("A", None);
        let b = NodeRecord::inedito("B", Some(day(2023, 1, 1)));

        let res = resolve_direction(&a, &b);
        assert_eq!(res.source, "A");
        assert!(!res.corrected);
        assert!(res.is_ambiguous());
        assert!(res.reason.contains("A: missing"));
        assert!(res.reason.contains("B: 2023-01-01T00:00:00Z"));
    }

    fn arb_node(id: &'static str) -> impl Strategy<Value = NodeRecord> {
        (
            proptest::option::of(0i64..20),
            proptest::option::of(0i64..20),
        )
            .prop_map(move |(published, created)| {
                NodeRecord::new(
                    id,
                    published.map(|d| day(2024, 1, 1) + chrono::Duration::days(d)),
                    created.map(|d| day(2023, 1, 1) + chrono::Duration::days(d)),
                )
            })
    }

    proptest! {
        #[test]
        fn prop_argument_order_does_not_matter(a in arb_node("A"), b in arb_node("B")) {
            let forward = resolve_direction(&a, &b);
            let backward = resolve_direction(&b, &a);
            prop_assert_eq!(forward.rule, backward.rule);
            if !forward.rule.kept_proposal() {
                prop_assert_eq!(&forward.source, &backward.source);
                prop_assert_eq!(&forward.target, &backward.target);
                prop_assert_ne!(forward.corrected, backward.corrected);
            }
        }
    }
}
