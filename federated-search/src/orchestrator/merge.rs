//! Frontier-based merge of the two providers' buffered windows.
//!
//! Each provider returns its hits best first, but only one page at a time.
//! A merge round may therefore emit a hit only if no hit still unfetched on
//! either side could sort ahead of it. The *frontier* is the smaller of the
//! two buffers' last sort values: everything at or before it is safe, the
//! rest stays buffered for the next round.

use std::cmp::Ordering;

use crate::types::{Bucket, Hit, SortField};
use crate::window::ResultWindow;

use super::scoring::calibrate;

/// Parameters of one merge round.
#[derive(Debug, Clone, Copy)]
pub struct MergeOptions<'a> {
    /// Field hits are ordered by.
    pub sort_field: SortField,
    /// Sort values this close are treated as tied.
    pub tolerance: f64,
    /// Whether the secondary provider ran in this session.
    pub secondary_active: bool,
    /// Top-level category covered by the secondary provider.
    pub covered_category: &'a str,
}

/// Stable ascending sort by `field`.
pub fn sort_hits(hits: &mut [Hit], field: SortField) {
    hits.sort_by(|a, b| {
        a.sort_value(field)
            .partial_cmp(&b.sort_value(field))
            .unwrap_or(Ordering::Equal)
    });
}

/// The sort value up to which both buffers can be emitted safely.
///
/// Returns `None` if either buffer is empty.
pub fn frontier(primary: &[Hit], secondary: &[Hit], field: SortField) -> Option<f64> {
    let p = primary.last()?.sort_value(field);
    let s = secondary.last()?.sort_value(field);
    Some(p.min(s))
}

/// Index splitting `hits` into an emitted prefix and a buffered suffix.
///
/// - both providers exhausted: the whole list
/// - last element tied with `frontier`: the whole list
/// - otherwise the first index whose value exceeds `frontier`, or `0` if
///   there is none
pub fn find_pivot(
    hits: &[Hit],
    frontier: f64,
    field: SortField,
    tolerance: f64,
    all_exhausted: bool,
) -> usize {
    if all_exhausted {
        return hits.len();
    }
    let Some(last) = hits.last() else {
        return 0;
    };
    if (last.sort_value(field) - frontier).abs() <= tolerance {
        return hits.len();
    }
    hits.iter()
        .position(|h| h.sort_value(field) > frontier)
        .unwrap_or(0)
}

/// Run one merge round over the two windows and return the emitted page.
///
/// Emitted hits are removed from their windows; held-back hits stay
/// buffered with their original scores so a later round calibrates them
/// afresh.
pub fn merge_round(
    primary: &mut ResultWindow,
    secondary: &mut ResultWindow,
    options: &MergeOptions<'_>,
) -> Vec<Hit> {
    if options.secondary_active {
        let before = primary.hits.len();
        primary.retain(|h| !h.in_category(options.covered_category));
        let dropped = before - primary.hits.len();
        if dropped > 0 {
            tracing::debug!(dropped, category = options.covered_category, "excluded primary hits covered by secondary");
        }
    }

    let field = options.sort_field;

    if primary.hits.is_empty() || secondary.hits.is_empty() {
        let mut page = secondary.drain();
        page.extend(primary.drain());
        sort_hits(&mut page, field);
        return page;
    }

    let raw_secondary: Vec<f64> = secondary.hits.iter().map(|h| h.score).collect();
    if field == SortField::Score {
        calibrate(&primary.hits, &mut secondary.hits);
    }

    let all_exhausted = primary.is_exhausted() && secondary.is_exhausted();
    let Some(limit) = frontier(&primary.hits, &secondary.hits, field) else {
        return Vec::new();
    };
    let primary_pivot = find_pivot(&primary.hits, limit, field, options.tolerance, all_exhausted);
    let secondary_pivot = find_pivot(&secondary.hits, limit, field, options.tolerance, all_exhausted);

    let mut held_secondary = secondary.hits.split_off(secondary_pivot);
    for (hit, raw) in held_secondary
        .iter_mut()
        .zip(raw_secondary.iter().skip(secondary_pivot))
    {
        hit.score = *raw;
    }
    let held_primary = primary.hits.split_off(primary_pivot);

    let mut page = std::mem::replace(&mut secondary.hits, held_secondary);
    page.extend(std::mem::replace(&mut primary.hits, held_primary));
    sort_hits(&mut page, field);

    tracing::debug!(
        frontier = limit,
        primary_pivot,
        secondary_pivot,
        emitted = page.len(),
        "merge round"
    );
    page
}

/// Combine primary category buckets with secondary per-book counts.
///
/// Primary buckets inside `covered_category` are dropped: the secondary
/// counts replace them.
pub fn merge_buckets(primary: &[Bucket], secondary: &[Bucket], covered_category: &str) -> Vec<Bucket> {
    primary
        .iter()
        .filter(|b| !path_matches(&b.key, covered_category))
        .chain(secondary.iter())
        .cloned()
        .collect()
}

/// Returns `true` if `key` equals `prefix` or lies below it.
pub fn path_matches(key: &str, prefix: &str) -> bool {
    key.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Total of a merged page.
///
/// Without filters this is the sum of both providers' totals. With filters
/// it is the sum of doc counts of the buckets lying at or below any filter.
pub fn merged_total(primary_total: u64, secondary_total: u64, buckets: &[Bucket], filters: &[String]) -> u64 {
    if filters.is_empty() {
        return primary_total + secondary_total;
    }
    buckets
        .iter()
        .filter(|b| filters.iter().any(|f| path_matches(&b.key, f)))
        .map(|b| b.doc_count)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HitSource, Provider};

    const TOL: f64 = 0.001;

    fn hit(id: &str, provider: Provider, score: f64, comp_date: f64) -> Hit {
        Hit {
            id: id.into(),
            source: HitSource {
                reference: id.into(),
                categories: vec!["Talmud".into()],
                ..Default::default()
            },
            highlight: Default::default(),
            score,
            comp_date: Some(comp_date),
            came_from: provider,
            duplicates: Vec::new(),
        }
    }

    fn dated(provider: Provider, dates: &[f64]) -> Vec<Hit> {
        dates
            .iter()
            .map(|&d| hit(&format!("{provider}-{d}"), provider, -1.0, d))
            .collect()
    }

    fn window(hits: Vec<Hit>, last_seen: i64, total: u64) -> ResultWindow {
        ResultWindow {
            hits,
            last_seen,
            total,
        }
    }

    fn options(field: SortField) -> MergeOptions<'static> {
        MergeOptions {
            sort_field: field,
            tolerance: TOL,
            secondary_active: true,
            covered_category: "Tanakh",
        }
    }

    fn dates(hits: &[Hit]) -> Vec<f64> {
        hits.iter().filter_map(|h| h.comp_date).collect()
    }

    #[test]
    fn pivot_splits_at_first_value_past_frontier() {
        let hits = dated(Provider::Primary, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(find_pivot(&hits, 2.5, SortField::CompDate, TOL, false), 2);
    }

    #[test]
    fn pivot_takes_everything_when_exhausted() {
        let hits = dated(Provider::Primary, &[1.0, 2.0, 3.0]);
        assert_eq!(find_pivot(&hits, 0.5, SortField::CompDate, TOL, true), 3);
    }

    #[test]
    fn pivot_is_zero_when_nothing_fits() {
        let hits = dated(Provider::Primary, &[5.0, 6.0]);
        assert_eq!(find_pivot(&hits, 1.0, SortField::CompDate, TOL, false), 0);
    }

    #[test]
    fn float_tie_within_tolerance_takes_whole_list() {
        let tied = dated(Provider::Secondary, &[1.0, 3.0009]);
        let apart = dated(Provider::Secondary, &[1.0, 3.0011]);
        assert_eq!(find_pivot(&tied, 3.0, SortField::CompDate, TOL, false), 2);
        assert_eq!(find_pivot(&apart, 3.0, SortField::CompDate, TOL, false), 1);
    }

    #[test]
    fn either_empty_drains_and_sorts() {
        let mut primary = window(dated(Provider::Primary, &[3.0, 1.0, 2.0]), 2, 100);
        let mut secondary = window(Vec::new(), -1, 0);
        let page = merge_round(&mut primary, &mut secondary, &options(SortField::CompDate));
        assert_eq!(dates(&page), vec![1.0, 2.0, 3.0]);
        assert!(primary.hits.is_empty());
    }

    #[test]
    fn frontier_holds_back_unsafe_suffix() {
        let mut primary = window(dated(Provider::Primary, &[1.0, 4.0, 6.0]), 2, 10);
        let mut secondary = window(dated(Provider::Secondary, &[2.0, 3.0, 5.0]), 2, 10);
        let page = merge_round(&mut primary, &mut secondary, &options(SortField::CompDate));

        assert_eq!(dates(&page), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(dates(&primary.hits), vec![6.0]);
        assert!(secondary.hits.is_empty());
    }

    #[test]
    fn exhausted_windows_emit_everything() {
        let mut primary = window(dated(Provider::Primary, &[1.0, 6.0]), 1, 2);
        let mut secondary = window(dated(Provider::Secondary, &[2.0, 3.0]), 1, 2);
        let page = merge_round(&mut primary, &mut secondary, &options(SortField::CompDate));
        assert_eq!(dates(&page), vec![1.0, 2.0, 3.0, 6.0]);
        assert!(primary.hits.is_empty() && secondary.hits.is_empty());
    }

    #[test]
    fn covered_category_is_excluded_from_primary() {
        let mut covered = hit("Genesis 1:1", Provider::Primary, -1.0, 1.0);
        covered.source.categories = vec!["Tanakh".into(), "Torah".into()];
        let mut primary = window(vec![covered, hit("Berakhot 2a", Provider::Primary, -1.0, 2.0)], 1, 2);
        let mut secondary = window(Vec::new(), -1, 0);
        let page = merge_round(&mut primary, &mut secondary, &options(SortField::CompDate));
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "Berakhot 2a");
    }

    #[test]
    fn covered_category_kept_when_secondary_inactive() {
        let mut covered = hit("Genesis 1:1", Provider::Primary, -1.0, 1.0);
        covered.source.categories = vec!["Tanakh".into()];
        let mut primary = window(vec![covered], 0, 1);
        let mut secondary = window(Vec::new(), -1, 0);
        let opts = MergeOptions {
            secondary_active: false,
            ..options(SortField::CompDate)
        };
        assert_eq!(merge_round(&mut primary, &mut secondary, &opts).len(), 1);
    }

    #[test]
    fn held_back_secondary_keeps_raw_scores() {
        let mut primary = window(
            vec![
                hit("p0", Provider::Primary, -9.0, 0.0),
                hit("p1", Provider::Primary, -5.0, 0.0),
            ],
            1,
            50,
        );
        let mut secondary = window(
            vec![
                hit("s0", Provider::Secondary, -0.9, 0.0),
                hit("s1", Provider::Secondary, -0.8, 0.0),
                hit("s2", Provider::Secondary, -0.1, 0.0),
            ],
            2,
            50,
        );
        let page = merge_round(&mut primary, &mut secondary, &options(SortField::Score));
        assert!(!page.is_empty());
        for held in &secondary.hits {
            let raw = match held.id.as_str() {
                "s0" => -0.9,
                "s1" => -0.8,
                _ => -0.1,
            };
            assert!((held.score - raw).abs() < 1e-12);
        }
    }

    #[test]
    fn successive_rounds_reproduce_full_order() {
        // Both providers sorted ascending; fetched in pages of two.
        let all_primary = [1.0, 2.0, 5.0, 7.0, 8.0, 12.0];
        let all_secondary = [3.0, 4.0, 6.0, 9.0, 10.0, 11.0];
        let mut primary = ResultWindow::default();
        let mut secondary = ResultWindow::default();
        let mut emitted = Vec::new();

        for page in 0..3 {
            let range = page * 2..page * 2 + 2;
            primary.extend(dated(Provider::Primary, &all_primary[range.clone()]), 6);
            secondary.extend(dated(Provider::Secondary, &all_secondary[range]), 6);
            emitted.extend(merge_round(&mut primary, &mut secondary, &options(SortField::CompDate)));
        }
        emitted.extend(merge_round(&mut primary, &mut secondary, &options(SortField::CompDate)));

        let mut expected: Vec<f64> = all_primary.iter().chain(all_secondary.iter()).copied().collect();
        expected.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(dates(&emitted), expected);
    }

    #[test]
    fn emitted_prefix_survives_adversarial_late_hits() {
        let mut primary = window(dated(Provider::Primary, &[1.0, 5.0]), 1, 4);
        let mut secondary = window(dated(Provider::Secondary, &[2.0, 3.0]), 1, 4);
        let page = merge_round(&mut primary, &mut secondary, &options(SortField::CompDate));

        // Any unfetched hit sorts at or after each provider's last buffered value.
        let worst_late_primary = 5.0;
        let worst_late_secondary = 3.0;
        for emitted in &page {
            let value = emitted.comp_date.unwrap();
            assert!(value <= worst_late_primary && value <= worst_late_secondary);
        }
        assert_eq!(dates(&page), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn bucket_merge_replaces_covered_category() {
        let primary = vec![
            Bucket::new("Tanakh/Torah/Genesis", 40),
            Bucket::new("Talmud/Bavli/Berakhot", 7),
        ];
        let secondary = vec![Bucket::new("Tanakh/Torah/Genesis", 12)];
        let merged = merge_buckets(&primary, &secondary, "Tanakh");
        assert_eq!(
            merged,
            vec![
                Bucket::new("Talmud/Bavli/Berakhot", 7),
                Bucket::new("Tanakh/Torah/Genesis", 12),
            ]
        );
    }

    #[test]
    fn path_matches_requires_segment_boundary() {
        assert!(path_matches("Tanakh", "Tanakh"));
        assert!(path_matches("Tanakh/Torah", "Tanakh"));
        assert!(!path_matches("TanakhExtra/Torah", "Tanakh"));
    }

    #[test]
    fn total_without_filters_sums_providers() {
        assert_eq!(merged_total(30, 12, &[], &[]), 42);
    }

    #[test]
    fn total_with_filters_sums_matching_buckets() {
        let buckets = vec![
            Bucket::new("Tanakh/Torah/Genesis", 12),
            Bucket::new("Tanakh/Prophets/Isaiah", 5),
            Bucket::new("Talmud/Bavli/Berakhot", 7),
        ];
        let filters = vec!["Tanakh/Torah".to_string(), "Talmud".to_string()];
        assert_eq!(merged_total(100, 100, &buckets, &filters), 19);
    }
}
