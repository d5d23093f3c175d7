#![forbid(unsafe_code)]

use std::f64::consts::E;

/// Relative weight of each event kind in a tree's popularity score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PopularityWeights {
    pub views: f64,
    pub comments: f64,
    pub likes: f64,
}

impl Default for PopularityWeights {
    fn default() -> Self {
        Self {
            views: 1.0,
            comments: 2.0,
            likes: 1.5,
        }
    }
}

/// Time-decay weight of a single event: `1 / ln(age_seconds + e)`.
///
/// Strictly decreasing in age, bounded above by 1 at age 0, and positive for
/// every non-negative age. Negative ages (clock skew) are treated as 0.
pub fn decay(age_seconds: f64) -> f64 {
    1.0 / (age_seconds.max(0.0) + E).ln()
}

/// Popularity of a tree from snapshots of its event timestamps. A pure
/// function; empty snapshots contribute 0.
pub fn score(
    now_ms: i64,
    weights: &PopularityWeights,
    view_ts_ms: &[i64],
    comment_ts_ms: &[i64],
    like_ts_ms: &[i64],
) -> f64 {
    weights.views * decayed_sum(now_ms, view_ts_ms)
        + weights.comments * decayed_sum(now_ms, comment_ts_ms)
        + weights.likes * decayed_sum(now_ms, like_ts_ms)
}

fn decayed_sum(now_ms: i64, stamps_ms: &[i64]) -> f64 {
    stamps_ms
        .iter()
        .map(|ts_ms| decay((now_ms - ts_ms) as f64 / 1000.0))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decay_is_bounded_and_decreasing() {
        assert!((decay(0.0) - 1.0).abs() < 1e-12);
        assert!(decay(10.0) < decay(1.0));
        assert!(decay(1_000_000.0) < decay(10.0));
        assert!(decay(1_000_000.0) > 0.0);
        assert_eq!(decay(-5.0), decay(0.0));
    }

    #[test]
    fn score_is_zero_without_events() {
        let weights = PopularityWeights::default();
        assert_eq!(score(1_000_000, &weights, &[], &[], &[]), 0.0);
    }

    #[test]
    fn recent_events_outweigh_old_ones() {
        let weights = PopularityWeights::default();
        let now = 1_000_000_000;
        let recent = score(now, &weights, &[], &[], &[now - 1_000]);
        let old = score(now, &weights, &[], &[], &[now - 10_000_000]);
        assert!(recent > old);
    }

    #[test]
    fn weights_scale_each_event_kind() {
        let weights = PopularityWeights::default();
        let now = 1_000_000_000;
        let ts = now - 60_000;
        let view = score(now, &weights, &[ts], &[], &[]);
        let comment = score(now, &weights, &[], &[ts], &[]);
        let like = score(now, &weights, &[], &[], &[ts]);
        assert!((comment / view - 2.0).abs() < 1e-9);
        assert!((like / view - 1.5).abs() < 1e-9);
    }
}
