//! Quality Filter
//!
//! Scores the candidates of one provider response. The same heuristic is
//! applied whichever provider produced them:
//! 1. Landscape aspect ratio within `[min_aspect_ratio, max_aspect_ratio]`
//! 2. Width at least the provider category's minimum
//! 3. Among passing candidates, higher popularity first; ties keep the
//!    provider's own order
//!
//! If nothing passes, the provider's unfiltered first result is used rather
//! than discarding the provider.

use crate::config::QualityThresholds;
use crate::types::ImageCandidate;
use std::cmp::Ordering;

#[derive(Debug, Clone, Default)]
pub struct QualityFilter {
    thresholds: QualityThresholds,
}

impl QualityFilter {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Whether a candidate clears the quality bar
    ///
    /// Candidates with unknown dimensions do not.
    pub fn passes(&self, candidate: &ImageCandidate) -> bool {
        let Some(ratio) = candidate.aspect_ratio() else {
            return false;
        };
        let Some(width) = candidate.width else {
            return false;
        };

        let min_width = self.thresholds.min_width(candidate.provider.category());

        ratio >= self.thresholds.min_aspect_ratio
            && ratio <= self.thresholds.max_aspect_ratio
            && width >= min_width
    }

    /// Order a provider response best-first
    ///
    /// Passing candidates come first, by popularity (descending, missing
    /// counts as lowest), then the rest in their original order.
    pub fn rank(&self, candidates: Vec<ImageCandidate>) -> Vec<ImageCandidate> {
        let (mut passing, failing): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .filter(|c| !c.url.trim().is_empty())
            .partition(|c| self.passes(c));

        // Stable sort keeps provider order among equals
        passing.sort_by(|a, b| compare_popularity(b.popularity, a.popularity));

        passing.extend(failing);
        passing
    }

    /// Best candidate of a provider response, if any
    pub fn select(&self, candidates: Vec<ImageCandidate>) -> Option<ImageCandidate> {
        self.rank(candidates).into_iter().next()
    }
}

fn compare_popularity(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderKind;

    fn candidate(url: &str, provider: ProviderKind, w: u32, h: u32, pop: Option<f64>) -> ImageCandidate {
        ImageCandidate::new(url, provider)
            .with_dimensions(Some(w), Some(h))
            .with_popularity(pop)
    }

    #[test]
    fn test_landscape_wide_enough_passes() {
        let filter = QualityFilter::default();
        assert!(filter.passes(&candidate("a", ProviderKind::Pexels, 1920, 1080, None)));
    }

    #[test]
    fn test_portrait_fails() {
        let filter = QualityFilter::default();
        assert!(!filter.passes(&candidate("a", ProviderKind::Pexels, 1920, 2880, None)));
    }

    #[test]
    fn test_panorama_fails() {
        let filter = QualityFilter::default();
        assert!(!filter.passes(&candidate("a", ProviderKind::BraveImages, 4000, 1000, None)));
    }

    #[test]
    fn test_threshold_depends_on_category() {
        let filter = QualityFilter::default();
        // 1600 wide is too small for stock photos but fine for encyclopedic images
        assert!(!filter.passes(&candidate("a", ProviderKind::Unsplash, 1600, 1000, None)));
        assert!(filter.passes(&candidate("a", ProviderKind::Wikipedia, 1600, 1000, None)));
    }

    #[test]
    fn test_unknown_dimensions_fail() {
        let filter = QualityFilter::default();
        assert!(!filter.passes(&ImageCandidate::new("a", ProviderKind::Reddit)));
    }

    #[test]
    fn test_select_prefers_popularity_among_passing() {
        let filter = QualityFilter::default();
        let picked = filter
            .select(vec![
                candidate("small", ProviderKind::Unsplash, 800, 600, Some(1000.0)),
                candidate("ok", ProviderKind::Unsplash, 2400, 1600, Some(10.0)),
                candidate("best", ProviderKind::Unsplash, 2400, 1600, Some(50.0)),
            ])
            .unwrap();
        assert_eq!(picked.url, "best");
    }

    #[test]
    fn test_select_keeps_order_without_signal() {
        let filter = QualityFilter::default();
        let picked = filter
            .select(vec![
                candidate("first", ProviderKind::Pexels, 2400, 1600, None),
                candidate("second", ProviderKind::Pexels, 2400, 1600, None),
            ])
            .unwrap();
        assert_eq!(picked.url, "first");
    }

    #[test]
    fn test_select_falls_back_to_unfiltered_first() {
        let filter = QualityFilter::default();
        let picked = filter
            .select(vec![
                candidate("tiny", ProviderKind::Pexels, 300, 200, None),
                candidate("portrait", ProviderKind::Pexels, 2000, 3000, None),
            ])
            .unwrap();
        assert_eq!(picked.url, "tiny");
    }

    #[test]
    fn test_select_empty() {
        let filter = QualityFilter::default();
        assert!(filter.select(Vec::new()).is_none());
    }

    #[test]
    fn test_blank_urls_dropped() {
        let filter = QualityFilter::default();
        let ranked = filter.rank(vec![
            candidate(" ", ProviderKind::Pexels, 2400, 1600, None),
            candidate("real", ProviderKind::Pexels, 300, 200, None),
        ]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].url, "real");
    }

    #[test]
    fn test_rank_puts_passing_first() {
        let filter = QualityFilter::default();
        let ranked = filter.rank(vec![
            candidate("fail", ProviderKind::Flickr, 500, 400, Some(9999.0)),
            candidate("pass", ProviderKind::Flickr, 2048, 1365, Some(1.0)),
        ]);
        let urls: Vec<_> = ranked.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["pass", "fail"]);
    }
}
