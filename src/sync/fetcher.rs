//! Page-length driven pagination
//!
//! The members API sends no "last page" marker. A page shorter than the
//! requested size (including an empty one) ends the walk; any error ends it
//! too, and whatever was accumulated is handed back alongside the error.

use super::client::MemberSource;
use super::error::FetchError;
use super::types::RawMember;

/// Records gathered for one (unit, status) pair
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub records: Vec<RawMember>,
    /// Set when the walk ended on an error instead of a short page
    pub error: Option<FetchError>,
    pub pages_fetched: u32,
}

impl FetchOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Fetch every page of one status partition
pub async fn fetch_all(source: &dyn MemberSource, status: &str, page_size: usize) -> FetchOutcome {
    let mut outcome = FetchOutcome::default();

    if page_size == 0 {
        outcome.error = Some(FetchError::InvalidPageSize(page_size));
        return outcome;
    }

    let mut page: u32 = 1;
    loop {
        match source.fetch_page(status, page, page_size).await {
            Ok(batch) => {
                let received = batch.len();
                outcome.records.extend(batch);
                outcome.pages_fetched += 1;

                log::debug!(
                    "📄 {} page {}: {} records (total {})",
                    status,
                    page,
                    received,
                    outcome.records.len()
                );

                if received < page_size {
                    break;
                }
                page += 1;
            }
            Err(e) => {
                log::warn!(
                    "⚠️  Stopped {} pagination at page {} with {} records kept: {}",
                    status,
                    page,
                    outcome.records.len(),
                    e
                );
                outcome.error = Some(e);
                break;
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{raw_members, ScriptedSource};

    #[tokio::test]
    async fn test_stops_on_short_page() {
        // 500 + 200 with page size 500: two requests, 700 records
        let source = ScriptedSource::new().with_pages("active", vec![Ok(raw_members("a", 500)), Ok(raw_members("b", 200))]);

        let outcome = fetch_all(&source, "active", 500).await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.records.len(), 700);
        assert_eq!(outcome.pages_fetched, 2);
        assert_eq!(source.requests("active"), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_exact_multiple_needs_empty_page() {
        let source = ScriptedSource::new().with_pages(
            "active",
            vec![Ok(raw_members("a", 3)), Ok(raw_members("b", 3)), Ok(Vec::new())],
        );

        let outcome = fetch_all(&source, "active", 3).await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.records.len(), 6);
        assert_eq!(source.requests("active"), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_empty_first_page() {
        let source = ScriptedSource::new();

        let outcome = fetch_all(&source, "inactive", 500).await;

        assert!(outcome.is_complete());
        assert!(outcome.records.is_empty());
        assert_eq!(source.requests("inactive"), vec![1]);
    }

    #[tokio::test]
    async fn test_error_keeps_accumulated_records() {
        let source = ScriptedSource::new().with_pages(
            "active",
            vec![
                Ok(raw_members("a", 500)),
                Err(FetchError::Timeout(std::time::Duration::from_secs(30))),
                Ok(raw_members("never", 10)),
            ],
        );

        let outcome = fetch_all(&source, "active", 500).await;

        assert_eq!(outcome.records.len(), 500);
        assert!(matches!(outcome.error, Some(FetchError::Timeout(_))));
        assert_eq!(source.requests("active"), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_zero_page_size_rejected_without_requests() {
        let source = ScriptedSource::new().with_pages("active", vec![Ok(Vec::new())]);

        let outcome = fetch_all(&source, "active", 0).await;

        assert_eq!(outcome.error, Some(FetchError::InvalidPageSize(0)));
        assert!(source.requests("active").is_empty());
    }
}
