//! User timeline aggregation
//!
//! One query per [`EventType`] is dispatched concurrently. The join fails on
//! the first category error and drops every other result.

use std::future::Future;

use futures_util::future::try_join_all;
use tracing::warn;

use crate::decode::decode_result;
use crate::projection::project_events;
use crate::types::{EventItem, EventType, QueryResult};
use crate::{InsightsError, Result};

/// Run `fetch` for every category's request concurrently and wait for all
/// of them. Results keep the order of `requests`.
pub async fn join_categories<T, F, Fut>(
    requests: Vec<(EventType, T)>,
    fetch: F,
) -> Result<Vec<(EventType, QueryResult)>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<QueryResult>>,
{
    let requests = requests.into_iter().map(|(category, request)| {
        let request = fetch(request);
        async move {
            match request.await {
                Ok(result) => Ok((category, result)),
                Err(e) => {
                    warn!(category = %category, error = %e, "Timeline query failed");
                    Err(InsightsError::Aggregation {
                        category,
                        source: Box::new(e),
                    })
                }
            }
        }
    });

    try_join_all(requests).await
}

/// Decode and tag every category's rows, then order newest first.
/// Equal timestamps keep category order.
pub fn merge_timeline(results: &[(EventType, QueryResult)]) -> Result<Vec<EventItem>> {
    let mut events = Vec::new();

    for (category, result) in results {
        let rows = decode_result(result)?;
        events.extend(project_events(&rows, *category)?);
    }

    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Column, Table};
    use serde_json::json;

    fn events_result(timestamps: &[&str]) -> QueryResult {
        QueryResult {
            tables: vec![Table {
                name: Some("PrimaryResult".to_string()),
                columns: vec![
                    Column::new("timestamp", "datetime"),
                    Column::new("name", "string"),
                ],
                rows: timestamps
                    .iter()
                    .map(|ts| vec![json!(ts), json!(format!("event at {}", ts))])
                    .collect(),
            }],
        }
    }

    #[test]
    fn test_merge_sorts_descending() {
        let results = vec![
            (EventType::PageView, events_result(&["2024-05-01T10:00:00Z"])),
            (EventType::CustomEvent, events_result(&["2024-05-01T10:30:00Z"])),
            (EventType::Error, events_result(&["2024-05-01T09:45:00Z"])),
            (EventType::Crash, events_result(&["2024-05-01T10:15:00Z"])),
        ];

        let timeline = merge_timeline(&results).unwrap();
        let order: Vec<EventType> = timeline.iter().map(|e| e.event_type).collect();

        assert_eq!(
            order,
            vec![
                EventType::CustomEvent,
                EventType::Crash,
                EventType::PageView,
                EventType::Error
            ]
        );
        assert!(timeline.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
    }

    #[test]
    fn test_equal_timestamps_keep_category_order() {
        let ts = "2024-05-01T10:00:00Z";
        let results: Vec<_> = EventType::ALL
            .iter()
            .map(|c| (*c, events_result(&[ts])))
            .collect();

        let timeline = merge_timeline(&results).unwrap();
        let order: Vec<EventType> = timeline.iter().map(|e| e.event_type).collect();

        assert_eq!(order, EventType::ALL.to_vec());
    }

    fn every_category() -> Vec<(EventType, EventType)> {
        EventType::ALL.iter().map(|c| (*c, *c)).collect()
    }

    #[tokio::test]
    async fn test_join_preserves_category_order() {
        let joined = join_categories(every_category(), |category| async move {
            // Later categories finish first
            let delay = match category {
                EventType::PageView => 30,
                EventType::CustomEvent => 20,
                EventType::Error => 10,
                EventType::Crash => 0,
            };
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            Ok(events_result(&[]))
        })
        .await
        .unwrap();

        let order: Vec<EventType> = joined.iter().map(|(c, _)| *c).collect();
        assert_eq!(order, EventType::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_join_runs_categories_together() {
        use std::sync::Arc;
        use tokio::sync::Barrier;

        // Each fetch only completes once all four are in flight
        let barrier = Arc::new(Barrier::new(EventType::ALL.len()));
        let joined = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            join_categories(every_category(), |_| {
                let barrier = barrier.clone();
                async move {
                    barrier.wait().await;
                    Ok(events_result(&[]))
                }
            }),
        )
        .await
        .expect("categories were fetched one at a time")
        .unwrap();

        assert_eq!(joined.len(), 4);
    }

    #[tokio::test]
    async fn test_join_fails_on_any_category() {
        let err = join_categories(every_category(), |category| async move {
            if category == EventType::Error {
                Err(InsightsError::Transport("503 Service Unavailable".to_string()))
            } else {
                Ok(events_result(&["2024-05-01T10:00:00Z"]))
            }
        })
        .await
        .unwrap_err();

        match err {
            InsightsError::Aggregation { category, source } => {
                assert_eq!(category, EventType::Error);
                assert!(matches!(*source, InsightsError::Transport(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_merge_propagates_parse_failure() {
        let results = vec![(EventType::PageView, events_result(&["not a time"]))];
        assert!(matches!(
            merge_timeline(&results),
            Err(InsightsError::Parse { .. })
        ));
    }
}
