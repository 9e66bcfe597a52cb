//! Bulk loading of stores, latest statuses and tags.

use crate::errors::AppError;
use crate::models::{CongestionStatus, HashTag, Store};
use crate::query::QueryInterface;

/// Everything the view needs after a successful load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedData {
    pub stores: Vec<Store>,
    pub statuses: Vec<CongestionStatus>,
    pub tags: Vec<HashTag>,
}

/// Run the three catalog queries concurrently. Any failure fails the whole load.
pub async fn load(query: &dyn QueryInterface) -> Result<LoadedData, AppError> {
    let (store_rows, status_rows, catalog) = tokio::try_join!(
        query.list_stores(),
        query.latest_status_per_store(),
        query.list_tags_with_counts(),
    )
    .map_err(|err| {
        tracing::error!("Bulk load failed: {}", err);
        AppError::DataUnavailable(err.message())
    })?;

    let statuses = status_rows
        .into_iter()
        .map(CongestionStatus::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| {
            tracing::error!("Bulk load returned an invalid status row: {}", err);
            AppError::DataUnavailable(err.to_string())
        })?;

    let data = LoadedData {
        stores: store_rows.into_iter().map(Store::from).collect(),
        statuses,
        tags: catalog.into(),
    };

    tracing::info!(
        stores = data.stores.len(),
        statuses = data.statuses.len(),
        tags = data.tags.len(),
        "Loaded store catalog"
    );

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CongestionLevel;
    use crate::query::fake::{latest, FakeQuery};

    #[tokio::test]
    async fn test_load_shapes_all_three_sets() {
        let fake = FakeQuery::scenario();

        let data = load(&fake).await.unwrap();

        let ids: Vec<&str> = data.stores.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["C", "B", "A"]);
        assert!(data.stores.iter().all(|s| s.description.is_empty()));

        assert_eq!(data.statuses.len(), 2);
        let a = data.statuses.iter().find(|s| s.store_id == "A").unwrap();
        assert_eq!(a.status, CongestionLevel::Empty);
        assert_eq!(a.id, "A-2024-05-01T09:00:00.000000Z");

        let counts: Vec<(&str, i64)> = data.tags.iter().map(|t| (t.id.as_str(), t.count)).collect();
        assert_eq!(counts, vec![("tag1", 2), ("tag2", 1)]);
    }

    #[tokio::test]
    async fn test_any_failing_query_fails_the_load() {
        for op in ["list_stores", "latest_status_per_store", "list_tags_with_counts"] {
            let fake = FakeQuery::scenario();
            fake.fail(op);

            let err = load(&fake).await.unwrap_err();
            assert!(matches!(err, AppError::DataUnavailable(_)), "{} -> {:?}", op, err);
        }
    }

    #[tokio::test]
    async fn test_unknown_status_is_a_contract_violation() {
        let fake = FakeQuery::scenario();
        fake.latest.lock().unwrap().push(latest("C", "jammed"));

        let err = load(&fake).await.unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(_)));
    }
}
