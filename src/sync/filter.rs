//! Hashtag filtering of the store catalog.

use std::collections::HashSet;

use futures_util::future::try_join_all;

use crate::errors::AppError;
use crate::models::{Store, StoreRow};
use crate::query::QueryInterface;

/// Stores carrying any of `selected_tag_ids`.
///
/// An empty selection returns `all_stores` unchanged. Per-tag lookups run concurrently and
/// are folded into a union keyed by store id, in first-seen order. If any lookup fails the
/// filter degrades to `all_stores`.
pub async fn filter_by_tags(
    query: &dyn QueryInterface,
    all_stores: &[Store],
    selected_tag_ids: &[String],
) -> Vec<Store> {
    if selected_tag_ids.is_empty() {
        return all_stores.to_vec();
    }

    let lookups = selected_tag_ids
        .iter()
        .map(|tag_id| query.stores_for_tag(tag_id));

    match try_join_all(lookups).await {
        Ok(per_tag) => union_by_id(per_tag),
        Err(err) => {
            let degraded = AppError::FilterDegraded(err.message());
            tracing::warn!(tags = ?selected_tag_ids, "{}, showing all stores", degraded);
            all_stores.to_vec()
        }
    }
}

fn union_by_id(per_tag: Vec<Vec<StoreRow>>) -> Vec<Store> {
    let mut seen = HashSet::new();
    per_tag
        .into_iter()
        .flatten()
        .filter(|row| seen.insert(row.id.clone()))
        .map(Store::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::fake::FakeQuery;
    use crate::sync::loader::load;

    fn ids(stores: &[Store]) -> Vec<&str> {
        stores.iter().map(|s| s.id.as_str()).collect()
    }

    fn tags(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_selection_is_identity() {
        let fake = FakeQuery::scenario();
        let all = load(&fake).await.unwrap().stores;

        let filtered = filter_by_tags(&fake, &all, &[]).await;

        assert_eq!(filtered, all);
    }

    #[tokio::test]
    async fn test_single_tag() {
        let fake = FakeQuery::scenario();
        let all = load(&fake).await.unwrap().stores;

        let filtered = filter_by_tags(&fake, &all, &tags(&["tag1"])).await;

        assert_eq!(ids(&filtered), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_union_of_tags() {
        let fake = FakeQuery::scenario();
        let all = load(&fake).await.unwrap().stores;

        let filtered = filter_by_tags(&fake, &all, &tags(&["tag1", "tag2"])).await;

        assert_eq!(ids(&filtered), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_store_matching_several_tags_appears_once() {
        let fake = FakeQuery::scenario();
        let user = crate::models::User {
            id: "u1".to_string(),
            email: None,
        };
        fake.insert_tag_association("A", "tag2", &user).await.unwrap();
        let all = load(&fake).await.unwrap().stores;

        let filtered = filter_by_tags(&fake, &all, &tags(&["tag1", "tag2", "tag1"])).await;

        assert_eq!(ids(&filtered), vec!["A", "B", "C"]);
        let unique: HashSet<&str> = ids(&filtered).into_iter().collect();
        assert_eq!(unique.len(), filtered.len());
    }

    #[tokio::test]
    async fn test_results_are_associated_with_a_selected_tag() {
        let fake = FakeQuery::scenario();
        let all = load(&fake).await.unwrap().stores;
        let selected = tags(&["tag2"]);

        let filtered = filter_by_tags(&fake, &all, &selected).await;

        let associations = fake.associations.lock().unwrap().clone();
        for store in &filtered {
            assert!(associations
                .iter()
                .any(|a| a.store_id == store.id && selected.contains(&a.tag_id)));
        }
        assert_eq!(ids(&filtered), vec!["C"]);
    }

    #[tokio::test]
    async fn test_unknown_tag_yields_nothing() {
        let fake = FakeQuery::scenario();
        let all = load(&fake).await.unwrap().stores;

        let filtered = filter_by_tags(&fake, &all, &tags(&["nope"])).await;

        assert!(filtered.is_empty());
    }

    #[tokio::test]
    async fn test_failed_lookup_degrades_to_all_stores() {
        let fake = FakeQuery::scenario();
        let all = load(&fake).await.unwrap().stores;
        fake.fail("stores_for_tag");

        let filtered = filter_by_tags(&fake, &all, &tags(&["tag1"])).await;

        assert_eq!(filtered, all);
    }
}
