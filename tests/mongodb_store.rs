//! RecordStore against a real MongoDB server
//!
//! Requires Docker. Run with `cargo test --features integration-tests`.

#![cfg(feature = "integration-tests")]

mod fixtures;

use bson::{Bson, Document, doc};
use fixtures::{connected, mongodb};
use futures::future::join_all;
use record_store::sequence::rec_num_of;
use record_store::{ConnectionProfile, RecordStore, SequencePolicy};
use rstest::rstest;
use std::collections::HashSet;
use testcontainers::{ContainerAsync, GenericImage};

fn rec_nums(records: &[Document]) -> Vec<i64> {
	records.iter().filter_map(rec_num_of).collect()
}

/// Test the full create/read/update/delete cycle
///
/// Verifies that:
/// 1. Sequential creates are numbered 1 then 2, stored as 32-bit integers
/// 2. Updates change only the named fields
/// 3. Deletes report how many records were removed
#[rstest]
#[tokio::test]
async fn test_crud_cycle(#[future] mongodb: (ContainerAsync<GenericImage>, ConnectionProfile)) {
	// Arrange
	let (_container, profile) = mongodb.await;
	let store = connected(&profile).await;

	// Act
	assert!(store.create(Some(doc! { "name": "Rex", "breed": "Boxer" })).await.unwrap());
	assert!(store.create(Some(doc! { "name": "Bella", "breed": "Beagle" })).await.unwrap());

	// Assert
	let records = store.read(doc! {}).await.collect_all().await;
	assert_eq!(rec_nums(&records), vec![1, 2]);
	assert_eq!(records[0].get("rec_num"), Some(&Bson::Int32(1)));

	let modified = store
		.update(doc! { "rec_num": 1 }, doc! { "name": "Fido" })
		.await
		.unwrap();
	assert_eq!(modified, 1);

	let fido = store.read(doc! { "rec_num": 1 }).await.collect_all().await;
	assert_eq!(fido[0].get_str("name").unwrap(), "Fido");
	assert_eq!(fido[0].get_str("breed").unwrap(), "Boxer");

	assert_eq!(
		store
			.update(doc! { "rec_num": 999 }, doc! { "name": "X" })
			.await
			.unwrap(),
		0
	);

	assert_eq!(store.delete(doc! { "rec_num": 1 }).await.unwrap(), 1);
	assert_eq!(store.delete(doc! { "rec_num": 1 }).await.unwrap(), 0);
}

/// Test that only integer-typed rec_num values drive numbering
#[rstest]
#[tokio::test]
async fn test_next_rec_num_ignores_malformed_values(
	#[future] mongodb: (ContainerAsync<GenericImage>, ConnectionProfile),
) {
	// Arrange
	let (_container, profile) = mongodb.await;
	let store = connected(&profile).await;
	store
		.collection()
		.inner()
		.insert_many(vec![
			doc! { "rec_num": 3 },
			doc! { "rec_num": "abc" },
			doc! { "rec_num": 7_i64 },
			doc! { "rec_num": 5 },
		])
		.await
		.unwrap();

	// Act
	let next = store.next_rec_num().await.unwrap();

	// Assert
	assert_eq!(next, 8);
}

/// Test read ordering and the empty result for unmatched queries
#[rstest]
#[tokio::test]
async fn test_read_orders_by_rec_num(
	#[future] mongodb: (ContainerAsync<GenericImage>, ConnectionProfile),
) {
	// Arrange
	let (_container, profile) = mongodb.await;
	let store = connected(&profile).await;
	store
		.collection()
		.inner()
		.insert_many(vec![
			doc! { "rec_num": 2 },
			doc! { "rec_num": 1 },
			doc! { "rec_num": 3 },
		])
		.await
		.unwrap();

	// Act
	let ordered = store.read(doc! {}).await.collect_all().await;
	let unmatched = store
		.read(doc! { "missing_field": "x" })
		.await
		.collect_all()
		.await;

	// Assert
	assert_eq!(rec_nums(&ordered), vec![1, 2, 3]);
	assert!(unmatched.is_empty());
}

/// Test that a malformed query is logged and read back as empty
#[rstest]
#[tokio::test]
async fn test_read_swallows_query_errors(
	#[future] mongodb: (ContainerAsync<GenericImage>, ConnectionProfile),
) {
	// Arrange
	let (_container, profile) = mongodb.await;
	let store = connected(&profile).await;
	store.create(Some(doc! { "name": "Rex" })).await.unwrap();
	let bad_query = doc! { "rec_num": { "$notAnOperator": 1 } };

	// Act
	let swallowed = store.read(bad_query.clone()).await.collect_all().await;
	let surfaced = store.try_read(bad_query).await;

	// Assert
	assert!(swallowed.is_empty());
	assert!(surfaced.is_err());
}

/// Test that concurrent creators never share a number under the counter policy
#[rstest]
#[tokio::test]
async fn test_counter_policy_is_unique_under_concurrency(
	#[future] mongodb: (ContainerAsync<GenericImage>, ConnectionProfile),
) {
	// Arrange
	let (_container, profile) = mongodb.await;
	let store = connected(&profile)
		.await
		.with_sequence_policy(SequencePolicy::counter());
	store.create(Some(doc! { "name": "seed" })).await.unwrap();

	// Act
	let outcomes = join_all(
		(0..20).map(|i| store.create(Some(doc! { "name": format!("animal-{}", i) }))),
	)
	.await;

	// Assert
	assert!(outcomes.iter().all(|outcome| matches!(outcome, Ok(true))));
	let numbers = rec_nums(&store.read(doc! {}).await.collect_all().await);
	let unique: HashSet<_> = numbers.iter().copied().collect();
	assert_eq!(numbers.len(), 21);
	assert_eq!(unique.len(), 21);
	assert_eq!(numbers.first(), Some(&1));
}

/// Test that wrong credentials surface on first use, not at construction
#[rstest]
#[tokio::test]
async fn test_bad_credentials_fail_lazily(
	#[future] mongodb: (ContainerAsync<GenericImage>, ConnectionProfile),
) {
	// Arrange
	let (_container, mut profile) = mongodb.await;
	profile.password = "wrong".to_string();

	// Act
	let store = RecordStore::connect(&profile).await;

	// Assert
	let store = store.expect("construction must not contact the server");
	assert!(store.health_check().await.is_err());
	assert!(store.delete(doc! {}).await.is_err());
}
