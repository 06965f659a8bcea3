//! The record store
//!
//! [`RecordStore`] binds one collection and offers create, read, update and
//! delete on it, numbering every created record with `rec_num`.
//!
//! Failure handling differs per operation and is part of each contract:
//!
//! | Operation        | On store failure                                  |
//! |------------------|---------------------------------------------------|
//! | [`create`]       | insert `Ok(false)` (logged); allocation `Err`     |
//! | [`read`]         | logged, returns an empty cursor                   |
//! | [`try_read`]     | returned as `Err`                                 |
//! | [`update`]       | returned as `Err`                                 |
//! | [`delete`]       | returned as `Err`                                 |
//! | [`next_rec_num`] | returned as `Err`                                 |
//!
//! [`create`]: RecordStore::create
//! [`read`]: RecordStore::read
//! [`try_read`]: RecordStore::try_read
//! [`update`]: RecordStore::update
//! [`delete`]: RecordStore::delete
//! [`next_rec_num`]: RecordStore::next_rec_num
//!
//! # Example
//!
//! ```rust,no_run
//! use record_store::{ConnectionProfile, RecordStore};
//! use bson::doc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let profile = ConnectionProfile::new("aacuser", "pass", "localhost", 27017, "AAC", "animals");
//! let store = RecordStore::connect(&profile).await?;
//!
//! store.create(Some(doc! { "name": "Rex", "breed": "Boxer" })).await?;
//! let boxers = store.read(doc! { "breed": "Boxer" }).await.collect_all().await;
//! store.update(doc! { "rec_num": 1 }, doc! { "name": "Fido" }).await?;
//! store.delete(doc! { "rec_num": 1 }).await?;
//! # Ok(())
//! # }
//! ```

use bson::{Document, doc};
use mongodb::Client;

use crate::backend::{FindOptions, RecordCollection};
use crate::cursor::RecordCursor;
use crate::error::{RecordStoreError, Result};
use crate::mongo::MongoCollection;
use crate::profile::ConnectionProfile;
use crate::sequence::{REC_NUM_FIELD, SequencePolicy, rec_num_value};

/// CRUD access to one collection with auto-numbered records
pub struct RecordStore<C = MongoCollection> {
	collection: C,
	sequence: SequencePolicy,
}

impl RecordStore<MongoCollection> {
	/// Open a client for the profile and bind its database and collection
	///
	/// The server is not contacted here; use [`RecordStore::health_check`]
	/// to verify reachability up front.
	pub async fn connect(profile: &ConnectionProfile) -> Result<Self> {
		Ok(Self::new(MongoCollection::connect(profile).await?))
	}

	/// Bind a collection on an already-open client
	pub fn from_client(client: &Client, database: &str, collection: &str) -> Self {
		Self::new(MongoCollection::from_client(client, database, collection))
	}
}

impl<C: RecordCollection> RecordStore<C> {
	/// Wrap an open collection, numbering records with [`SequencePolicy::MaxPlusOne`]
	pub fn new(collection: C) -> Self {
		Self {
			collection,
			sequence: SequencePolicy::default(),
		}
	}

	/// Replace the record numbering policy
	pub fn with_sequence_policy(mut self, sequence: SequencePolicy) -> Self {
		self.sequence = sequence;
		self
	}

	/// The bound collection
	pub fn collection(&self) -> &C {
		&self.collection
	}

	/// The active record numbering policy
	pub fn sequence_policy(&self) -> &SequencePolicy {
		&self.sequence
	}

	/// Check that the store answers requests
	pub async fn health_check(&self) -> Result<()> {
		self.collection.ping().await
	}

	/// The `rec_num` the next created record would receive
	///
	/// Under [`SequencePolicy::MaxPlusOne`] this is the highest integer
	/// `rec_num` plus one (or 1), and concurrent callers may be handed the
	/// same value. Under [`SequencePolicy::Counter`] each call consumes a
	/// number.
	pub async fn next_rec_num(&self) -> Result<i64> {
		self.sequence.allocate(&self.collection).await
	}

	/// Insert a record, assigning it the next `rec_num`
	///
	/// Any `rec_num` in `record` is overwritten. Returns `Ok(true)` once the
	/// store acknowledges the insert and `Ok(false)` if the insert fails;
	/// that failure is logged, not returned.
	///
	/// # Errors
	///
	/// [`RecordStoreError::InvalidArgument`] if `record` is `None` or empty,
	/// and any error from allocating the `rec_num`. Nothing is inserted in
	/// either case.
	pub async fn create(&self, record: Option<Document>) -> Result<bool> {
		let Some(mut record) = record else {
			return Err(RecordStoreError::InvalidArgument(
				"Nothing to save, record is absent".to_string(),
			));
		};
		if record.is_empty() {
			return Err(RecordStoreError::InvalidArgument(
				"Nothing to save, record has no fields".to_string(),
			));
		}

		let rec_num = self.next_rec_num().await?;
		record.insert(REC_NUM_FIELD, rec_num_value(rec_num));

		match self.collection.insert_one(record).await {
			Ok(acknowledged) => {
				tracing::debug!(
					collection = self.collection.name(),
					rec_num,
					acknowledged,
					"Inserted record"
				);
				Ok(acknowledged)
			}
			Err(err) => {
				tracing::warn!(
					collection = self.collection.name(),
					rec_num,
					error = %err,
					"Insert failed"
				);
				Ok(false)
			}
		}
	}

	/// Records matching `query`, in ascending `rec_num` order
	///
	/// If the query fails the error is logged and an empty cursor is
	/// returned, which callers cannot tell apart from "no matches". Use
	/// [`RecordStore::try_read`] to observe the failure.
	pub async fn read(&self, query: Document) -> RecordCursor {
		match self.try_read(query).await {
			Ok(cursor) => cursor,
			Err(err) => {
				tracing::error!(
					collection = self.collection.name(),
					error = %err,
					"Query failed"
				);
				RecordCursor::empty()
			}
		}
	}

	/// Records matching `query`, in ascending `rec_num` order, failing on store errors
	pub async fn try_read(&self, query: Document) -> Result<RecordCursor> {
		tracing::debug!(collection = self.collection.name(), ?query, "Reading records");

		let stream = self
			.collection
			.find(query, FindOptions::new().sort(doc! { "rec_num": 1 }))
			.await?;
		Ok(RecordCursor::new(stream, self.collection.name()))
	}

	/// Set `changed_fields` on every record matching `query`
	///
	/// Fields not named in `changed_fields` are left as they are. Returns
	/// how many records changed; matches already holding the target values
	/// are not counted. An empty `query` matches every record.
	pub async fn update(&self, query: Document, changed_fields: Document) -> Result<u64> {
		let result = self
			.collection
			.update_many(query, doc! { "$set": changed_fields })
			.await?;

		tracing::debug!(
			collection = self.collection.name(),
			matched = result.matched_count,
			modified = result.modified_count,
			"Updated records"
		);
		Ok(result.modified_count)
	}

	/// Remove every record matching `query`, returning how many were removed
	///
	/// An empty `query` removes every record.
	pub async fn delete(&self, query: Document) -> Result<u64> {
		let deleted = self.collection.delete_many(query).await?;

		tracing::debug!(
			collection = self.collection.name(),
			deleted,
			"Deleted records"
		);
		Ok(deleted)
	}
}
