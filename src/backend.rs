//! Collection backend trait
//!
//! [`RecordCollection`] is the seam between [`crate::RecordStore`] and the
//! document database. The store only adds record numbering and result
//! shaping on top of it; filters and updates are forwarded unchanged.

use async_trait::async_trait;
use bson::Document;
use futures::stream::BoxStream;

use crate::error::Result;

/// Lazily produced query results
pub type RecordStream = BoxStream<'static, Result<Document>>;

/// Options for a find request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
	/// Sort specification (`{ field: 1 }` ascending, `{ field: -1 }` descending)
	pub sort: Option<Document>,

	/// Maximum number of documents to return
	pub limit: Option<i64>,
}

impl FindOptions {
	/// Create empty find options
	pub fn new() -> Self {
		Self::default()
	}

	/// Set the sort specification
	pub fn sort(mut self, sort: Document) -> Self {
		self.sort = Some(sort);
		self
	}

	/// Set the result limit
	pub fn limit(mut self, limit: i64) -> Self {
		self.limit = Some(limit);
		self
	}
}

/// Outcome of a multi-document update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
	/// Documents matched by the filter
	pub matched_count: u64,

	/// Documents whose contents actually changed
	pub modified_count: u64,
}

impl UpdateResult {
	pub fn new(matched_count: u64, modified_count: u64) -> Self {
		Self {
			matched_count,
			modified_count,
		}
	}
}

/// A single collection in a document database
///
/// # Example
///
/// ```rust,ignore
/// use record_store::backend::{FindOptions, RecordCollection};
/// use bson::doc;
///
/// async fn newest(coll: &dyn RecordCollection) -> record_store::Result<Vec<Document>> {
///     let stream = coll.find(doc! {}, FindOptions::new().sort(doc! { "rec_num": -1 }).limit(1)).await?;
///     stream.try_collect().await
/// }
/// ```
#[async_trait]
pub trait RecordCollection: Send + Sync {
	/// Name of the collection
	fn name(&self) -> &str;

	/// Finds documents matching the filter
	async fn find(&self, filter: Document, options: FindOptions) -> Result<RecordStream>;

	/// Inserts a document, returning whether the store acknowledged it
	async fn insert_one(&self, document: Document) -> Result<bool>;

	/// Applies an update document to every document matching the filter
	async fn update_many(&self, filter: Document, update: Document) -> Result<UpdateResult>;

	/// Deletes every document matching the filter, returning the deleted count
	async fn delete_many(&self, filter: Document) -> Result<u64>;

	/// Atomically advances the counter `key` stored in the `counters` collection
	///
	/// The counter is first raised to at least `floor` (created if missing),
	/// then incremented by one. Returns the incremented value.
	async fn increment_counter(&self, counters: &str, key: &str, floor: i64) -> Result<i64>;

	/// Checks that the store is reachable
	async fn ping(&self) -> Result<()>;
}
