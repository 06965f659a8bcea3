//! MongoDB collection backend
//!
//! [`MongoCollection`] implements [`RecordCollection`] over a
//! `mongodb::Collection<Document>`. Filters and update documents are handed
//! to the driver unchanged.
//!
//! # Example
//!
//! ```rust,no_run
//! use record_store::{ConnectionProfile, MongoCollection};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let profile = ConnectionProfile::new("aacuser", "pass", "localhost", 27017, "AAC", "animals");
//! let collection = MongoCollection::connect(&profile).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::stream::{StreamExt, TryStreamExt};
use mongodb::options::{
	ClientOptions, FindOneAndUpdateOptions, ReturnDocument, UpdateOptions,
};
use mongodb::{Client, Collection, Database};

use crate::backend::{FindOptions, RecordCollection, RecordStream, UpdateResult};
use crate::error::{RecordStoreError, Result};
use crate::profile::ConnectionProfile;

/// A MongoDB collection reached through a driver client
///
/// The client keeps its own connection pool; cloning shares it.
#[derive(Clone)]
pub struct MongoCollection {
	database: Database,
	collection: Collection<Document>,
}

impl MongoCollection {
	/// Open a client for the profile and bind its database and collection
	///
	/// No request is sent here; an unreachable server surfaces on first use.
	pub async fn connect(profile: &ConnectionProfile) -> Result<Self> {
		let options = ClientOptions::parse(profile.to_url())
			.await
			.map_err(|e| RecordStoreError::Connection(e.to_string()))?;

		let client = Client::with_options(options)
			.map_err(|e| RecordStoreError::Connection(e.to_string()))?;

		tracing::debug!(
			host = %profile.host,
			port = profile.port,
			database = %profile.database,
			collection = %profile.collection,
			"Opened MongoDB client"
		);

		Ok(Self::from_client(
			&client,
			&profile.database,
			&profile.collection,
		))
	}

	/// Bind a collection on an existing client
	pub fn from_client(client: &Client, database: &str, collection: &str) -> Self {
		let database = client.database(database);
		let collection = database.collection::<Document>(collection);
		Self {
			database,
			collection,
		}
	}

	/// The underlying driver collection
	pub fn inner(&self) -> &Collection<Document> {
		&self.collection
	}
}

#[async_trait]
impl RecordCollection for MongoCollection {
	fn name(&self) -> &str {
		self.collection.name()
	}

	async fn find(&self, filter: Document, options: FindOptions) -> Result<RecordStream> {
		let mut mongo_options = mongodb::options::FindOptions::default();
		mongo_options.sort = options.sort;
		mongo_options.limit = options.limit;

		let cursor = self
			.collection
			.find(filter)
			.with_options(mongo_options)
			.await?;

		Ok(cursor.map_err(RecordStoreError::from).boxed())
	}

	async fn insert_one(&self, document: Document) -> Result<bool> {
		// The Rust driver only returns a result once the write concern is satisfied
		self.collection.insert_one(document).await?;
		Ok(true)
	}

	async fn update_many(&self, filter: Document, update: Document) -> Result<UpdateResult> {
		let result = self.collection.update_many(filter, update).await?;
		Ok(UpdateResult::new(result.matched_count, result.modified_count))
	}

	async fn delete_many(&self, filter: Document) -> Result<u64> {
		let result = self.collection.delete_many(filter).await?;
		Ok(result.deleted_count)
	}

	async fn increment_counter(&self, counters: &str, key: &str, floor: i64) -> Result<i64> {
		let counters = self.database.collection::<Document>(counters);

		let mut seed_options = UpdateOptions::default();
		seed_options.upsert = Some(true);
		counters
			.update_one(doc! { "_id": key }, doc! { "$max": { "seq": floor } })
			.with_options(seed_options)
			.await?;

		let mut options = FindOneAndUpdateOptions::default();
		options.upsert = Some(true);
		options.return_document = Some(ReturnDocument::After);
		let counter = counters
			.find_one_and_update(doc! { "_id": key }, doc! { "$inc": { "seq": 1_i64 } })
			.with_options(options)
			.await?
			.ok_or_else(|| {
				RecordStoreError::Operation(format!("Counter '{}' vanished during increment", key))
			})?;

		match counter.get("seq") {
			Some(Bson::Int64(seq)) => Ok(*seq),
			Some(Bson::Int32(seq)) => Ok(i64::from(*seq)),
			other => Err(RecordStoreError::Operation(format!(
				"Counter '{}' holds a non-integer value: {:?}",
				key, other
			))),
		}
	}

	async fn ping(&self) -> Result<()> {
		self.database
			.run_command(doc! { "ping": 1 })
			.await
			.map_err(|e| RecordStoreError::Connection(format!("Health check failed: {}", e)))?;
		Ok(())
	}
}
