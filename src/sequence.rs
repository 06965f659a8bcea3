//! Record number allocation
//!
//! Every record created through [`crate::RecordStore`] gets a `rec_num`.
//! How the next value is chosen is decided by a [`SequencePolicy`].

use bson::{Bson, Document, doc};
use futures::TryStreamExt;

use crate::backend::{FindOptions, RecordCollection};
use crate::error::{RecordStoreError, Result};

/// Field holding the record number
pub const REC_NUM_FIELD: &str = "rec_num";

/// Default collection for counter documents
pub const DEFAULT_COUNTER_COLLECTION: &str = "counters";

/// Strategy for allocating `rec_num` values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SequencePolicy {
	/// Highest integer `rec_num` in the collection plus one
	///
	/// Two creators running concurrently can read the same maximum and
	/// hand out the same number. Nothing in the store rejects the duplicate.
	#[default]
	MaxPlusOne,

	/// Atomic increment of a counter document in `collection`
	///
	/// The counter is keyed by the bound collection's name and never falls
	/// below the highest existing integer `rec_num`, so it can be switched
	/// on for a collection that already holds numbered records.
	Counter { collection: String },
}

impl SequencePolicy {
	/// Counter policy using the default counter collection
	pub fn counter() -> Self {
		SequencePolicy::Counter {
			collection: DEFAULT_COUNTER_COLLECTION.to_string(),
		}
	}

	/// Allocate the next record number for `collection`
	pub async fn allocate(&self, collection: &dyn RecordCollection) -> Result<i64> {
		let highest = highest_rec_num(collection).await?;
		match self {
			SequencePolicy::MaxPlusOne => match highest {
				None => Ok(1),
				Some(highest) => highest.checked_add(1).ok_or_else(exhausted),
			},
			SequencePolicy::Counter {
				collection: counters,
			} => {
				collection
					.increment_counter(counters, collection.name(), highest.unwrap_or(0))
					.await
			}
		}
	}
}

/// Error for a collection whose highest `rec_num` is `i64::MAX`
pub(crate) fn exhausted() -> RecordStoreError {
	RecordStoreError::Operation("rec_num space exhausted".to_string())
}

/// Highest integer-typed `rec_num`, ignoring values of any other type
pub async fn highest_rec_num(collection: &dyn RecordCollection) -> Result<Option<i64>> {
	let mut newest = collection
		.find(
			doc! { "rec_num": { "$type": ["int", "long"] } },
			FindOptions::new().sort(doc! { "rec_num": -1 }).limit(1),
		)
		.await?;

	let Some(record) = newest.try_next().await? else {
		return Ok(None);
	};
	Ok(rec_num_of(&record))
}

/// Integer `rec_num` of a record, if it has one
pub fn rec_num_of(record: &Document) -> Option<i64> {
	match record.get(REC_NUM_FIELD) {
		Some(Bson::Int32(n)) => Some(i64::from(*n)),
		Some(Bson::Int64(n)) => Some(*n),
		_ => None,
	}
}

/// BSON value for a record number, 32-bit when it fits
pub fn rec_num_value(rec_num: i64) -> Bson {
	match i32::try_from(rec_num) {
		Ok(n) => Bson::Int32(n),
		Err(_) => Bson::Int64(rec_num),
	}
}
