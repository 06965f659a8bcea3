//! Forward-only query results
//!
//! A [`RecordCursor`] yields each matching record once, in the order the
//! store produced them. It cannot be rewound; re-issue the query to start
//! over. A store failure while iterating is logged and ends the sequence,
//! so iteration itself never fails.

use bson::Document;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::backend::RecordStream;

/// Single-pass sequence of records returned by [`crate::RecordStore::read`]
pub struct RecordCursor {
	stream: Option<RecordStream>,
	collection: String,
}

impl RecordCursor {
	pub(crate) fn new(stream: RecordStream, collection: impl Into<String>) -> Self {
		Self {
			stream: Some(stream),
			collection: collection.into(),
		}
	}

	/// A cursor that yields nothing
	pub fn empty() -> Self {
		Self {
			stream: None,
			collection: String::new(),
		}
	}

	/// Whether the cursor can produce no further records
	pub fn is_exhausted(&self) -> bool {
		self.stream.is_none()
	}

	/// Advance to the next record
	pub async fn next_record(&mut self) -> Option<Document> {
		self.next().await
	}

	/// Drain the remaining records into a `Vec`
	pub async fn collect_all(self) -> Vec<Document> {
		self.collect().await
	}
}

impl Stream for RecordCursor {
	type Item = Document;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		let Some(stream) = self.stream.as_mut() else {
			return Poll::Ready(None);
		};

		let polled = stream.as_mut().poll_next(cx);
		match polled {
			Poll::Pending => Poll::Pending,
			Poll::Ready(Some(Ok(document))) => Poll::Ready(Some(document)),
			Poll::Ready(Some(Err(err))) => {
				tracing::warn!(
					collection = %self.collection,
					error = %err,
					"Cursor failed mid-iteration; ending results early"
				);
				self.stream = None;
				Poll::Ready(None)
			}
			Poll::Ready(None) => {
				self.stream = None;
				Poll::Ready(None)
			}
		}
	}
}

impl std::fmt::Debug for RecordCursor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RecordCursor")
			.field("collection", &self.collection)
			.field("exhausted", &self.is_exhausted())
			.finish()
	}
}
