//! In-process collection backend
//!
//! [`MemoryCollection`] keeps documents in a `Vec` behind a mutex and
//! evaluates the subset of the MongoDB query language that
//! [`crate::RecordStore`] issues:
//!
//! - filters: top-level equality (numeric values compare across integer
//!   and double types) and `$type` with `"int"`, `"long"`, `"double"`,
//!   `"number"`, `"string"`, `"bool"` or an array of those
//! - updates: `$set` on top-level fields
//! - find options: a single-field sort and a limit
//!
//! Anything else fails with [`RecordStoreError::UnsupportedQuery`].
//! Faults can be injected per operation with [`MemoryCollection::inject_fault`].

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::backend::{FindOptions, RecordCollection, RecordStream, UpdateResult};
use crate::error::{RecordStoreError, Result};
use crate::sequence::exhausted;

/// Operation that an injected fault applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
	Find,
	Insert,
	Update,
	Delete,
}

#[derive(Default)]
struct State {
	documents: Vec<Document>,
	counters: HashMap<(String, String), i64>,
	faults: HashMap<FaultPoint, String>,
}

impl State {
	fn take_fault(&mut self, point: FaultPoint) -> Result<()> {
		match self.faults.remove(&point) {
			Some(message) => Err(RecordStoreError::Operation(message)),
			None => Ok(()),
		}
	}
}

/// A collection held in memory
pub struct MemoryCollection {
	name: String,
	state: Mutex<State>,
}

impl MemoryCollection {
	/// Create an empty collection
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			state: Mutex::new(State::default()),
		}
	}

	/// Create a collection holding `documents` as-is
	pub fn with_documents(name: impl Into<String>, documents: Vec<Document>) -> Self {
		let collection = Self::new(name);
		collection.state.lock().documents = documents;
		collection
	}

	/// Make the next call of `point` fail with an operation error carrying `message`
	pub fn inject_fault(&self, point: FaultPoint, message: impl Into<String>) {
		self.state.lock().faults.insert(point, message.into());
	}

	/// Snapshot of the stored documents in insertion order
	pub fn documents(&self) -> Vec<Document> {
		self.state.lock().documents.clone()
	}

	/// Number of stored documents
	pub fn len(&self) -> usize {
		self.state.lock().documents.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[async_trait]
impl RecordCollection for MemoryCollection {
	fn name(&self) -> &str {
		&self.name
	}

	async fn find(&self, filter: Document, options: FindOptions) -> Result<RecordStream> {
		let mut state = self.state.lock();
		state.take_fault(FaultPoint::Find)?;

		let mut found = Vec::new();
		for document in &state.documents {
			if matches(document, &filter)? {
				found.push(document.clone());
			}
		}

		if let Some(sort) = &options.sort {
			let (field, direction) = sort_key(sort)?;
			found.sort_by(|a, b| {
				let ordering = compare_values(a.get(field), b.get(field));
				if direction < 0 {
					ordering.reverse()
				} else {
					ordering
				}
			});
		}

		if let Some(limit) = options.limit.filter(|limit| *limit > 0) {
			found.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
		}

		Ok(stream::iter(found.into_iter().map(Ok)).boxed())
	}

	async fn insert_one(&self, mut document: Document) -> Result<bool> {
		let mut state = self.state.lock();
		state.take_fault(FaultPoint::Insert)?;

		if !document.contains_key("_id") {
			document.insert("_id", ObjectId::new());
		}
		state.documents.push(document);
		Ok(true)
	}

	async fn update_many(&self, filter: Document, update: Document) -> Result<UpdateResult> {
		let mut state = self.state.lock();
		state.take_fault(FaultPoint::Update)?;

		let changes = set_fields(&update)?;

		let mut targets = Vec::new();
		for (index, document) in state.documents.iter().enumerate() {
			if matches(document, &filter)? {
				targets.push(index);
			}
		}

		let mut result = UpdateResult::new(targets.len() as u64, 0);
		for index in targets {
			let document = &mut state.documents[index];
			let mut modified = false;
			for (field, value) in changes {
				if document.get(field) != Some(value) {
					document.insert(field.clone(), value.clone());
					modified = true;
				}
			}
			if modified {
				result.modified_count += 1;
			}
		}

		Ok(result)
	}

	async fn delete_many(&self, filter: Document) -> Result<u64> {
		let mut state = self.state.lock();
		state.take_fault(FaultPoint::Delete)?;

		let mut keep = Vec::with_capacity(state.documents.len());
		for document in &state.documents {
			keep.push(!matches(document, &filter)?);
		}

		let before = state.documents.len();
		let mut flags = keep.into_iter();
		state.documents.retain(|_| flags.next().unwrap_or(true));
		Ok((before - state.documents.len()) as u64)
	}

	async fn increment_counter(&self, counters: &str, key: &str, floor: i64) -> Result<i64> {
		let mut state = self.state.lock();
		let seq = state
			.counters
			.entry((counters.to_string(), key.to_string()))
			.or_insert(floor);
		*seq = (*seq).max(floor).checked_add(1).ok_or_else(exhausted)?;
		Ok(*seq)
	}

	async fn ping(&self) -> Result<()> {
		Ok(())
	}
}

fn matches(document: &Document, filter: &Document) -> Result<bool> {
	for (field, condition) in filter {
		if field.starts_with('$') {
			return Err(RecordStoreError::UnsupportedQuery(format!(
				"top-level operator '{}'",
				field
			)));
		}

		let value = document.get(field);
		match condition {
			Bson::Document(operators) if is_operator_document(operators) => {
				for (operator, argument) in operators {
					let satisfied = match operator.as_str() {
						"$type" => type_matches(value, argument)?,
						other => {
							return Err(RecordStoreError::UnsupportedQuery(format!(
								"filter operator '{}'",
								other
							)));
						}
					};
					if !satisfied {
						return Ok(false);
					}
				}
			}
			expected => {
				if !value.is_some_and(|value| values_equal(value, expected)) {
					return Ok(false);
				}
			}
		}
	}
	Ok(true)
}

fn is_operator_document(document: &Document) -> bool {
	document.keys().next().is_some_and(|key| key.starts_with('$'))
}

fn type_matches(value: Option<&Bson>, alias: &Bson) -> Result<bool> {
	let Some(value) = value else {
		return Ok(false);
	};

	match alias {
		Bson::String(alias) => {
			let matched = match alias.as_str() {
				"int" => matches!(value, Bson::Int32(_)),
				"long" => matches!(value, Bson::Int64(_)),
				"double" => matches!(value, Bson::Double(_)),
				"number" => matches!(value, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)),
				"string" => matches!(value, Bson::String(_)),
				"bool" => matches!(value, Bson::Boolean(_)),
				other => {
					return Err(RecordStoreError::UnsupportedQuery(format!(
						"$type alias '{}'",
						other
					)));
				}
			};
			Ok(matched)
		}
		Bson::Array(aliases) => {
			for alias in aliases {
				if type_matches(Some(value), alias)? {
					return Ok(true);
				}
			}
			Ok(false)
		}
		other => Err(RecordStoreError::UnsupportedQuery(format!(
			"$type argument {}",
			other
		))),
	}
}

fn numeric(value: &Bson) -> Option<f64> {
	match value {
		Bson::Int32(v) => Some(f64::from(*v)),
		Bson::Int64(v) => Some(*v as f64),
		Bson::Double(v) => Some(*v),
		_ => None,
	}
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
	match (numeric(a), numeric(b)) {
		(Some(x), Some(y)) => x == y,
		_ => a == b,
	}
}

/// Cross-type ordering rank, following BSON comparison order
fn type_rank(value: Option<&Bson>) -> u8 {
	match value {
		None | Some(Bson::Null) => 1,
		Some(Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => 2,
		Some(Bson::String(_)) => 3,
		Some(Bson::Document(_)) => 4,
		Some(Bson::Array(_)) => 5,
		Some(Bson::ObjectId(_)) => 7,
		Some(Bson::Boolean(_)) => 8,
		Some(Bson::DateTime(_)) => 9,
		Some(_) => 10,
	}
}

fn compare_values(a: Option<&Bson>, b: Option<&Bson>) -> Ordering {
	let rank = type_rank(a).cmp(&type_rank(b));
	if rank != Ordering::Equal {
		return rank;
	}

	match (a, b) {
		(Some(Bson::String(x)), Some(Bson::String(y))) => x.cmp(y),
		(Some(Bson::Boolean(x)), Some(Bson::Boolean(y))) => x.cmp(y),
		(Some(x), Some(y)) => match (numeric(x), numeric(y)) {
			(Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
			_ => Ordering::Equal,
		},
		_ => Ordering::Equal,
	}
}

fn sort_key(sort: &Document) -> Result<(&str, i64)> {
	let mut fields = sort.iter();
	let (Some((field, direction)), None) = (fields.next(), fields.next()) else {
		return Err(RecordStoreError::UnsupportedQuery(
			"sort must name exactly one field".to_string(),
		));
	};

	let direction = match direction {
		Bson::Int32(d) => i64::from(*d),
		Bson::Int64(d) => *d,
		other => {
			return Err(RecordStoreError::UnsupportedQuery(format!(
				"sort direction {}",
				other
			)));
		}
	};
	Ok((field.as_str(), direction))
}

fn set_fields(update: &Document) -> Result<&Document> {
	let mut set = None;
	for (operator, fields) in update {
		match (operator.as_str(), fields) {
			("$set", Bson::Document(fields)) => set = Some(fields),
			(other, _) => {
				return Err(RecordStoreError::UnsupportedQuery(format!(
					"update operator '{}'",
					other
				)));
			}
		}
	}

	let fields = set.ok_or_else(|| {
		RecordStoreError::UnsupportedQuery("update without $set".to_string())
	})?;
	if let Some(dotted) = fields.keys().find(|field| field.contains('.')) {
		return Err(RecordStoreError::UnsupportedQuery(format!(
			"nested field path '{}'",
			dotted
		)));
	}
	Ok(fields)
}
