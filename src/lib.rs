//! # record-store
//!
//! CRUD access to a single MongoDB collection whose records are numbered
//! with an auto-incrementing `rec_num` field.
//!
//! ## Overview
//!
//! - [`RecordStore`]: create, read, update and delete on one collection
//! - [`ConnectionProfile`]: credentials, endpoint and collection binding
//! - [`SequencePolicy`]: how `rec_num` values are allocated
//! - [`RecordCollection`]: the collection backend trait, implemented by
//!   [`MongoCollection`] and, with the `test-utils` feature, the in-process
//!   `MemoryCollection`
//!
//! Filters and update documents use MongoDB's own query language and are
//! passed through without validation or escaping.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use record_store::{ConnectionProfile, RecordStore};
//! use bson::doc;
//!
//! # async fn example() -> record_store::Result<()> {
//! let profile = ConnectionProfile::from_file("profile.toml")?;
//! let store = RecordStore::connect(&profile).await?;
//!
//! store.create(Some(doc! { "name": "Rex", "animal_type": "Dog" })).await?;
//!
//! let mut dogs = store.read(doc! { "animal_type": "Dog" }).await;
//! while let Some(dog) = dogs.next_record().await {
//!     println!("{}", dog);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cursor;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod mongo;
pub mod profile;
pub mod sequence;
pub mod store;

pub use backend::{FindOptions, RecordCollection, RecordStream, UpdateResult};
pub use cursor::RecordCursor;
pub use error::{RecordStoreError, Result};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{FaultPoint, MemoryCollection};
pub use mongo::MongoCollection;
pub use profile::ConnectionProfile;
pub use sequence::{REC_NUM_FIELD, SequencePolicy};
pub use store::RecordStore;
