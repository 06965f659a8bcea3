//! MongoDB Test Fixtures
//!
//! Starts a MongoDB 7.0 container with a root user so that connection
//! profiles carry real credentials.

use record_store::{ConnectionProfile, RecordStore};
use rstest::*;
use testcontainers::{
	ContainerAsync, GenericImage, ImageExt,
	core::{IntoContainerPort, WaitFor},
	runners::AsyncRunner,
};

pub const USERNAME: &str = "aacuser";
pub const PASSWORD: &str = "s3cret-pw";
pub const DATABASE: &str = "AAC";

async fn try_start_mongodb_container()
-> Result<(ContainerAsync<GenericImage>, u16), Box<dyn std::error::Error>> {
	let mongo = GenericImage::new("mongo", "7.0")
		.with_exposed_port(27017.tcp())
		.with_wait_for(WaitFor::message_on_stdout("Waiting for connections"))
		.with_env_var("MONGO_INITDB_ROOT_USERNAME", USERNAME)
		.with_env_var("MONGO_INITDB_ROOT_PASSWORD", PASSWORD)
		.with_startup_timeout(std::time::Duration::from_secs(60))
		.start()
		.await?;

	let port = mongo.get_host_port_ipv4(27017).await?;
	Ok((mongo, port))
}

/// Fixture providing a MongoDB container and a profile for the `animals` collection
#[fixture]
pub async fn mongodb() -> (ContainerAsync<GenericImage>, ConnectionProfile) {
	const MAX_RETRIES: u32 = 3;
	const RETRY_DELAY_MS: u64 = 2000;

	let mut last_error = None;

	for attempt in 0..MAX_RETRIES {
		match try_start_mongodb_container().await {
			Ok((container, port)) => {
				let profile =
					ConnectionProfile::new(USERNAME, PASSWORD, "127.0.0.1", port, DATABASE, "animals");
				return (container, profile);
			}
			Err(e) => {
				eprintln!(
					"MongoDB container start attempt {} of {} failed: {:?}",
					attempt + 1,
					MAX_RETRIES,
					e
				);
				last_error = Some(e);

				if attempt < MAX_RETRIES - 1 {
					tokio::time::sleep(std::time::Duration::from_millis(RETRY_DELAY_MS)).await;
				}
			}
		}
	}

	panic!(
		"Failed to start MongoDB container after {} attempts: {:?}",
		MAX_RETRIES, last_error
	);
}

/// Connected store, verified with a ping
pub async fn connected(profile: &ConnectionProfile) -> RecordStore {
	let store = RecordStore::connect(profile)
		.await
		.expect("Failed to create record store");
	store
		.health_check()
		.await
		.expect("MongoDB did not answer ping");
	store
}
