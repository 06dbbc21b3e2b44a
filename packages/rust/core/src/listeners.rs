//! Built-in traversal listeners.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use personlink_shared::{PersonConnection, PersonDetails, Result};
use personlink_storage::Storage;

use crate::events::TraversalListener;

/// Where [`DbInsertListener`] writes people and their connections.
#[async_trait]
pub trait PersonRepository: Send + Sync {
    async fn save_person(&self, person: &PersonDetails) -> Result<()>;
    async fn link_persons(&self, from: &PersonDetails, to: &PersonDetails, context: &str) -> Result<()>;
}

#[async_trait]
impl PersonRepository for Storage {
    async fn save_person(&self, person: &PersonDetails) -> Result<()> {
        Storage::save_person(self, person).await
    }

    async fn link_persons(&self, from: &PersonDetails, to: &PersonDetails, context: &str) -> Result<()> {
        Storage::link_persons(self, from, to, context).await
    }
}

/// Persists both ends of every found connection, then the edge between them.
pub struct DbInsertListener {
    repository: Arc<dyn PersonRepository>,
}

impl DbInsertListener {
    pub fn new(repository: Arc<dyn PersonRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl TraversalListener for DbInsertListener {
    fn name(&self) -> &str {
        "db-insert"
    }

    async fn on_connection_found(
        &self,
        person: &PersonDetails,
        connection: &PersonConnection,
    ) -> Result<()> {
        let other = &connection.connection_person;
        self.repository.save_person(person).await?;
        self.repository.save_person(other).await?;
        self.repository
            .link_persons(person, other, &connection.context)
            .await?;
        debug!(from = %person.url, to = %other.url, "connection saved");
        Ok(())
    }
}
