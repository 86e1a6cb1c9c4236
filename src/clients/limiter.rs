//! Concurrency Limiter
//!
//! Bounds how many `get_resources` calls run against the wrapped client at
//! once. Waiting callers block until a slot frees up; the slot is released
//! when the delegate call returns, whatever the outcome.

use super::tagging::ResourceDiscovery;
use crate::error::TaggingError;
use crate::model::{Job, TaggedResource};
use async_trait::async_trait;
use tokio::sync::Semaphore;

pub struct LimitedConcurrencyClient<C> {
    client: C,
    capacity: usize,
    sem: Semaphore,
}

impl<C: ResourceDiscovery> LimitedConcurrencyClient<C> {
    /// Wrap `client`, allowing at most `max_concurrency` calls in flight
    pub fn new(client: C, max_concurrency: usize) -> Self {
        Self {
            client,
            capacity: max_concurrency,
            sem: Semaphore::new(max_concurrency),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free
    pub fn available_slots(&self) -> usize {
        self.sem.available_permits()
    }

    pub fn inner(&self) -> &C {
        &self.client
    }

    /// Stop admitting calls. Callers still waiting for a slot, and every
    /// later call, fail with [`TaggingError::LimiterClosed`]; calls already
    /// inside the delegate run to completion.
    pub fn close(&self) {
        self.sem.close();
    }

    pub fn is_closed(&self) -> bool {
        self.sem.is_closed()
    }
}

#[async_trait]
impl<C: ResourceDiscovery> ResourceDiscovery for LimitedConcurrencyClient<C> {
    async fn get_resources(&self, job: &Job, region: &str) -> Result<Vec<TaggedResource>, TaggingError> {
        // Dropping this future while it waits gives up the place in line
        let _permit = self
            .sem
            .acquire()
            .await
            .map_err(|_| TaggingError::LimiterClosed)?;
        self.client.get_resources(job, region).await
    }
}
