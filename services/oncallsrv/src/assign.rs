//! Assignment resolver: who is on call right now
//!
//! A query, not a pushed event; the engine asks on every create rather
//! than caching a winner.

use anyhow::Result;
use chrono::Utc;

use crate::store::{OnCallStore, User};

#[derive(Clone)]
pub struct AssignmentResolver {
    oncall: OnCallStore,
}

impl AssignmentResolver {
    pub fn new(oncall: OnCallStore) -> Self {
        Self { oncall }
    }

    /// The current on-call user, or None when no schedule covers now.
    pub async fn current_on_call(&self) -> Result<Option<User>> {
        self.oncall.current_on_call(Utc::now()).await
    }
}
