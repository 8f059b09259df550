//! Read-only lookups against platform accounts.

use futures::future::try_join_all;
use tracing::debug;

use campus_hub_core::{AccountId, Email};

use super::RepositoryError;
use crate::config::Collections;
use crate::store::{DocumentStore, Filter};

/// Resolves administrator emails to account ids.
pub struct AccountRepository<'a> {
    store: &'a dyn DocumentStore,
    collections: &'a Collections,
}

impl<'a> AccountRepository<'a> {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore, collections: &'a Collections) -> Self {
        Self { store, collections }
    }

    /// Find the account registered under `email`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_id_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<AccountId>, RepositoryError> {
        let docs = self
            .store
            .list(&self.collections.accounts, &[Filter::eq("email", email.as_str())])
            .await?;
        Ok(docs.into_iter().next().map(|doc| AccountId::new(doc.id)))
    }

    /// Resolve every email concurrently, keeping input order.
    ///
    /// Emails without an account are left out of the result.
    ///
    /// # Errors
    ///
    /// Returns the first query error.
    pub async fn resolve_ids(&self, emails: &[Email]) -> Result<Vec<AccountId>, RepositoryError> {
        let found = try_join_all(emails.iter().map(|email| self.find_id_by_email(email))).await?;
        let resolved = found.len();
        let ids: Vec<AccountId> = found.into_iter().flatten().collect();
        if ids.len() < resolved {
            debug!(
                unmatched = resolved - ids.len(),
                "Some admin emails have no account"
            );
        }
        Ok(ids)
    }
}
