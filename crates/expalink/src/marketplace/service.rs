use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::domain::{ConsumerAccount, Professional, ProfessionalId};
use super::error::MarketplaceError;
use super::repository::{MarketplaceStore, RepositoryError};
use super::session::Session;
use super::subscription::CheckoutGateway;
use super::views::{ContactAccess, ProfessionalView};
use crate::config::MarketplaceConfig;

const DEFAULT_RETURN_URL: &str = "http://localhost:3000";

/// Service composing the marketplace store, payment collaborator and tunables.
///
/// Operations are split by concern across `search`, `unlock`, `reviews`, `profile` and
/// `subscription`; this module holds construction and the lookups they share.
pub struct MarketplaceService<S, C> {
    pub(crate) store: Arc<S>,
    pub(crate) checkout: Arc<C>,
    pub(crate) config: MarketplaceConfig,
    pub(crate) return_url: String,
}

impl<S, C> MarketplaceService<S, C>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    pub fn new(store: Arc<S>, checkout: Arc<C>, config: MarketplaceConfig) -> Self {
        Self {
            store,
            checkout,
            config,
            return_url: DEFAULT_RETURN_URL.to_string(),
        }
    }

    /// Base URL the payment collaborator redirects back to.
    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.return_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn config(&self) -> &MarketplaceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub(crate) fn load_professional(
        &self,
        id: &ProfessionalId,
    ) -> Result<Professional, MarketplaceError> {
        self.store
            .fetch_professional(id)?
            .ok_or_else(|| MarketplaceError::NotFound(format!("professional {}", id.0)))
    }

    /// Account for the session, created with an empty balance on first use.
    pub(crate) fn account_for(
        &self,
        session: &Session,
    ) -> Result<ConsumerAccount, MarketplaceError> {
        if let Some(account) = self.store.fetch_account(&session.consumer_id)? {
            return Ok(account);
        }
        let mut account = ConsumerAccount::new(session.consumer_id.clone(), session.email.clone());
        account.is_admin = session.is_admin;
        self.store.upsert_account(account.clone())?;
        Ok(account)
    }

    pub fn account(&self, session: &Session) -> Result<ConsumerAccount, MarketplaceError> {
        self.account_for(session)
    }

    /// Professional-role selection: a blank record keyed by the caller's id.
    pub fn register_professional(
        &self,
        session: &Session,
        name: &str,
    ) -> Result<Professional, MarketplaceError> {
        let id = ProfessionalId(session.consumer_id.0.clone());
        let mut pro = Professional::new(id, name.trim());
        pro.contact.email = Some(session.email.clone()).filter(|email| !email.is_empty());

        let stored = self.store.insert_professional(pro).map_err(|error| match error {
            RepositoryError::Conflict => {
                MarketplaceError::Conflict("professional profile already exists".to_string())
            }
            other => other.into(),
        })?;
        info!(professional = %stored.id.0, "professional registered");
        Ok(stored)
    }

    /// Profile page filtered for the viewer's contact access.
    pub fn view_professional(
        &self,
        viewer: Option<&Session>,
        id: &ProfessionalId,
        now: DateTime<Utc>,
    ) -> Result<ProfessionalView, MarketplaceError> {
        let pro = self.load_professional(id)?;
        if !self.can_see(viewer, &pro)? {
            return Err(MarketplaceError::NotFound(format!("professional {}", id.0)));
        }

        let access = self.contact_access(viewer, &pro, now)?;
        Ok(ProfessionalView::for_viewer(&pro, access))
    }

    /// Offline profiles stay reachable for the owner, admins and token holders only.
    /// Premium lifts the token requirement for contact details, not for visibility.
    fn can_see(
        &self,
        viewer: Option<&Session>,
        pro: &Professional,
    ) -> Result<bool, MarketplaceError> {
        if pro.is_profile_online {
            return Ok(true);
        }
        let Some(session) = viewer else {
            return Ok(false);
        };
        if session.is_admin || session.owns(&pro.id) {
            return Ok(true);
        }
        Ok(self
            .store
            .fetch_unlock(&session.consumer_id, &pro.id)?
            .is_some())
    }

    pub(crate) fn contact_access(
        &self,
        viewer: Option<&Session>,
        pro: &Professional,
        now: DateTime<Utc>,
    ) -> Result<ContactAccess, MarketplaceError> {
        let Some(session) = viewer else {
            return Ok(ContactAccess::Locked);
        };
        if session.owns(&pro.id) {
            return Ok(ContactAccess::Owner);
        }
        let premium = self
            .store
            .fetch_account(&session.consumer_id)?
            .is_some_and(|account| account.has_premium(now));
        let unlocked = premium
            || self
                .store
                .fetch_unlock(&session.consumer_id, &pro.id)?
                .is_some();
        Ok(if unlocked {
            ContactAccess::Unlocked
        } else {
            ContactAccess::Locked
        })
    }
}
