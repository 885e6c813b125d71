use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{ProfessionalId, UnlockToken};
use super::error::MarketplaceError;
use super::repository::{MarketplaceStore, RepositoryError};
use super::service::MarketplaceService;
use super::session::Session;
use super::subscription::CheckoutGateway;

/// Result of an unlock request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UnlockOutcome {
    /// A new token was issued. `remaining_credits` is absent for premium consumers.
    Unlocked {
        token: UnlockToken,
        remaining_credits: Option<u32>,
    },
    /// The pair was already unlocked; nothing was charged.
    AlreadyUnlocked { token: UnlockToken },
    /// Owners always see their own contact details.
    OwnProfile,
}

impl UnlockOutcome {
    pub fn token(&self) -> Option<&UnlockToken> {
        match self {
            UnlockOutcome::Unlocked { token, .. } | UnlockOutcome::AlreadyUnlocked { token } => {
                Some(token)
            }
            UnlockOutcome::OwnProfile => None,
        }
    }
}

impl<S, C> MarketplaceService<S, C>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    /// Spend one credit (or a premium pass) to reveal a professional's contact details.
    ///
    /// The token is written before the charge so the store's uniqueness constraint settles
    /// concurrent duplicates; the charge itself is a conditional decrement, and a token whose
    /// charge fails is revoked again. The unlock counter is best-effort.
    pub fn unlock(
        &self,
        session: &Session,
        professional_id: &ProfessionalId,
        now: DateTime<Utc>,
    ) -> Result<UnlockOutcome, MarketplaceError> {
        if session.owns(professional_id) {
            return Ok(UnlockOutcome::OwnProfile);
        }

        self.load_professional(professional_id)?;
        let account = self.account_for(session)?;
        let consumer = &session.consumer_id;

        if let Some(token) = self.store.fetch_unlock(consumer, professional_id)? {
            return Ok(UnlockOutcome::AlreadyUnlocked { token });
        }

        let premium = account.has_premium(now);
        if !premium && account.credits == 0 {
            return Err(MarketplaceError::InsufficientCredits);
        }

        let token = UnlockToken {
            consumer_id: consumer.clone(),
            professional_id: professional_id.clone(),
            unlocked_at: now,
        };
        let token = match self.store.insert_unlock(token) {
            Ok(token) => token,
            Err(RepositoryError::Conflict) => {
                info!(consumer = %consumer.0, professional = %professional_id.0, "duplicate unlock ignored");
                let token = self
                    .store
                    .fetch_unlock(consumer, professional_id)?
                    .ok_or(RepositoryError::NotFound)?;
                return Ok(UnlockOutcome::AlreadyUnlocked { token });
            }
            Err(other) => return Err(other.into()),
        };

        let remaining_credits = if premium {
            None
        } else {
            match self.store.try_debit_credit(consumer) {
                Ok(Some(balance)) => Some(balance),
                Ok(None) => {
                    self.store.revoke_unlock(consumer, professional_id)?;
                    return Err(MarketplaceError::InsufficientCredits);
                }
                Err(error) => {
                    if let Err(revoke) = self.store.revoke_unlock(consumer, professional_id) {
                        warn!(error = %revoke, "failed to revoke unpaid unlock");
                    }
                    return Err(error.into());
                }
            }
        };

        if let Err(error) = self.store.increment_unlock_count(professional_id) {
            warn!(professional = %professional_id.0, %error, "unlock counter not incremented");
        }

        info!(
            consumer = %consumer.0,
            professional = %professional_id.0,
            premium,
            remaining_credits,
            "contact details unlocked"
        );
        Ok(UnlockOutcome::Unlocked {
            token,
            remaining_credits,
        })
    }

    /// Tokens held by the caller, newest first.
    pub fn unlocked_professionals(
        &self,
        session: &Session,
    ) -> Result<Vec<UnlockToken>, MarketplaceError> {
        Ok(self.store.unlocks_for(&session.consumer_id)?)
    }
}
