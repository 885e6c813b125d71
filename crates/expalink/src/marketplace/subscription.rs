use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::completion::{completion_score, VISIBILITY_THRESHOLD};
use super::domain::{ConsumerId, PlanStatus, PlanTier, Professional, ProfessionalId};
use super::error::MarketplaceError;
use super::repository::MarketplaceStore;
use super::service::MarketplaceService;
use super::session::Session;
use super::visibility::{self, plan_state_of, PlanState};

/// Consumer-side purchases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditPack {
    Single,
    Bundle,
    /// One year of unlimited unlocks.
    Premium,
}

impl CreditPack {
    pub const fn credits(self) -> u32 {
        match self {
            CreditPack::Single => 1,
            CreditPack::Bundle => 5,
            CreditPack::Premium => 0,
        }
    }

    /// List price in euro cents; the premium pass is priced by the payment provider.
    pub const fn price_cents(self) -> Option<u32> {
        match self {
            CreditPack::Single => Some(100),
            CreditPack::Bundle => Some(300),
            CreditPack::Premium => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            CreditPack::Single => "single",
            CreditPack::Bundle => "bundle",
            CreditPack::Premium => "premium",
        }
    }
}

pub const PREMIUM_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    Payment,
    Subscription,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckoutItem {
    Plan { plan: PlanTier, featured: bool },
    Credits { pack: CreditPack },
}

/// Hosted checkout request handed to the payment collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutRequest {
    /// Account the payment is attributed to.
    pub reference: String,
    pub customer_email: String,
    pub item: CheckoutItem,
    pub mode: CheckoutMode,
    pub trial_days: Option<i64>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    pub url: String,
}

/// Payment processor seam: a checkout request in, a redirect URL out.
pub trait CheckoutGateway: Send + Sync + Debug {
    fn create_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, CheckoutError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("checkout rejected: {0}")]
    Rejected(String),
    #[error("payment provider unavailable: {0}")]
    Unavailable(String),
}

impl<S, C> MarketplaceService<S, C>
where
    S: MarketplaceStore + 'static,
    C: CheckoutGateway + 'static,
{
    pub fn select_plan(
        &self,
        session: &Session,
        id: &ProfessionalId,
        plan: PlanTier,
        featured: bool,
        now: DateTime<Utc>,
    ) -> Result<CheckoutSession, MarketplaceError> {
        session.require_owner(id)?;
        let pro = self.load_professional(id)?;

        let score = completion_score(&pro);
        if score < VISIBILITY_THRESHOLD {
            return Err(MarketplaceError::validation(format!(
                "profile is {score}% complete, {VISIBILITY_THRESHOLD}% required to pick a plan"
            )));
        }
        if featured && !plan.is_paid() {
            return Err(MarketplaceError::validation(
                "the featured add-on requires a paid plan",
            ));
        }
        if pro.plan == Some(plan) && plan_state_of(&pro, now) == PlanState::Active {
            return Err(MarketplaceError::Conflict(format!(
                "{} plan is already active",
                plan.label()
            )));
        }

        let checkout = self.checkout.create_session(CheckoutRequest {
            reference: id.0.clone(),
            customer_email: session.email.clone(),
            item: CheckoutItem::Plan { plan, featured },
            mode: CheckoutMode::Subscription,
            trial_days: (!plan.is_paid()).then(|| plan.period_days()),
            success_url: format!("{}/pro/dashboard?checkout=success", self.return_url),
            cancel_url: format!("{}/pro/dashboard?checkout=cancelled", self.return_url),
        })?;
        info!(professional = %id.0, plan = plan.label(), featured, "plan checkout started");
        Ok(checkout)
    }

    /// Payment-success callback.
    pub fn activate_plan(
        &self,
        id: &ProfessionalId,
        plan: PlanTier,
        featured: bool,
        now: DateTime<Utc>,
    ) -> Result<Professional, MarketplaceError> {
        let mut pro = self.load_professional(id)?;
        visibility::activate_plan(&mut pro, plan, featured, now);
        self.store.update_professional(pro.clone())?;

        info!(
            professional = %id.0,
            plan = plan.label(),
            featured = pro.is_featured,
            online = pro.is_profile_online,
            "plan activated"
        );
        Ok(pro)
    }

    /// Cancel at period end; the profile stays online until `subscription_ends_at`.
    pub fn cancel_plan(
        &self,
        session: &Session,
        id: &ProfessionalId,
        now: DateTime<Utc>,
    ) -> Result<Professional, MarketplaceError> {
        session.require_owner(id)?;
        let mut pro = self.load_professional(id)?;
        visibility::cancel_plan(&mut pro, now)?;
        self.store.update_professional(pro.clone())?;

        info!(professional = %id.0, ends_at = ?pro.subscription_ends_at, "plan cancelling");
        Ok(pro)
    }

    pub fn reactivate_plan(
        &self,
        session: &Session,
        id: &ProfessionalId,
        now: DateTime<Utc>,
    ) -> Result<Professional, MarketplaceError> {
        session.require_owner(id)?;
        let mut pro = self.load_professional(id)?;
        visibility::reactivate_plan(&mut pro, now)?;
        self.store.update_professional(pro.clone())?;

        info!(professional = %id.0, "plan reactivated");
        Ok(pro)
    }

    /// Scheduled sweep: lapsed cancelling plans become expired and drop offline.
    pub fn expire_lapsed(&self, now: DateTime<Utc>) -> Result<Vec<ProfessionalId>, MarketplaceError> {
        let mut expired = Vec::new();
        for mut pro in self.store.with_plan_status(PlanStatus::Cancelling)? {
            if plan_state_of(&pro, now) != PlanState::Expired {
                continue;
            }
            if visibility::expire_plan(&mut pro, now) {
                self.store.update_professional(pro.clone())?;
                expired.push(pro.id);
            }
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "lapsed plans expired");
        }
        Ok(expired)
    }

    pub fn purchase(
        &self,
        session: &Session,
        pack: CreditPack,
    ) -> Result<CheckoutSession, MarketplaceError> {
        let account = self.account_for(session)?;
        let checkout = self.checkout.create_session(CheckoutRequest {
            reference: account.id.0.clone(),
            customer_email: account.email.clone(),
            item: CheckoutItem::Credits { pack },
            mode: CheckoutMode::Payment,
            trial_days: None,
            success_url: format!("{}/credits?checkout=success", self.return_url),
            cancel_url: format!("{}/credits?checkout=cancelled", self.return_url),
        })?;
        info!(consumer = %account.id.0, pack = pack.label(), "credit checkout started");
        Ok(checkout)
    }

    /// Payment-success callback for a consumer purchase. Returns the credit balance.
    pub fn fulfil_purchase(
        &self,
        consumer: &ConsumerId,
        pack: CreditPack,
        now: DateTime<Utc>,
    ) -> Result<u32, MarketplaceError> {
        let account = self
            .store
            .fetch_account(consumer)?
            .ok_or_else(|| MarketplaceError::NotFound(format!("account {}", consumer.0)))?;

        match pack {
            CreditPack::Premium => {
                let base = account
                    .premium_until
                    .filter(|until| *until > now && account.is_premium)
                    .unwrap_or(now);
                let until = base + Duration::days(PREMIUM_DAYS);
                self.store.set_premium_until(consumer, until)?;
                info!(consumer = %consumer.0, %until, "premium granted");
                Ok(account.credits)
            }
            _ => {
                let balance = self.store.grant_credits(consumer, pack.credits())?;
                info!(consumer = %consumer.0, pack = pack.label(), balance, "credits granted");
                Ok(balance)
            }
        }
    }
}
