//! Online/offline derivation for professional profiles.
//!
//! Four independent signals feed the public flag: profile readiness, content moderation,
//! subscription state and identity verification. Only the first three gate visibility.
//! Every mutation path goes through the transition functions below, which end in
//! [`refresh`] so the persisted flag never drifts from the derived one.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::completion::{can_submit, completion_score, meets_visibility_threshold};
use super::domain::{
    BioVerificationStatus, PlanStatus, PlanTier, Professional, VerificationStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileReadiness {
    Incomplete,
    Complete,
}

/// Effective subscription state at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanState {
    None,
    Active,
    CancellingNotYetExpired,
    Expired,
}

impl PlanState {
    pub const fn is_effectively_active(self) -> bool {
        matches!(self, PlanState::Active | PlanState::CancellingNotYetExpired)
    }
}

/// Snapshot of every signal contributing to a professional's public status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisibilityState {
    pub readiness: ProfileReadiness,
    pub moderation: BioVerificationStatus,
    pub plan: PlanState,
    pub identity: VerificationStatus,
}

impl VisibilityState {
    pub fn of(profile: &Professional, now: DateTime<Utc>) -> Self {
        Self {
            readiness: readiness_of(profile),
            moderation: profile.bio_verification_status,
            plan: plan_state_of(profile, now),
            identity: profile.verification_status,
        }
    }

    pub fn is_online(&self) -> bool {
        is_online(self.readiness, self.moderation, self.plan)
    }
}

/// The visibility conjunction. Identity status is deliberately absent.
pub fn is_online(
    readiness: ProfileReadiness,
    moderation: BioVerificationStatus,
    plan: PlanState,
) -> bool {
    readiness == ProfileReadiness::Complete
        && moderation == BioVerificationStatus::Approved
        && plan.is_effectively_active()
}

pub fn readiness_of(profile: &Professional) -> ProfileReadiness {
    if profile.is_pro_complete && meets_visibility_threshold(profile) {
        ProfileReadiness::Complete
    } else {
        ProfileReadiness::Incomplete
    }
}

pub fn plan_state_of(profile: &Professional, now: DateTime<Utc>) -> PlanState {
    if profile.plan.is_none() {
        return PlanState::None;
    }

    match profile.plan_status {
        Some(PlanStatus::Active) => PlanState::Active,
        Some(PlanStatus::Cancelling) => match profile.subscription_ends_at {
            Some(ends_at) if ends_at > now => PlanState::CancellingNotYetExpired,
            _ => PlanState::Expired,
        },
        Some(PlanStatus::Expired) => PlanState::Expired,
        None => PlanState::None,
    }
}

/// Recompute and store the derived flag, returning the new value.
pub fn refresh(profile: &mut Professional, now: DateTime<Utc>) -> bool {
    let online = VisibilityState::of(profile, now).is_online();
    profile.is_profile_online = online;
    online
}

/// Rejected state transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("profile is {score}% complete, {required}% required")]
    IncompleteProfile { score: u8, required: u8 },
    #[error("a rejection reason is required")]
    MissingReason,
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

/// Any content edit sends the profile back to moderation.
pub fn record_edit(profile: &mut Professional, now: DateTime<Utc>) {
    profile.bio_verification_status = BioVerificationStatus::Pending;
    refresh(profile, now);
}

/// Profile submission: readiness flips to complete and moderation restarts.
pub fn submit(profile: &mut Professional, now: DateTime<Utc>) -> Result<(), TransitionError> {
    if !can_submit(profile) {
        return Err(TransitionError::IncompleteProfile {
            score: completion_score(profile),
            required: super::completion::SUBMISSION_THRESHOLD,
        });
    }

    profile.is_pro_complete = true;
    profile.bio_verification_status = BioVerificationStatus::Pending;
    profile.bio_rejection_reason = None;
    refresh(profile, now);
    Ok(())
}

pub fn approve(profile: &mut Professional, now: DateTime<Utc>) -> Result<(), TransitionError> {
    if profile.bio_verification_status != BioVerificationStatus::Pending {
        return Err(TransitionError::InvalidTransition {
            action: "approve",
            state: moderation_label(profile.bio_verification_status),
        });
    }

    profile.bio_verification_status = BioVerificationStatus::Approved;
    profile.bio_rejection_reason = None;
    refresh(profile, now);
    Ok(())
}

pub fn reject(
    profile: &mut Professional,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<(), TransitionError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(TransitionError::MissingReason);
    }
    if profile.bio_verification_status == BioVerificationStatus::Rejected {
        return Err(TransitionError::InvalidTransition {
            action: "reject",
            state: "rejected",
        });
    }

    profile.bio_verification_status = BioVerificationStatus::Rejected;
    profile.bio_rejection_reason = Some(reason.to_string());
    refresh(profile, now);
    Ok(())
}

/// Payment success: the plan becomes active for one period.
pub fn activate_plan(
    profile: &mut Professional,
    plan: PlanTier,
    featured: bool,
    now: DateTime<Utc>,
) {
    profile.plan = Some(plan);
    profile.plan_status = Some(PlanStatus::Active);
    profile.subscription_ends_at = Some(now + Duration::days(plan.period_days()));
    profile.is_featured = featured && plan.is_paid();
    refresh(profile, now);
}

pub fn cancel_plan(profile: &mut Professional, now: DateTime<Utc>) -> Result<(), TransitionError> {
    match plan_state_of(profile, now) {
        PlanState::Active => {
            profile.plan_status = Some(PlanStatus::Cancelling);
            refresh(profile, now);
            Ok(())
        }
        other => Err(TransitionError::InvalidTransition {
            action: "cancel plan",
            state: plan_label(other),
        }),
    }
}

pub fn reactivate_plan(
    profile: &mut Professional,
    now: DateTime<Utc>,
) -> Result<(), TransitionError> {
    match plan_state_of(profile, now) {
        PlanState::CancellingNotYetExpired => {
            profile.plan_status = Some(PlanStatus::Active);
            refresh(profile, now);
            Ok(())
        }
        other => Err(TransitionError::InvalidTransition {
            action: "reactivate plan",
            state: plan_label(other),
        }),
    }
}

/// Scheduled expiry of a cancelled plan whose period has ended. Returns whether anything changed.
pub fn expire_plan(profile: &mut Professional, now: DateTime<Utc>) -> bool {
    let lapsed = profile.plan_status == Some(PlanStatus::Cancelling)
        && plan_state_of(profile, now) == PlanState::Expired;
    if !lapsed {
        return false;
    }

    profile.plan_status = Some(PlanStatus::Expired);
    profile.is_featured = false;
    refresh(profile, now);
    true
}

const fn moderation_label(status: BioVerificationStatus) -> &'static str {
    match status {
        BioVerificationStatus::Pending => "pending",
        BioVerificationStatus::Approved => "approved",
        BioVerificationStatus::Rejected => "rejected",
    }
}

const fn plan_label(state: PlanState) -> &'static str {
    match state {
        PlanState::None => "no plan",
        PlanState::Active => "active",
        PlanState::CancellingNotYetExpired => "cancelling",
        PlanState::Expired => "expired",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::domain::ProfessionalId;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn complete_profile() -> Professional {
        let mut pro = Professional::new(ProfessionalId("pro-7".to_string()), "Marta Gil");
        pro.image_url = Some("https://cdn.example/marta.jpg".to_string());
        pro.nationalities = vec!["ES".to_string()];
        pro.contact.phone = Some("+34 611 111 111".to_string());
        pro.professions = vec!["Electrician".to_string()];
        pro.years_of_experience = Some(8);
        pro.bio = "Certified electrician for homes and small offices.".to_string();
        pro.cities = vec!["Valencia".to_string()];
        pro.languages = vec!["Spanish".to_string(), "English".to_string()];
        pro.specialties = vec!["Solar panels".to_string()];
        pro
    }

    fn online_profile() -> Professional {
        let mut pro = complete_profile();
        submit(&mut pro, now()).expect("submits");
        approve(&mut pro, now()).expect("approves");
        activate_plan(&mut pro, PlanTier::Monthly, false, now());
        pro
    }

    #[test]
    fn visibility_truth_table_covers_all_eighteen_combinations() {
        use BioVerificationStatus::{Approved, Pending, Rejected};
        use PlanState::{Active, CancellingNotYetExpired, Expired};
        use ProfileReadiness::{Complete, Incomplete};

        let cases = [
            (Complete, Approved, Active, true),
            (Complete, Approved, CancellingNotYetExpired, true),
            (Complete, Approved, Expired, false),
            (Complete, Pending, Active, false),
            (Complete, Pending, CancellingNotYetExpired, false),
            (Complete, Pending, Expired, false),
            (Complete, Rejected, Active, false),
            (Complete, Rejected, CancellingNotYetExpired, false),
            (Complete, Rejected, Expired, false),
            (Incomplete, Approved, Active, false),
            (Incomplete, Approved, CancellingNotYetExpired, false),
            (Incomplete, Approved, Expired, false),
            (Incomplete, Pending, Active, false),
            (Incomplete, Pending, CancellingNotYetExpired, false),
            (Incomplete, Pending, Expired, false),
            (Incomplete, Rejected, Active, false),
            (Incomplete, Rejected, CancellingNotYetExpired, false),
            (Incomplete, Rejected, Expired, false),
        ];

        assert_eq!(cases.len(), 18);
        for (readiness, moderation, plan, expected) in cases {
            assert_eq!(
                is_online(readiness, moderation, plan),
                expected,
                "{readiness:?} / {moderation:?} / {plan:?}"
            );
        }
        assert!(!is_online(Complete, Approved, PlanState::None));
    }

    #[test]
    fn identity_status_never_gates_visibility() {
        let mut pro = online_profile();
        for status in [
            VerificationStatus::None,
            VerificationStatus::Pending,
            VerificationStatus::Verified,
            VerificationStatus::Rejected,
        ] {
            pro.verification_status = status;
            assert!(refresh(&mut pro, now()));
        }
    }

    #[test]
    fn readiness_requires_submission_and_eighty_five_percent() {
        let mut pro = complete_profile();
        assert_eq!(readiness_of(&pro), ProfileReadiness::Incomplete);

        pro.is_pro_complete = true;
        assert_eq!(readiness_of(&pro), ProfileReadiness::Complete);

        pro.contact.phone = None;
        pro.specialties.clear();
        pro.years_of_experience = None;
        assert_eq!(completion_score(&pro), 80);
        assert_eq!(readiness_of(&pro), ProfileReadiness::Incomplete);
    }

    #[test]
    fn submission_below_eighty_percent_is_refused() {
        let mut pro = complete_profile();
        pro.bio.clear();
        pro.cities.clear();
        match submit(&mut pro, now()) {
            Err(TransitionError::IncompleteProfile { score, required }) => {
                assert_eq!(score, 70);
                assert_eq!(required, 80);
            }
            other => panic!("expected incomplete profile, got {other:?}"),
        }
        assert!(!pro.is_pro_complete);
    }

    #[test]
    fn edits_after_approval_take_the_profile_offline() {
        let mut pro = online_profile();
        assert!(pro.is_profile_online);

        pro.bio = "Updated biography with new certifications.".to_string();
        record_edit(&mut pro, now());

        assert_eq!(pro.bio_verification_status, BioVerificationStatus::Pending);
        assert!(!pro.is_profile_online);

        approve(&mut pro, now()).expect("re-approval");
        assert!(pro.is_profile_online);
    }

    #[test]
    fn rejected_profile_stays_offline_until_resubmitted_and_approved() {
        let mut pro = online_profile();
        assert_eq!(
            reject(&mut pro, "   ", now()),
            Err(TransitionError::MissingReason)
        );
        reject(&mut pro, "Photo does not show the professional", now()).expect("rejects");
        assert!(!pro.is_profile_online);
        assert!(approve(&mut pro, now()).is_err());

        submit(&mut pro, now()).expect("resubmits");
        assert_eq!(pro.bio_verification_status, BioVerificationStatus::Pending);
        assert!(pro.bio_rejection_reason.is_none());
        approve(&mut pro, now()).expect("approves");
        assert!(pro.is_profile_online);
    }

    #[test]
    fn approval_without_plan_keeps_profile_offline() {
        let mut pro = complete_profile();
        submit(&mut pro, now()).expect("submits");
        approve(&mut pro, now()).expect("approves");
        assert!(!pro.is_profile_online);

        activate_plan(&mut pro, PlanTier::Founding, true, now());
        assert!(pro.is_profile_online);
        assert!(!pro.is_featured, "founding plan has no featured add-on");
    }

    #[test]
    fn cancelling_keeps_visibility_until_the_period_ends() {
        let mut pro = online_profile();
        cancel_plan(&mut pro, now()).expect("cancels");
        assert_eq!(plan_state_of(&pro, now()), PlanState::CancellingNotYetExpired);
        assert!(pro.is_profile_online);

        reactivate_plan(&mut pro, now()).expect("reactivates");
        assert_eq!(pro.plan_status, Some(PlanStatus::Active));
        assert!(pro.is_profile_online);

        cancel_plan(&mut pro, now()).expect("cancels again");
        let later = now() + Duration::days(31);
        assert_eq!(plan_state_of(&pro, later), PlanState::Expired);
        assert!(reactivate_plan(&mut pro, later).is_err());

        assert!(expire_plan(&mut pro, later));
        assert_eq!(pro.plan_status, Some(PlanStatus::Expired));
        assert!(!pro.is_profile_online);
        assert!(!expire_plan(&mut pro, later));
    }

    #[test]
    fn expiry_drops_the_featured_flag() {
        let mut pro = complete_profile();
        submit(&mut pro, now()).expect("submits");
        approve(&mut pro, now()).expect("approves");
        activate_plan(&mut pro, PlanTier::Elite, true, now());
        assert!(pro.is_featured);

        cancel_plan(&mut pro, now()).expect("cancels");
        assert!(expire_plan(&mut pro, now() + Duration::days(400)));
        assert!(!pro.is_featured);
    }

    #[test]
    fn cancel_requires_an_active_plan() {
        let mut pro = complete_profile();
        match cancel_plan(&mut pro, now()) {
            Err(TransitionError::InvalidTransition { state, .. }) => assert_eq!(state, "no plan"),
            other => panic!("expected invalid transition, got {other:?}"),
        }
    }
}
