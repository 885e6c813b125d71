use std::sync::Arc;

use chrono::Duration;

use super::common::*;
use crate::config::MarketplaceConfig;
use crate::marketplace::domain::{ConsumerAccount, ProfessionalId, UnlockToken};
use crate::marketplace::repository::{AccountRepository, ProfessionalRepository, UnlockRepository};
use crate::marketplace::{ContactAccess, MarketplaceError, MarketplaceService, UnlockOutcome};

fn pro_id(id: &str) -> ProfessionalId {
    ProfessionalId(id.to_string())
}

#[test]
fn unlock_charges_one_credit_and_records_a_token() {
    let (service, store, _) = build_service();
    seed(&store, online_professional("pro-1", "Plumber", None));
    let session = consumer("expat-1");
    fund(&store, &session, 3);

    let outcome = service
        .unlock(&session, &pro_id("pro-1"), now())
        .expect("unlock succeeds");

    match outcome {
        UnlockOutcome::Unlocked {
            token,
            remaining_credits,
        } => {
            assert_eq!(token.professional_id, pro_id("pro-1"));
            assert_eq!(token.unlocked_at, now());
            assert_eq!(remaining_credits, Some(2));
        }
        other => panic!("expected a new unlock, got {other:?}"),
    }
    assert_eq!(balance(&store, &session), 2);
    let pro = store
        .fetch_professional(&pro_id("pro-1"))
        .expect("fetch")
        .expect("present");
    assert_eq!(pro.unlock_count, 1);
}

#[test]
fn second_unlock_is_idempotent_and_not_charged() {
    let (service, store, _) = build_service();
    seed(&store, online_professional("pro-1", "Plumber", None));
    let session = consumer("expat-1");
    fund(&store, &session, 1);

    service
        .unlock(&session, &pro_id("pro-1"), now())
        .expect("first unlock");
    let second = service
        .unlock(&session, &pro_id("pro-1"), now() + Duration::minutes(1))
        .expect("second unlock");

    match second {
        UnlockOutcome::AlreadyUnlocked { token } => assert_eq!(token.unlocked_at, now()),
        other => panic!("expected already unlocked, got {other:?}"),
    }
    assert_eq!(balance(&store, &session), 0);
    assert_eq!(
        store
            .unlocks_for(&session.consumer_id)
            .expect("tokens")
            .len(),
        1
    );
}

#[test]
fn zero_balance_is_refused_without_side_effects() {
    let (service, store, _) = build_service();
    seed(&store, online_professional("pro-1", "Plumber", None));
    let session = consumer("expat-1");
    fund(&store, &session, 0);

    match service.unlock(&session, &pro_id("pro-1"), now()) {
        Err(MarketplaceError::InsufficientCredits) => {}
        other => panic!("expected insufficient credits, got {other:?}"),
    }
    assert_eq!(balance(&store, &session), 0);
    assert!(store
        .fetch_unlock(&session.consumer_id, &pro_id("pro-1"))
        .expect("lookup")
        .is_none());
}

#[test]
fn first_time_consumer_gets_an_empty_account() {
    let (service, store, _) = build_service();
    seed(&store, online_professional("pro-1", "Plumber", None));
    let session = consumer("newcomer");

    match service.unlock(&session, &pro_id("pro-1"), now()) {
        Err(MarketplaceError::InsufficientCredits) => {}
        other => panic!("expected insufficient credits, got {other:?}"),
    }
    let account = store
        .fetch_account(&session.consumer_id)
        .expect("lookup")
        .expect("account created");
    assert_eq!(account.credits, 0);
}

#[test]
fn premium_consumer_unlocks_without_spending_credits() {
    let (service, store, _) = build_service();
    seed(&store, online_professional("pro-1", "Plumber", None));
    let session = consumer("vip");
    let mut account = ConsumerAccount::new(session.consumer_id.clone(), session.email.clone());
    account.is_premium = true;
    account.premium_until = Some(now() + Duration::days(30));
    store.upsert_account(account).expect("seed account");

    let outcome = service
        .unlock(&session, &pro_id("pro-1"), now())
        .expect("unlock succeeds");

    match outcome {
        UnlockOutcome::Unlocked {
            remaining_credits, ..
        } => assert_eq!(remaining_credits, None),
        other => panic!("expected a new unlock, got {other:?}"),
    }
    assert_eq!(balance(&store, &session), 0);
}

#[test]
fn lapsed_premium_falls_back_to_credits() {
    let (service, store, _) = build_service();
    seed(&store, online_professional("pro-1", "Plumber", None));
    let session = consumer("former-vip");
    let mut account = ConsumerAccount::new(session.consumer_id.clone(), session.email.clone());
    account.is_premium = true;
    account.premium_until = Some(now() - Duration::days(1));
    store.upsert_account(account).expect("seed account");

    match service.unlock(&session, &pro_id("pro-1"), now()) {
        Err(MarketplaceError::InsufficientCredits) => {}
        other => panic!("expected insufficient credits, got {other:?}"),
    }
}

#[test]
fn owners_never_pay_for_their_own_profile() {
    let (service, store, _) = build_service();
    seed(&store, online_professional("pro-1", "Plumber", None));
    let owner = consumer("pro-1");
    fund(&store, &owner, 2);

    let outcome = service
        .unlock(&owner, &pro_id("pro-1"), now())
        .expect("self unlock");

    assert_eq!(outcome, UnlockOutcome::OwnProfile);
    assert!(outcome.token().is_none());
    assert_eq!(balance(&store, &owner), 2);
}

#[test]
fn unknown_professional_is_not_found() {
    let (service, store, _) = build_service();
    let session = consumer("expat-1");
    fund(&store, &session, 1);

    match service.unlock(&session, &pro_id("ghost"), now()) {
        Err(MarketplaceError::NotFound(_)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
    assert_eq!(balance(&store, &session), 1);
}

#[test]
fn lost_debit_race_revokes_the_token() {
    let store = Arc::new(DrainedBalanceStore::default());
    let service = MarketplaceService::new(
        store.clone(),
        Arc::new(RecordingCheckout::default()),
        MarketplaceConfig::default(),
    );
    store
        .insert_professional(online_professional("pro-1", "Plumber", None))
        .expect("seed professional");
    let session = consumer("expat-1");
    fund(&store.inner, &session, 1);

    match service.unlock(&session, &pro_id("pro-1"), now()) {
        Err(MarketplaceError::InsufficientCredits) => {}
        other => panic!("expected insufficient credits, got {other:?}"),
    }
    assert!(store
        .fetch_unlock(&session.consumer_id, &pro_id("pro-1"))
        .expect("lookup")
        .is_none());
}

#[test]
fn contact_details_follow_the_token() {
    let (service, store, _) = build_service();
    seed(&store, online_professional("pro-1", "Plumber", None));
    let session = consumer("expat-1");
    fund(&store, &session, 1);

    let before = service
        .view_professional(Some(&session), &pro_id("pro-1"), now())
        .expect("public view");
    assert_eq!(before.access, ContactAccess::Locked);
    assert!(before.contact.is_none());

    service
        .unlock(&session, &pro_id("pro-1"), now())
        .expect("unlock succeeds");

    let after = service
        .view_professional(Some(&session), &pro_id("pro-1"), now())
        .expect("unlocked view");
    assert_eq!(after.access, ContactAccess::Unlocked);
    let contact = after.contact.expect("contact revealed");
    assert_eq!(contact.phone.as_deref(), Some("+34 600 123 456"));

    let anonymous = service
        .view_professional(None, &pro_id("pro-1"), now())
        .expect("anonymous view");
    assert!(anonymous.contact.is_none());
}

#[test]
fn offline_profile_is_hidden_from_strangers_but_not_from_its_owner() {
    let (service, store, _) = build_service();
    seed(&store, complete_profile("pro-2", "Plumber"));

    match service.view_professional(Some(&consumer("stranger")), &pro_id("pro-2"), now()) {
        Err(MarketplaceError::NotFound(_)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
    let own = service
        .view_professional(Some(&consumer("pro-2")), &pro_id("pro-2"), now())
        .expect("owner view");
    assert_eq!(own.access, ContactAccess::Owner);
    assert!(own.dashboard.is_some());
}

#[test]
fn premium_reveals_contacts_on_online_profiles_only() {
    let (service, store, _) = build_service();
    seed(&store, online_professional("pro-1", "Plumber", None));
    seed(&store, complete_profile("pro-2", "Plumber"));
    let session = consumer("vip");
    let mut account = ConsumerAccount::new(session.consumer_id.clone(), session.email.clone());
    account.is_premium = true;
    account.premium_until = Some(now() + Duration::days(30));
    store.upsert_account(account).expect("seed account");

    let online = service
        .view_professional(Some(&session), &pro_id("pro-1"), now())
        .expect("online view");
    assert_eq!(online.access, ContactAccess::Unlocked);
    assert!(online.contact.is_some());

    match service.view_professional(Some(&session), &pro_id("pro-2"), now()) {
        Err(MarketplaceError::NotFound(_)) => {}
        other => panic!("expected not found, got {other:?}"),
    }

    store
        .insert_unlock(UnlockToken {
            consumer_id: session.consumer_id.clone(),
            professional_id: pro_id("pro-2"),
            unlocked_at: now() - Duration::days(40),
        })
        .expect("token recorded");
    let held = service
        .view_professional(Some(&session), &pro_id("pro-2"), now())
        .expect("token holder view");
    assert_eq!(held.access, ContactAccess::Unlocked);
}
