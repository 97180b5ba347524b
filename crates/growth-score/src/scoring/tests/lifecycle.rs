use super::common::*;
use crate::scoring::clock::Clock;
use crate::scoring::domain::{
    BulkScoreUpdate, CategoryScore, ScoreStatus, ScoreSubmission, StorageKey,
};
use crate::scoring::evaluation::ScoreOverrides;

fn receive(harness: &Harness, org_key: &StorageKey, scores: Vec<CategoryScore>) {
    harness
        .engine
        .receive_score(
            &authority(),
            org_key,
            &applicant(),
            ScoreSubmission {
                scores,
                timestamp: None,
            },
        )
        .expect("scores accepted");
}

#[test]
fn organization_to_republished_credential() {
    let harness = harness();
    let org = harness.organization();
    harness
        .engine
        .register(&authority(), &org.key, registration())
        .expect("registers");

    let verified = harness
        .engine
        .verify(&authority(), &org.key, &applicant())
        .expect("verifies");
    assert_eq!(verified.status, ScoreStatus::Verified);

    harness.clock.advance(COOLDOWN as i64);
    receive(&harness, &org.key, uniform(10));
    let record = harness.record(&org);
    assert_eq!(record.status, ScoreStatus::Scoring);
    assert_eq!(record.aggregate, 10);
    assert_eq!(record.level, 0);

    harness.clock.advance(COOLDOWN as i64);
    receive(&harness, &org.key, mixed());
    let record = harness.record(&org);
    // 693 / 14 = 49.5 rounds up onto the L2 breakpoint
    assert_eq!(record.aggregate, 50);
    assert_eq!(record.level, 2);
    assert_eq!(record.set_levels, vec![2, 1]);

    let sent = harness
        .engine
        .send_score(&authority(), &org.key, &applicant())
        .expect("sends");
    assert_eq!(sent.status, ScoreStatus::Sent);
    assert_eq!(sent.published.as_ref().map(|published| published.level), Some(2));

    // new values reopen the record; untouched categories keep their last value
    harness.clock.advance(COOLDOWN as i64);
    receive(&harness, &org.key, leading_hundreds());
    let record = harness.record(&org);
    assert_eq!(record.status, ScoreStatus::Scoring);
    assert_eq!(record.raw_scores[0], CategoryScore::Set(100));
    assert_eq!(record.raw_scores[9], CategoryScore::Set(50));
    assert_eq!(record.aggregate, 70);
    assert_eq!(record.level, 2);
    assert_eq!(
        record.published.as_ref().map(|published| published.level),
        Some(2)
    );

    let resent = harness
        .engine
        .send_score(&authority(), &org.key, &applicant())
        .expect("resends");
    assert_eq!(resent.sends, 2);

    // a bulk replacement clears everything but the two leading categories
    let replaced = harness
        .engine
        .update_scores(
            &authority(),
            &org.key,
            &applicant(),
            BulkScoreUpdate {
                scores: leading_hundreds(),
                timestamp: harness.clock.now(),
                overrides: ScoreOverrides::default(),
                force: true,
            },
        )
        .expect("bulk update");
    assert_eq!(replaced.status, ScoreStatus::Scoring);
    assert_eq!(replaced.aggregate, 100);
    assert_eq!(replaced.level, 3);
    assert_eq!(replaced.set_levels, vec![3, 2]);

    let final_send = harness
        .engine
        .send_score(&authority(), &org.key, &applicant())
        .expect("sends again");
    assert_eq!(final_send.sends, 3);
    assert_eq!(
        harness.credentials.metadata_updates(),
        vec![
            "https://public.designity.software/2-1.json".to_string(),
            "https://public.designity.software/2-1.json".to_string(),
            "https://public.designity.software/3-2.json".to_string(),
        ]
    );
}

#[test]
fn verification_may_follow_the_first_score() {
    let harness = harness();
    let org = harness.registered();

    receive(&harness, &org.key, uniform(30));
    let record = harness
        .engine
        .verify(&authority(), &org.key, &applicant())
        .expect("verifies while scoring");

    assert!(record.verified);
    assert_eq!(record.status, ScoreStatus::Scoring);
    assert_eq!(record.level, 1);
}

#[test]
fn credential_side_effects_follow_the_lifecycle() {
    let harness = harness();
    let org = harness.registered();
    harness
        .engine
        .verify(&authority(), &org.key, &applicant())
        .expect("verifies");
    receive(&harness, &org.key, uniform(80));
    harness
        .engine
        .send_score(&authority(), &org.key, &applicant())
        .expect("sends");

    let kinds = harness
        .credentials
        .events()
        .into_iter()
        .map(|event| match event {
            CredentialEvent::Minted { .. } => "minted",
            CredentialEvent::Collected { .. } => "collected",
            CredentialEvent::MetadataSet { .. } => "metadata",
        })
        .collect::<Vec<_>>();
    assert_eq!(kinds, vec!["minted", "minted", "collected", "metadata"]);
}
