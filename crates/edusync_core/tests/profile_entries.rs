mod common;

use common::harness;
use edusync_core::{
    AggregateId, ChildKind, EntryPatch, Profile, ProfileEntry, ProfilePatch, SaveAction,
    SaveOutcome,
};

fn child_calls(h: &common::Harness, method: &str, prefix: &str) -> usize {
    h.authority
        .calls()
        .iter()
        .filter(|call| call.method == method && call.path.starts_with(prefix))
        .count()
}

#[tokio::test(start_paused = true)]
async fn entry_is_posted_once_then_updated_then_deleted() {
    let h = harness();
    let profile = h.context.engine::<Profile>();
    profile.load().await;

    let temp = profile
        .add_entry(ChildKind::Experience, ProfileEntry::new("Acme Learning"))
        .unwrap();
    assert!(temp.is_temporary());

    let outcome = profile
        .save_entry(ChildKind::Experience, &temp)
        .await
        .unwrap();
    let durable = AggregateId::durable("101");
    assert_eq!(
        outcome,
        SaveOutcome::Synced {
            id: durable.clone(),
            status: None,
        }
    );
    assert_eq!(child_calls(&h, "POST", "/profile/u1/experience"), 1);
    assert_eq!(profile.current().unwrap().experience[0].id, durable);

    profile
        .update_entry(
            ChildKind::Experience,
            &temp,
            EntryPatch {
                role: Some("Course designer".to_string()),
                ..EntryPatch::default()
            },
        )
        .unwrap();
    profile
        .save_entry(ChildKind::Experience, &durable)
        .await
        .unwrap();
    assert_eq!(child_calls(&h, "POST", "/profile/u1/experience"), 1);
    let sent = h
        .authority
        .last_body("PUT", "/profile/u1/experience/101")
        .unwrap();
    assert_eq!(sent["role"], "Course designer");

    profile
        .delete_entry(ChildKind::Experience, &durable)
        .await
        .unwrap();
    assert!(h.authority.document("/profile/u1/experience/101").is_none());
    assert!(profile.current().unwrap().experience.is_empty());

    let record = h.context.cache().read_record::<Profile>().unwrap().unwrap();
    assert!(record.entries[0].experience.is_empty());
}

#[tokio::test(start_paused = true)]
async fn offline_entry_save_keeps_temporary_id() {
    let h = harness();
    let profile = h.context.engine::<Profile>();
    profile.load().await;
    let temp = profile
        .add_entry(ChildKind::Education, ProfileEntry::new("State University"))
        .unwrap();
    h.authority.set_unreachable(true);

    let outcome = profile
        .save_entry(ChildKind::Education, &temp)
        .await
        .unwrap();

    assert!(matches!(outcome, SaveOutcome::SavedLocally { .. }));
    assert_eq!(profile.current().unwrap().education[0].id, temp);
    let record = h.context.cache().read_record::<Profile>().unwrap().unwrap();
    assert_eq!(record.entries[0].education[0].organization, "State University");
}

#[tokio::test(start_paused = true)]
async fn profile_scalars_save_with_put_by_owner() {
    let h = harness();
    let profile = h.context.engine::<Profile>();
    profile.load().await;

    profile
        .edit(ProfilePatch {
            headline: Some("Teaching assistant".to_string()),
            ..ProfilePatch::default()
        })
        .unwrap();
    let outcome = profile.save_current(SaveAction::Save).await.unwrap();

    assert_eq!(outcome.id(), &AggregateId::durable("u1"));
    let sent = h.authority.last_body("PUT", "/profile/u1").unwrap();
    assert_eq!(sent["headline"], "Teaching assistant");
    assert_eq!(sent["name"], "Ada Park");
    assert_eq!(h.authority.count("POST"), 0);
}
