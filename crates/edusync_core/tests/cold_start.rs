mod common;

use common::{harness, wait_ms};
use edusync_core::{
    AggregateId, KeyValueStore, LoadSource, Memo, MemoPatch, OwnerScoped, Profile,
};
use serde_json::json;

#[tokio::test(start_paused = true)]
async fn legacy_fields_are_migrated_when_nothing_else_exists() {
    let h = harness();
    h.store
        .write("introduction_u1", "Backend engineer who writes tests")
        .unwrap();
    h.store.write("skills_u1", "rust, sql").unwrap();
    h.store
        .write("github_url_u1", "https://github.com/ada")
        .unwrap();

    let profile = h.context.engine::<Profile>();
    assert_eq!(profile.load().await, LoadSource::LegacyMigration);

    let current = profile.current().unwrap();
    assert_eq!(current.introduction, "Backend engineer who writes tests");
    assert_eq!(current.skills, vec!["rust".to_string(), "sql".to_string()]);
    assert_eq!(
        current.links.github_url.as_deref(),
        Some("https://github.com/ada")
    );
    assert_eq!(current.name, "Ada Park");
    assert_eq!(current.email, "ada@example.edu");

    let record = h.context.cache().read_record::<Profile>().unwrap().unwrap();
    assert_eq!(record.entries[0].introduction, current.introduction);
    assert!(h.store.read("introduction_u1").unwrap().is_some());

    // The structured record now takes precedence over legacy keys.
    h.store.write("introduction_u1", "stale").unwrap();
    let reopened = h.context.engine::<Profile>();
    assert_eq!(reopened.load().await, LoadSource::LocalCache);
    assert_eq!(
        reopened.current().unwrap().introduction,
        "Backend engineer who writes tests"
    );
}

#[tokio::test(start_paused = true)]
async fn remote_wins_and_session_fields_override_it() {
    let h = harness();
    h.authority.seed(
        "/profile/u1",
        json!({ "id": 9001, "name": "Old Name", "introduction": "From server" }),
    );
    let mut cached = Profile::defaults("u1");
    cached.introduction = "From cache".to_string();
    h.context.cache().write_record(&[cached]).unwrap();
    h.store.write("introduction_u1", "From legacy").unwrap();

    let profile = h.context.engine::<Profile>();
    assert_eq!(profile.load().await, LoadSource::Remote);

    let current = profile.current().unwrap();
    assert_eq!(current.introduction, "From server");
    assert_eq!(current.name, "Ada Park");
    assert_eq!(current.id, AggregateId::durable("u1"));
    let record = h.context.cache().read_record::<Profile>().unwrap().unwrap();
    assert_eq!(record.entries[0].introduction, "From server");
}

#[tokio::test(start_paused = true)]
async fn unpushed_offline_edit_survives_a_remote_load() {
    let h = harness();
    h.authority.seed(
        "/memo/u1",
        json!({ "id": "u1", "body": "old server body", "last_modified_at": 1 }),
    );
    h.authority.set_unreachable(true);

    let memo = h.context.engine::<Memo>();
    memo.load().await;
    memo.edit(MemoPatch {
        body: Some("offline edit".to_string()),
        ..MemoPatch::default()
    })
    .unwrap();
    wait_ms(1_500).await;
    memo.close();

    h.authority.set_unreachable(false);
    let reopened = h.context.engine::<Memo>();
    assert_eq!(reopened.load().await, LoadSource::Remote);
    assert_eq!(reopened.current().unwrap().body, "old server body");

    let record = h.context.cache().read_record::<Memo>().unwrap().unwrap();
    assert_eq!(record.entries[0].body, "offline edit");
}

#[tokio::test(start_paused = true)]
async fn unreachable_remote_falls_back_to_cache() {
    let h = harness();
    let mut cached = Memo::defaults("u1");
    cached.title = "Week 3".to_string();
    cached.body = "Prepare the recursion quiz".to_string();
    h.context.cache().write_record(&[cached]).unwrap();
    h.authority.set_unreachable(true);

    let memo = h.context.engine::<Memo>();
    assert_eq!(memo.load().await, LoadSource::LocalCache);
    assert_eq!(memo.current().unwrap().body, "Prepare the recursion quiz");
}

#[tokio::test(start_paused = true)]
async fn nothing_stored_yields_defaults_with_session_fields() {
    let h = harness();
    let profile = h.context.engine::<Profile>();

    assert_eq!(profile.load().await, LoadSource::Defaults);
    let current = profile.current().unwrap();
    assert_eq!(current.name, "Ada Park");
    assert!(current.introduction.is_empty());
    assert!(h.context.cache().read_record::<Profile>().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn memo_legacy_keys_are_migrated() {
    let h = harness();
    h.store.write("memo_title_u1", "Todo").unwrap();
    h.store.write("memo_text_u1", "Grade essays").unwrap();

    let memo = h.context.engine::<Memo>();
    assert_eq!(memo.load().await, LoadSource::LegacyMigration);
    let current = memo.current().unwrap();
    assert_eq!(current.title, "Todo");
    assert_eq!(current.body, "Grade essays");
}

#[tokio::test(start_paused = true)]
async fn deleted_value_does_not_resurrect_from_legacy_keys() {
    let h = harness();
    h.store.write("memo_text_u1", "Old scratch").unwrap();

    let memo = h.context.engine::<Memo>();
    assert_eq!(memo.load().await, LoadSource::LegacyMigration);
    memo.delete(&memo.owner_key()).await.unwrap();

    let reopened = h.context.engine::<Memo>();
    assert_eq!(reopened.load().await, LoadSource::Defaults);
    assert!(reopened.current().unwrap().body.is_empty());
}
