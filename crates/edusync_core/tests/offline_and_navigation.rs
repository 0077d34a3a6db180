mod common;

use common::{harness, wait_ms};
use edusync_core::{
    AggregateId, ChoiceOption, Memo, MemoPatch, Question, QuestionPatch, QuestionType,
    SyncState, WorkflowStatus,
};

fn body(text: &str) -> MemoPatch {
    MemoPatch {
        body: Some(text.to_string()),
        ..MemoPatch::default()
    }
}

#[tokio::test(start_paused = true)]
async fn disconnected_autosave_keeps_edit_locally_without_retry() {
    let h = harness();
    let memo = h.context.engine::<Memo>();
    memo.load().await;
    h.authority.set_unreachable(true);

    memo.edit(body("written on the train")).unwrap();
    wait_ms(1_500).await;

    let record = h.context.cache().read_record::<Memo>().unwrap().unwrap();
    assert_eq!(record.entries[0].body, "written on the train");
    assert_eq!(h.authority.count("PUT"), 1);
    assert_eq!(
        memo.sync_state(&memo.owner_key()),
        Some(SyncState::FlushFailed)
    );

    wait_ms(30_000).await;
    assert_eq!(h.authority.count("PUT"), 1);

    // The next edit after reconnecting carries the offline change along.
    h.authority.set_unreachable(false);
    memo.edit(body("written on the train, fixed")).unwrap();
    wait_ms(1_500).await;
    assert_eq!(h.authority.count("PUT"), 2);
    assert_eq!(memo.sync_state(&memo.owner_key()), Some(SyncState::Clean));
}

#[tokio::test(start_paused = true)]
async fn disconnected_question_edit_keeps_status() {
    let h = harness();
    let questions = h.context.engine::<Question>();
    let mut question = Question::new(QuestionType::MultipleChoice);
    question.exam_id = Some(AggregateId::durable("e-7"));
    let id = questions.create(question).unwrap();
    h.authority.set_unreachable(true);

    questions
        .apply(
            &id,
            QuestionPatch {
                options: Some(vec![
                    ChoiceOption::new("O(n)", false),
                    ChoiceOption::new("O(log n)", true),
                ]),
                ..QuestionPatch::default()
            },
        )
        .unwrap();
    wait_ms(6_000).await;

    let record = h.context.cache().read_record::<Question>().unwrap().unwrap();
    assert_eq!(record.entries[0].options.len(), 2);
    assert_eq!(record.entries[0].status, WorkflowStatus::Draft);
    assert!(h.authority.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn local_cache_failure_does_not_block_remote_autosave() {
    let h = harness();
    let memo = h.context.engine::<Memo>();
    memo.load().await;
    h.store.set_unavailable(true);

    memo.edit(body("cache is full")).unwrap();
    wait_ms(1_500).await;

    assert_eq!(h.authority.count("PUT"), 1);
    assert!(h.context.cache().read_record::<Memo>().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn navigation_away_flushes_pending_edits_locally() {
    let h = harness();
    let questions = h.context.engine::<Question>();
    let id = questions.create(Question::new(QuestionType::Essay)).unwrap();
    questions
        .apply(
            &id,
            QuestionPatch {
                prompt: Some("Compare heaps and BSTs".to_string()),
                ..QuestionPatch::default()
            },
        )
        .unwrap();

    assert!(questions.close());
    let writes_after_close = h.store.write_count();
    let record = h.context.cache().read_record::<Question>().unwrap().unwrap();
    assert_eq!(record.entries[0].prompt, "Compare heaps and BSTs");
    assert_eq!(questions.sync_state(&id), Some(SyncState::Clean));

    wait_ms(10_000).await;
    assert_eq!(h.store.write_count(), writes_after_close);
    assert!(!questions.close());
}

#[tokio::test(start_paused = true)]
async fn navigation_away_leaves_remote_kinds_unsynced() {
    let h = harness();
    let memo = h.context.engine::<Memo>();
    memo.load().await;
    memo.edit(body("half a thought")).unwrap();

    assert!(memo.close());
    wait_ms(5_000).await;

    assert_eq!(h.authority.count("PUT"), 0);
    let record = h.context.cache().read_record::<Memo>().unwrap().unwrap();
    assert_eq!(record.entries[0].body, "half a thought");
    assert_eq!(memo.sync_state(&memo.owner_key()), Some(SyncState::Dirty));
}
