use std::{path::Path, sync::Arc};

use chrono::Utc;
use tempfile::tempdir;

use speechtimer_lib::{
    audio::RecordingCuePlayer,
    combinations::{defaults::PREPARED_SPEECH_ID, defaults::TABLE_TOPICS_ID, new_segment},
    history::{date_key, UNKNOWN_COMBINATION},
    models::{SessionMeta, TimingCombination, TimingSegment},
    timer::TickSource,
    App, AppOptions,
};

async fn open(dir: &Path) -> App {
    App::open_with(
        dir,
        AppOptions {
            tick_source: TickSource::Manual,
            cues: Some(Arc::new(RecordingCuePlayer::new())),
        },
    )
    .await
    .unwrap()
}

fn custom(name: &str) -> TimingCombination {
    TimingCombination::new(name, vec![new_segment(0), new_segment(1)], Utc::now())
}

#[tokio::test]
async fn built_in_combinations_are_always_offered() {
    let dir = tempdir().unwrap();
    let app = open(dir.path()).await;

    let names: Vec<String> = app.combinations().await.into_iter().map(|c| c.name).collect();
    assert_eq!(names.len(), 4);
    assert!(names.contains(&"Prepared Speech".to_string()));

    assert!(app.start("no-such-combination", SessionMeta::default()).await.is_none());
    let session = app.start(TABLE_TOPICS_ID, SessionMeta::new("warm-up")).await.unwrap();
    assert_eq!(session.combination_id, TABLE_TOPICS_ID);
}

#[tokio::test]
async fn custom_combinations_survive_a_restart() {
    let dir = tempdir().unwrap();
    let id = {
        let app = open(dir.path()).await;
        let added = app.add_combination(custom("Debate round")).await.unwrap();
        assert!(app.add_combination(custom("   ")).await.is_err());
        assert!(app.delete_combination(PREPARED_SPEECH_ID).await.is_err());

        let mut renamed = added.clone();
        renamed.name = "Debate final".into();
        app.update_combination(renamed).await.unwrap();
        added.id
    };

    let app = open(dir.path()).await;
    let restored = app.find_combination(&id).await.unwrap();
    assert_eq!(restored.name, "Debate final");
    assert_eq!(restored.segments.len(), 2);
    assert_eq!(app.combinations().await.len(), 5);

    assert_eq!(app.delete_all_custom_combinations().await, 1);
    assert_eq!(app.combinations().await.len(), 4);
    assert!(app.db().load_combinations().await.is_empty());
}

#[tokio::test]
async fn interrupted_run_is_finalized_on_next_open() {
    let dir = tempdir().unwrap();
    let session_id = {
        let app = open(dir.path()).await;
        app.update_settings(|s| s.timer.checkpoint_every_ticks = 2)
            .unwrap();
        let session = app.start(PREPARED_SPEECH_ID, SessionMeta::default()).await.unwrap();
        for _ in 0..5 {
            app.timer().tick().await.unwrap();
        }
        session.id
    };

    let app = open(dir.path()).await;
    let sessions = app.timer().sessions().await;
    assert_eq!(sessions.len(), 1);
    let recovered = &sessions[0];
    assert_eq!(recovered.id, session_id);
    assert_eq!(recovered.duration, Some(4));
    assert!(recovered.end_time.is_some());
    assert!(app.db().load_checkpoint().await.is_none());

    let timeline = app.timer().timeline_for(&session_id).await;
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].duration, Some(4));
    assert!(!timeline[0].is_open());
}

#[tokio::test]
async fn recovered_timeline_matches_session_across_a_boundary() {
    let dir = tempdir().unwrap();
    let session_id = {
        let app = open(dir.path()).await;
        app.update_settings(|s| s.timer.checkpoint_every_ticks = 10)
            .unwrap();
        let combo = app
            .add_combination(TimingCombination::new(
                "Two phase",
                vec![TimingSegment::new("Open", 10, "#4ade80"), TimingSegment::new("Body", 100, "#facc15")],
                Utc::now(),
            ))
            .await
            .unwrap();
        let session = app.start(&combo.id, SessionMeta::default()).await.unwrap();
        for _ in 0..15 {
            app.timer().tick().await.unwrap();
        }
        session.id
    };

    let app = open(dir.path()).await;
    let recovered = app.timer().sessions().await[0].clone();
    assert_eq!(recovered.id, session_id);
    // Last checkpoint was written on the boundary tick.
    assert_eq!(recovered.duration, Some(11));

    let counted: Vec<Option<u64>> = app
        .timer()
        .timeline_for(&session_id)
        .await
        .iter()
        .map(|item| item.duration)
        .collect();
    assert_eq!(counted, vec![Some(10), Some(1)]);
}

#[tokio::test]
async fn history_resolves_names_and_overtime() {
    let dir = tempdir().unwrap();
    let app = open(dir.path()).await;
    let short = app
        .add_combination(TimingCombination::new(
            "Lightning",
            vec![new_segment(0).hidden()],
            Utc::now(),
        ))
        .await
        .unwrap();

    app.start(&short.id, SessionMeta::new("over")).await.unwrap();
    for _ in 0..75 {
        app.timer().tick().await.unwrap();
    }
    app.stop().await.unwrap();

    app.start(TABLE_TOPICS_ID, SessionMeta::new("in time")).await.unwrap();
    for _ in 0..30 {
        app.timer().tick().await.unwrap();
    }
    app.stop().await.unwrap();

    let today = date_key(&Utc::now());
    let entries = app.history_for(&today, false).await;
    let rows: Vec<(&str, u64, Option<u64>)> = entries
        .iter()
        .map(|e| (e.combination_name.as_str(), e.actual_secs, e.overtime_secs))
        .collect();
    assert_eq!(
        rows,
        vec![("Lightning", 75, Some(15)), ("Impromptu Speech", 30, None)]
    );
    assert!(app.history_dates().await.contains(&today));

    app.delete_combination(&short.id).await.unwrap();
    let overview = app.history_overview(false).await;
    assert_eq!(overview.len(), 1);
    let names: Vec<&str> = overview[0]
        .1
        .iter()
        .map(|e| e.combination_name.as_str())
        .collect();
    assert_eq!(names, vec!["Impromptu Speech", UNKNOWN_COMBINATION]);
}
