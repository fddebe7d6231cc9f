use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use defense_trainer::{
    trainer::standing_pose, ComparisonPolicy, ExerciseConfig, ExercisePhase, ExpiryTarget,
    PercentageMatch, PoseFrame, ReferenceKind, ReferencePose, RenderSink, TrainerController,
    TrainerSettings,
};

#[derive(Default)]
struct CountingSink {
    frames: AtomicUsize,
    with_reference: AtomicUsize,
}

impl RenderSink for CountingSink {
    fn render(&self, _live: &PoseFrame, reference: Option<&ReferencePose>) {
        self.frames.fetch_add(1, Ordering::SeqCst);
        if reference.is_some() {
            self.with_reference.fetch_add(1, Ordering::SeqCst);
        }
    }
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn single_exercise(config: ExerciseConfig) -> TrainerSettings {
    TrainerSettings {
        exercises: vec![config],
        ..TrainerSettings::default()
    }
}

#[tokio::test(start_paused = true)]
async fn render_sink_sees_live_frames_and_reference() {
    let sink = Arc::new(CountingSink::default());
    let trainer = TrainerController::new(TrainerSettings::default(), sink.clone()).unwrap();
    trainer.start_sampling(|| Some(standing_pose())).await.unwrap();

    advance(1050).await;
    assert!(sink.frames.load(Ordering::SeqCst) >= 10);
    assert_eq!(sink.with_reference.load(Ordering::SeqCst), 0);

    trainer.start().await.unwrap();
    advance(6000).await;
    assert!(sink.with_reference.load(Ordering::SeqCst) > 0);

    let reference = trainer.reference().await.unwrap();
    assert_eq!(reference.kind, ReferenceKind::Straight);
    assert_eq!(reference.len(), standing_pose().len());

    trainer.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn window_expiry_rescans_when_configured() {
    let settings = single_exercise(ExerciseConfig {
        repetition_window_secs: 3,
        expiry_target: ExpiryTarget::Scanning,
        ..ExerciseConfig::default()
    });
    let trainer = TrainerController::new(settings, Arc::new(CountingSink::default())).unwrap();
    // Subject keeps drifting sideways, so no smoothed pose lands on the hold.
    let mut shift = 0.0f32;
    trainer
        .start_sampling(move || {
            shift += 50.0;
            Some(PoseFrame::from_keypoints(standing_pose().keypoints().map(|kp| {
                let mut kp = *kp;
                kp.position.x += shift;
                kp
            })))
        })
        .await
        .unwrap();

    trainer.start().await.unwrap();
    advance(5500).await;
    trainer.confirm_hold().await.unwrap();
    advance(5200).await;
    assert_eq!(trainer.snapshot().await.phase, ExercisePhase::Repeating);

    advance(3000).await;
    let snapshot = trainer.snapshot().await;
    assert_eq!(snapshot.phase, ExercisePhase::Scanning);
    assert_eq!(snapshot.reference_kind, None);
    assert_eq!(snapshot.countdown_remaining, Some(5));

    trainer.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn percentage_policy_counts_partial_matches() {
    let settings = single_exercise(ExerciseConfig {
        target_repetitions: 2,
        comparison: ComparisonPolicy::Percentage(PercentageMatch::default()),
        ..ExerciseConfig::default()
    });
    let trainer = TrainerController::new(settings, Arc::new(CountingSink::default())).unwrap();
    trainer.start_sampling(|| Some(standing_pose())).await.unwrap();

    trainer.start().await.unwrap();
    advance(5500).await;
    trainer.confirm_hold().await.unwrap();
    advance(10_000).await;

    let snapshot = trainer.snapshot().await;
    assert_eq!(snapshot.phase, ExercisePhase::Complete);
    assert_eq!(snapshot.repetition_count, 2);

    trainer.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn switching_exercise_mid_countdown_leaves_no_ghost_ticks() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let trainer =
        TrainerController::new(TrainerSettings::default(), Arc::new(CountingSink::default()))
            .unwrap();
    trainer.start_sampling(|| Some(standing_pose())).await.unwrap();

    let mut updates = trainer.subscribe();
    trainer.start().await.unwrap();
    advance(2500).await;
    assert_eq!(trainer.next_exercise().await.as_deref(), Some("extended-hold"));
    updates.borrow_and_update();

    let counter = ticks.clone();
    let watcher = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    advance(10_000).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 0);
    assert_eq!(trainer.snapshot().await.phase, ExercisePhase::Idle);

    trainer.shutdown().await.unwrap();
    watcher.abort();
}
