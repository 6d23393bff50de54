// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the review stage and library saves

use basic_camera::backends::simulated::{
    PlayerCall, SimulatedAuthorization, SimulatedBackend, SimulatedPlayer,
};
use basic_camera::capture::{CaptureStateMachine, MediaHandoff, MediaKind};
use basic_camera::config::Config;
use basic_camera::permissions::{AuthorizationKind, AuthorizationStatus, PermissionGate};
use basic_camera::review::{DirectoryLibrary, ReviewPlaybackController, SaveOutcome};
use std::sync::Arc;

fn scratch_config(scratch: &tempfile::TempDir) -> Config {
    Config {
        recording_dir: scratch.path().to_path_buf(),
        library_dir: scratch.path().join("library"),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_photo_capture_to_library() {
    let scratch = tempfile::tempdir().unwrap();
    let config = scratch_config(&scratch);
    let library = Arc::new(DirectoryLibrary::new(config.library_dir.clone()));
    let (handoff, mut review) = MediaHandoff::channel();
    let (mut machine, mut completions) =
        CaptureStateMachine::start(Box::new(SimulatedBackend::new()), config, handoff)
            .await
            .unwrap();

    machine.capture_photo().await.unwrap();
    machine.await_completion(&mut completions).await.unwrap();

    let request = review.recv().await.unwrap();
    let mut controller = ReviewPlaybackController::open(request, library.clone(), |_| {
        Box::new(SimulatedPlayer::new())
    })
    .unwrap();
    assert_eq!(controller.kind(), MediaKind::Photo);
    assert!(controller.dimensions().is_some());

    let SaveOutcome::Saved(path) = controller.save().await.unwrap() else {
        panic!("first save must write");
    };
    assert!(path.starts_with(library.root()));
    assert_eq!(
        std::fs::read(&path).unwrap(),
        controller.photo_bytes().unwrap()
    );

    // Second save has no observable effect
    assert_eq!(controller.save().await.unwrap(), SaveOutcome::AlreadySaved);
    assert_eq!(std::fs::read_dir(library.root()).unwrap().count(), 1);
    assert!(!controller.can_save());
}

#[tokio::test]
async fn test_video_capture_to_library() {
    let scratch = tempfile::tempdir().unwrap();
    let config = scratch_config(&scratch);
    let recording_path = config.recording_path();
    let library = Arc::new(DirectoryLibrary::new(config.library_dir.clone()));
    let (handoff, mut review) = MediaHandoff::channel();
    let (mut machine, mut completions) =
        CaptureStateMachine::start(Box::new(SimulatedBackend::new()), config, handoff)
            .await
            .unwrap();

    machine.start_recording().await.unwrap();
    machine.stop_recording().await.unwrap();
    machine.await_completion(&mut completions).await.unwrap();

    let player = SimulatedPlayer::new();
    let calls = player.clone();
    let request = review.recv().await.unwrap();
    let mut controller =
        ReviewPlaybackController::open(request, library, move |_| Box::new(player)).unwrap();
    assert!(controller.is_playing());
    assert_eq!(controller.video_path(), Some(recording_path.as_path()));

    controller.toggle_mute();
    controller.on_playback_ended();

    let SaveOutcome::Saved(saved) = controller.save().await.unwrap() else {
        panic!("first save must write");
    };
    assert!(saved.to_string_lossy().ends_with(".mov"));
    assert!(!recording_path.exists(), "temporary recording is not retained");
    assert_eq!(
        calls.calls(),
        vec![
            PlayerCall::Play,
            PlayerCall::Mute(true),
            PlayerCall::SeekToStart,
            PlayerCall::Pause,
        ]
    );
}

#[tokio::test]
async fn test_library_failure_keeps_save_available() {
    let scratch = tempfile::tempdir().unwrap();
    // A file where the library directory should be
    let blocked = scratch.path().join("library");
    std::fs::write(&blocked, b"not a directory").unwrap();
    let config = scratch_config(&scratch);

    let (handoff, mut review) = MediaHandoff::channel();
    let (mut machine, mut completions) =
        CaptureStateMachine::start(Box::new(SimulatedBackend::new()), config, handoff)
            .await
            .unwrap();
    machine.capture_photo().await.unwrap();
    machine.await_completion(&mut completions).await.unwrap();

    let request = review.recv().await.unwrap();
    let mut controller = ReviewPlaybackController::open(
        request,
        Arc::new(DirectoryLibrary::new(blocked.clone())),
        |_| Box::new(SimulatedPlayer::new()),
    )
    .unwrap();

    let err = controller.save().await.unwrap_err();
    assert!(!err.is_fatal());
    assert!(controller.can_save());

    std::fs::remove_file(&blocked).unwrap();
    assert!(matches!(
        controller.save().await.unwrap(),
        SaveOutcome::Saved(_)
    ));
}

#[tokio::test]
async fn test_denied_permissions_are_fatal() {
    for kind in [AuthorizationKind::Camera, AuthorizationKind::Microphone] {
        let gate = PermissionGate::new(
            SimulatedAuthorization::granted().set_status(kind, AuthorizationStatus::Denied),
        );
        let err = gate.ensure_capture_authorized().await.unwrap_err();
        let err: basic_camera::AppError = err.into();
        assert!(err.is_fatal());
    }
}

#[tokio::test]
async fn test_prompt_grants_access() {
    let provider = SimulatedAuthorization::with_status(AuthorizationStatus::NotDetermined)
        .answer_prompt(AuthorizationKind::Camera, true)
        .answer_prompt(AuthorizationKind::Microphone, true);
    let gate = PermissionGate::new(provider.clone());
    gate.ensure_capture_authorized().await.unwrap();
    assert_eq!(
        provider.prompts(),
        vec![AuthorizationKind::Camera, AuthorizationKind::Microphone]
    );
}
