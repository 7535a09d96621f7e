//! End-to-end acquisition on the synthetic face: calibration, pupils,
//! derived queries and snapshots.

use gazecursor_common::clock::SessionClock;
use gazecursor_common::config::TrackingConfig;
use gazecursor_tracker::synthetic::{FacePose, SyntheticFace};
use gazecursor_tracker::{GazeSnapshot, GazeTracker, LookDirection};
use gazecursor_vision::EyeSide;

fn tracker_for(face: &SyntheticFace) -> GazeTracker<gazecursor_tracker::synthetic::SyntheticLandmarks> {
    let (_, landmarks) = face.split(None);
    GazeTracker::new(landmarks, &TrackingConfig::default(), SessionClock::start())
}

#[test]
fn test_calibration_converges_after_configured_samples() {
    let face = SyntheticFace::new(FacePose::default());
    let mut tracker = tracker_for(&face);
    let samples = TrackingConfig::default().calibration_samples as u64;

    for i in 0..samples - 1 {
        tracker.refresh(&face.frame(i));
    }
    assert!(!tracker.calibration().is_complete());

    tracker.refresh(&face.frame(samples));
    assert!(tracker.calibration().is_complete());
    for side in EyeSide::BOTH {
        let threshold = tracker.calibration().threshold(side).unwrap();
        assert!((20..100).contains(&threshold), "{side:?} threshold {threshold}");
    }
}

#[test]
fn test_pupils_are_located_from_first_frame() {
    let face = SyntheticFace::new(FacePose::default());
    let mut tracker = tracker_for(&face);
    let state = tracker.refresh(&face.frame(0));

    assert!(state.pupils_located());
    let pupil = state.left.as_ref().unwrap().pupil_center().unwrap();
    assert!((pupil.x - 52.0).abs() <= 1.0, "pupil x {}", pupil.x);
    assert!((pupil.y - 60.0).abs() <= 1.0, "pupil y {}", pupil.y);
    assert_eq!(state.is_blinking(), Some(false));
    assert_eq!(state.look_direction(), Some(LookDirection::Center));
}

#[test]
fn test_look_direction_follows_pupil_shift() {
    for (pupil_dx, expected) in [(-6.0, LookDirection::Right), (6.0, LookDirection::Left)] {
        let face = SyntheticFace::new(FacePose {
            pupil_dx,
            ..FacePose::default()
        });
        let state = tracker_for(&face).refresh(&face.frame(0));
        assert_eq!(state.look_direction(), Some(expected), "pupil_dx {pupil_dx}");
    }
}

#[test]
fn test_closed_eyes_read_as_blinking() {
    let face = SyntheticFace::new(FacePose::default());
    let mut tracker = tracker_for(&face);
    // Calibrate on open eyes first so the threshold is known.
    for i in 0..3 {
        tracker.refresh(&face.frame(i));
    }

    let closed = SyntheticFace::new(FacePose {
        eyes_closed: true,
        ..FacePose::default()
    });
    let state = tracker.refresh(&closed.frame(3));
    // A closed eye hides the pupil, so there is no opinion at all.
    assert!(!state.pupils_located());
    assert_eq!(state.is_blinking(), None);
    assert!(GazeSnapshot::capture(&state).is_none());
}

#[test]
fn test_snapshot_tracks_head_translation() {
    let face = SyntheticFace::scripted(|i| FacePose {
        head_dx: 4.0 * i as f64,
        ..FacePose::default()
    });
    let mut tracker = tracker_for(&face);
    let first = GazeSnapshot::capture(&tracker.refresh(&face.frame(0))).unwrap();
    let second = GazeSnapshot::capture(&tracker.refresh(&face.frame(1))).unwrap();

    assert_eq!(second.head_anchor.x - first.head_anchor.x, 4.0);
    assert!((second.eye_left.x - first.eye_left.x - 4.0).abs() <= 1.0);
    assert!((second.pupils_midpoint().x - first.pupils_midpoint().x - 4.0).abs() <= 1.0);
}

#[test]
fn test_invisible_face_yields_empty_state() {
    let face = SyntheticFace::new(FacePose {
        visible: false,
        ..FacePose::default()
    });
    let state = tracker_for(&face).refresh(&face.frame(0));
    assert!(!state.face_detected());
    assert_eq!(state.look_direction(), None);
    assert!(GazeSnapshot::capture(&state).is_none());
}
