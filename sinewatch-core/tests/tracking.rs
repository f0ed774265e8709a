// End-to-end scenarios: synthetic frames through the full detector pipeline.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sinewatch_core::{Detector, DetectorHandle, FRAME_SIZE, Settings, Snapshot, Symbol, TrackPhase};

const SAMPLE_RATE: u32 = 44100;

fn bin_width() -> f32 {
    SAMPLE_RATE as f32 / FRAME_SIZE as f32
}

/// Capture time of frame `k`, as the audio layer stamps it.
fn timestamp(k: u64) -> u64 {
    k * FRAME_SIZE as u64 * 1000 / SAMPLE_RATE as u64
}

/// Frame `k` of a continuous sum of sines, given as `(frequency, amplitude)`.
fn tones(k: u64, parts: &[(f64, f64)]) -> Vec<f32> {
    (0..FRAME_SIZE)
        .map(|i| {
            let t = (k as f64 * FRAME_SIZE as f64 + i as f64) / SAMPLE_RATE as f64;
            parts
                .iter()
                .map(|&(f, a)| a * (2.0 * std::f64::consts::PI * f * t).sin())
                .sum::<f64>() as f32
        })
        .collect()
}

fn detector(settings: Settings) -> (Detector, DetectorHandle) {
    let handle = DetectorHandle::new(settings);
    let detector = Detector::new(SAMPLE_RATE, handle.clone()).expect("detector");
    (detector, handle)
}

fn run(detector: &mut Detector, frames: impl IntoIterator<Item = (u64, Vec<f32>)>) {
    for (k, frame) in frames {
        detector.process_frame(&frame, timestamp(k)).expect("frame");
    }
}

fn active_frequencies(snap: &Snapshot) -> Vec<f32> {
    let mut freqs: Vec<f32> = snap.active_tracks().map(|t| t.frequency).collect();
    freqs.sort_by(f32::total_cmp);
    freqs
}

#[test]
fn thousand_hertz_tone_is_tracked_in_bin_46() {
    let (mut det, handle) = detector(Settings::default());
    assert!((det.freq_resolution() - 21.533).abs() < 1e-3);

    run(&mut det, (0..10).map(|k| (k, tones(k, &[(1000.0, 1.0)]))));

    let snap = handle.snapshot();
    let active: Vec<_> = snap.active_tracks().collect();
    assert_eq!(active.len(), 1);
    let track = active[0];
    assert!((track.frequency - 46.0 * bin_width()).abs() < 1e-2);
    assert!((track.frequency - 1000.0).abs() <= bin_width());
    assert!(track.purity > 70.0, "purity {}", track.purity);

    let peak_bin = snap
        .magnitudes
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap();
    assert_eq!(peak_bin, 46);
}

#[test]
fn activation_waits_for_persistence_window() {
    let (mut det, handle) = detector(Settings::default());
    // Default window is 100 ms: frames at 0, 46 and 92 ms stay pending.
    run(&mut det, (0..3).map(|k| (k, tones(k, &[(1000.0, 1.0)]))));
    let snap = handle.snapshot();
    assert_eq!(snap.tracks[0].phase, TrackPhase::Pending { since: 0 });

    run(&mut det, [(3, tones(3, &[(1000.0, 1.0)]))]);
    let snap = handle.snapshot();
    assert_eq!(snap.tracks[0].phase, TrackPhase::Active { tone_start: timestamp(3) });
}

#[test]
fn tone_shorter_than_window_never_activates() {
    let mut settings = Settings::default();
    settings.set_persistence_ms(200);
    let (mut det, handle) = detector(settings);

    // On for 0..=139 ms, then silence.
    for k in 0..12 {
        let frame = if k < 4 {
            tones(k, &[(1000.0, 1.0)])
        } else {
            vec![0.0; FRAME_SIZE]
        };
        det.process_frame(&frame, timestamp(k)).unwrap();
        assert_eq!(handle.snapshot().active_tracks().count(), 0, "frame {}", k);
    }
    let snap = handle.snapshot();
    assert!(snap.tracks.iter().all(|t| t.is_empty()));
    assert!(snap.symbols.is_empty());
}

#[test]
fn two_separated_tones_get_stable_independent_tracks() {
    let (mut det, handle) = detector(Settings::default());
    let parts = [(800.0, 0.5), (1500.0, 0.5)];

    run(&mut det, (0..10).map(|k| (k, tones(k, &parts))));
    let early = active_frequencies(&handle.snapshot());
    run(&mut det, (10..20).map(|k| (k, tones(k, &parts))));
    let late = active_frequencies(&handle.snapshot());

    assert_eq!(late.len(), 2);
    assert!((late[0] - 800.0).abs() <= bin_width());
    assert!((late[1] - 1500.0).abs() <= bin_width());
    for (a, b) in early.iter().zip(&late) {
        assert!((a - b).abs() < 1e-3, "frequency drifted from {} to {}", a, b);
    }
}

#[test]
fn tone_outside_band_never_tracks() {
    let mut settings = Settings::default();
    settings.set_band(300.0, 3000.0).unwrap();
    let (mut det, handle) = detector(settings);

    run(&mut det, (0..15).map(|k| (k, tones(k, &[(5000.0, 1.0)]))));

    let snap = handle.snapshot();
    assert!(snap.tracks.iter().all(|t| t.is_empty()));
    let band_top = (3000.0 / bin_width()).ceil() as usize;
    assert!(snap.magnitudes[band_top + 1..].iter().all(|&m| m == 0.0));
}

#[test]
fn full_squelch_suppresses_everything() {
    let mut settings = Settings::default();
    settings.squelch = true;
    settings.set_squelch_threshold(1.0);
    let (mut det, handle) = detector(settings);

    run(&mut det, (0..10).map(|k| (k, tones(k, &[(1000.0, 1.0)]))));

    let snap = handle.snapshot();
    assert!(snap.tracks.iter().all(|t| t.is_empty()));
    assert!(snap.magnitudes.iter().all(|&m| m == 0.0));
}

#[test]
fn zero_squelch_matches_squelch_off() {
    let mut gated = Settings::default();
    gated.squelch = true;
    gated.set_squelch_threshold(0.0);
    let (mut det_gated, gated_handle) = detector(gated);
    let (mut det_open, open_handle) = detector(Settings::default());

    for k in 0..10 {
        let frame = tones(k, &[(1000.0, 1.0), (2500.0, 0.3)]);
        det_gated.process_frame(&frame, timestamp(k)).unwrap();
        det_open.process_frame(&frame, timestamp(k)).unwrap();
    }

    let a = gated_handle.snapshot();
    let b = open_handle.snapshot();
    assert_eq!(a.magnitudes, b.magnitudes);
    for (x, y) in a.tracks.iter().zip(&b.tracks) {
        assert_eq!(x.phase, y.phase);
        assert!((x.frequency - y.frequency).abs() < 1e-3);
    }
}

#[test]
fn attenuated_tone_falls_under_squelch() {
    let mut settings = Settings::default();
    settings.set_gain_db(-40.0).unwrap();
    let (mut det, handle) = detector(settings);

    run(&mut det, (0..6).map(|k| (k, tones(k, &[(1000.0, 1.0)]))));
    // Purity does not depend on level, so the quiet tone still tracks.
    assert_eq!(handle.snapshot().active_tracks().count(), 1);

    handle.set_squelch(true);
    handle.set_squelch_threshold(0.1);
    run(&mut det, (6..12).map(|k| (k, tones(k, &[(1000.0, 1.0)]))));
    assert_eq!(handle.snapshot().active_tracks().count(), 0);
}

#[test]
fn averaging_still_locks_on() {
    let mut settings = Settings::default();
    settings.averaging = true;
    let (mut det, handle) = detector(settings);

    run(&mut det, (0..10).map(|k| (k, tones(k, &[(1200.0, 1.0)]))));

    let freqs = active_frequencies(&handle.snapshot());
    assert_eq!(freqs.len(), 1);
    assert!((freqs[0] - 1200.0).abs() <= bin_width());
}

#[test]
fn white_noise_is_not_a_tone() {
    let mut rng = StdRng::seed_from_u64(7);
    let (mut det, handle) = detector(Settings::default());

    for k in 0..20 {
        let frame: Vec<f32> = (0..FRAME_SIZE).map(|_| rng.gen_range(-0.3..0.3)).collect();
        det.process_frame(&frame, timestamp(k)).unwrap();
    }

    let snap = handle.snapshot();
    assert!(snap.tracks.iter().all(|t| t.is_empty()));
}

#[test]
fn tone_survives_light_noise() {
    let mut rng = StdRng::seed_from_u64(11);
    let (mut det, handle) = detector(Settings::default());

    for k in 0..10 {
        let frame: Vec<f32> = tones(k, &[(1000.0, 1.0)])
            .into_iter()
            .map(|s| s + rng.gen_range(-0.05..0.05))
            .collect();
        det.process_frame(&frame, timestamp(k)).unwrap();
    }

    let freqs = active_frequencies(&handle.snapshot());
    assert_eq!(freqs.len(), 1);
    assert!((freqs[0] - 1000.0).abs() <= bin_width());
}

#[test]
fn keyed_dot_then_dash_decodes() {
    let (mut det, handle) = detector(Settings::default());

    // (frames on, frames off); one frame is ~46 ms, the window is 100 ms.
    let keying = [(6u64, 5u64), (11, 6)];
    let mut k = 0;
    for (on, off) in keying {
        for _ in 0..on {
            det.process_frame(&tones(k, &[(689.0, 0.8)]), timestamp(k)).unwrap();
            k += 1;
        }
        for _ in 0..off {
            det.process_frame(&vec![0.0; FRAME_SIZE], timestamp(k)).unwrap();
            k += 1;
        }
    }

    let snap = handle.snapshot();
    assert_eq!(snap.symbols, vec![Symbol::Short, Symbol::Long]);
    assert_eq!(snap.transcript(), ".-");
    assert!(snap.tracks.iter().all(|t| t.is_empty()));
    // 120 -> 0.8*120 + 0.2*93 -> 0.8*that + 0.2*(325/3)
    assert!((snap.dot_ms - 113.35).abs() < 0.1, "dot {}", snap.dot_ms);
}

fn corrupt_frame(k: u64, bad: f32) -> Vec<f32> {
    let mut frame = tones(k, &[(1000.0, 1.0)]);
    frame[100] = bad;
    frame
}

#[test]
fn non_finite_samples_yield_an_empty_frame() {
    let (mut det, handle) = detector(Settings::default());

    for (k, bad) in [(0, f32::NAN), (1, f32::INFINITY), (2, f32::NEG_INFINITY)] {
        det.process_frame(&corrupt_frame(k, bad), timestamp(k)).unwrap();
        let snap = handle.snapshot();
        assert!(snap.tracks.iter().all(|t| t.is_empty()), "frame {}", k);
        assert!(snap.magnitudes.iter().all(|&m| m == 0.0), "frame {}", k);
    }

    run(&mut det, (3..13).map(|k| (k, tones(k, &[(1000.0, 1.0)]))));
    let freqs = active_frequencies(&handle.snapshot());
    assert_eq!(freqs.len(), 1);
    assert!((freqs[0] - 1000.0).abs() <= bin_width());
}

#[test]
fn nan_frame_does_not_poison_averaging() {
    let mut settings = Settings::default();
    settings.averaging = true;
    let (mut det, handle) = detector(settings);

    det.process_frame(&corrupt_frame(0, f32::NAN), timestamp(0)).unwrap();
    run(&mut det, (1..60).map(|k| (k, tones(k, &[(1000.0, 1.0)]))));

    let snap = handle.snapshot();
    assert_eq!(snap.active_tracks().count(), 1);
    assert!(snap.magnitudes.iter().all(|&m| m.is_finite() && m < 1.0));
    assert!(snap.magnitudes[46] > 0.5, "magnitude {}", snap.magnitudes[46]);
}

#[test]
fn overflowing_gain_recovers_once_restored() {
    let mut settings = Settings::default();
    settings.averaging = true;
    let (mut det, handle) = detector(settings);

    handle.set_gain_db(500.0).unwrap();
    run(&mut det, [(0, tones(0, &[(1000.0, 1.0)]))]);
    assert!(handle.snapshot().tracks.iter().all(|t| t.is_empty()));

    handle.set_gain_db(0.0).unwrap();
    run(&mut det, (1..60).map(|k| (k, tones(k, &[(1000.0, 1.0)]))));

    let freqs = active_frequencies(&handle.snapshot());
    assert_eq!(freqs.len(), 1);
    assert!((freqs[0] - 1000.0).abs() <= bin_width());
}
