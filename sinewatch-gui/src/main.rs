//! # Sinewatch - Keyed Tone Tracker GUI
//!
//! This module contains the main GUI application for Sinewatch.
//! It shows the live spectrum, the tracked tones and the decoded symbol
//! stream, and exposes the detector parameters.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application with dark theme
//! - **Audio Thread**: Dedicated thread running the detector on each captured frame
//! - **Communication**: Frames arrive over a crossbeam channel; results are
//!   read back through the detector's lock-guarded snapshot
//! - **Updates**: 30 FPS redraws via the subscription system

mod ui;

use crossbeam_channel::Sender;
use cpal::traits::StreamTrait;
use iced::{self, Element, Subscription, Theme};
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use sinewatch_core::{audio, Detector, DetectorHandle, Settings, Snapshot};
use ui::main_display::create_main_view;

/// Parameter file read at startup and by "Load Settings".
const SETTINGS_PATH: &str = "sinewatch.conf";

// Step sizes for the parameter buttons
const GAIN_STEP_DB: f32 = 1.0;
const LOW_CUT_STEP_HZ: f32 = 50.0;
const HIGH_CUT_STEP_HZ: f32 = 500.0;
const PERSISTENCE_STEP_MS: u64 = 10;
const SQUELCH_STEP: f32 = 0.05;

/// Frames buffered between the device callback and the analysis thread.
const FRAME_QUEUE_DEPTH: usize = 8;

/// Main entry point for the Sinewatch application.
pub fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting Sinewatch...");
    let result = iced::application("Sinewatch", SinewatchApp::update, SinewatchApp::view)
        .subscription(SinewatchApp::subscription)
        .theme(SinewatchApp::theme)
        .run();
    log::info!("Application finished with result: {:?}", result);
    result
}

/// Application message types for the Iced GUI framework.
#[derive(Debug, Clone)]
pub enum Message {
    // Parameter adjustments
    GainUp,
    GainDown,
    LowCutUp,
    LowCutDown,
    HighCutUp,
    HighCutDown,
    PersistenceUp,
    PersistenceDown,
    ToggleAveraging,
    ToggleSquelch,
    SquelchUp,
    SquelchDown,

    // Settings file
    SaveSettings,
    LoadSettings,

    // Panel visibility toggles
    ToggleSpectrum,
    ToggleTracks,

    // Application control
    Exit,

    // Continuous update message
    Tick,
}

/// UI-specific data needed for rendering the interface.
#[derive(Debug, Clone)]
pub struct AppDisplayData {
    pub audio_worker_active: bool,
    /// Latest copy of the detector state.
    pub snapshot: Snapshot,
    pub spectrum_visible: bool,
    pub tracks_visible: bool,
}

/// Main application state.
#[derive(Debug)]
struct SinewatchApp {
    detector: DetectorHandle,
    audio_worker: Option<AudioWorker>,
    display_data: AppDisplayData,
}

/// Audio worker thread management structure.
#[derive(Debug)]
struct AudioWorker {
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Default for SinewatchApp {
    /// Creates the application, loads saved settings and starts the audio thread.
    fn default() -> Self {
        let settings = if Path::new(SETTINGS_PATH).exists() {
            match load_settings(SETTINGS_PATH) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", SETTINGS_PATH);
                    settings
                }
                Err(e) => {
                    log::warn!("Could not read {}: {}; using defaults", SETTINGS_PATH, e);
                    Settings::default()
                }
            }
        } else {
            Settings::default()
        };

        let detector = DetectorHandle::new(settings);
        let mut app = Self {
            display_data: AppDisplayData {
                audio_worker_active: false,
                snapshot: detector.snapshot(),
                spectrum_visible: true,
                tracks_visible: true,
            },
            detector,
            audio_worker: None,
        };

        app.start_audio_processing();
        app
    }
}

impl SinewatchApp {
    /// Spawns the dedicated audio thread.
    ///
    /// The thread opens the capture stream, builds the detector for the
    /// device's sample rate and runs it on every frame until shutdown.
    fn start_audio_processing(&mut self) {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let handle = self.detector.clone();

        let thread_handle = thread::spawn(move || {
            log::info!("Audio thread starting");
            let (frame_tx, frame_rx) = crossbeam_channel::bounded(FRAME_QUEUE_DEPTH);

            let (stream, sample_rate) = match audio::start_audio_capture(frame_tx) {
                Ok(tuple) => tuple,
                Err(e) => {
                    log::error!("Fatal error starting audio: {:#}", e);
                    return;
                }
            };

            let mut detector = match Detector::new(sample_rate, handle) {
                Ok(detector) => detector,
                Err(e) => {
                    log::error!("Fatal error building detector: {}", e);
                    return;
                }
            };

            loop {
                crossbeam_channel::select! {
                    recv(frame_rx) -> msg => match msg {
                        Ok(frame) => {
                            if let Err(e) = detector.process_frame(&frame.samples, frame.timestamp_ms) {
                                log::warn!("Dropped frame: {}", e);
                            }
                        }
                        Err(_) => {
                            log::warn!("Audio channel closed");
                            break;
                        }
                    },
                    recv(shutdown_rx) -> _ => {
                        log::info!("Audio thread received shutdown signal");
                        break;
                    },
                }
            }

            if let Err(e) = stream.pause() {
                log::warn!("Error pausing stream: {}", e);
            }
            drop(stream);
            log::info!("Audio thread finished");
        });

        self.audio_worker = Some(AudioWorker {
            shutdown_tx,
            thread_handle: Some(thread_handle),
        });
        self.display_data.audio_worker_active = true;
    }

    fn stop_audio_processing(&mut self) {
        if let Some(mut worker) = self.audio_worker.take() {
            let _ = worker.shutdown_tx.send(());
            if let Some(handle) = worker.thread_handle.take() {
                if handle.join().is_err() {
                    log::error!("Audio thread panicked");
                }
            }
        }
        self.display_data.audio_worker_active = false;
    }

    /// Handles application state updates based on incoming messages.
    fn update(&mut self, message: Message) {
        log::trace!("Received message: {:?}", message);

        match message {
            Message::Exit => {
                log::info!("Exit requested");
                self.stop_audio_processing();
                std::process::exit(0);
            }
            Message::GainUp => self.adjust(|s| s.set_gain_db(s.gain_db + GAIN_STEP_DB)),
            Message::GainDown => self.adjust(|s| s.set_gain_db(s.gain_db - GAIN_STEP_DB)),
            Message::LowCutUp => {
                self.adjust(|s| s.set_band(s.low_cut_hz + LOW_CUT_STEP_HZ, s.high_cut_hz))
            }
            Message::LowCutDown => {
                self.adjust(|s| s.set_band(s.low_cut_hz - LOW_CUT_STEP_HZ, s.high_cut_hz))
            }
            Message::HighCutUp => {
                self.adjust(|s| s.set_band(s.low_cut_hz, s.high_cut_hz + HIGH_CUT_STEP_HZ))
            }
            Message::HighCutDown => {
                self.adjust(|s| s.set_band(s.low_cut_hz, s.high_cut_hz - HIGH_CUT_STEP_HZ))
            }
            Message::PersistenceUp => self.adjust(|s| {
                s.set_persistence_ms(s.persistence_ms + PERSISTENCE_STEP_MS);
                Ok(())
            }),
            Message::PersistenceDown => self.adjust(|s| {
                s.set_persistence_ms(s.persistence_ms.saturating_sub(PERSISTENCE_STEP_MS));
                Ok(())
            }),
            Message::ToggleAveraging => self.adjust(|s| {
                s.averaging = !s.averaging;
                Ok(())
            }),
            Message::ToggleSquelch => self.adjust(|s| {
                s.squelch = !s.squelch;
                Ok(())
            }),
            Message::SquelchUp => self.adjust(|s| {
                s.set_squelch_threshold(s.squelch_threshold + SQUELCH_STEP);
                Ok(())
            }),
            Message::SquelchDown => self.adjust(|s| {
                s.set_squelch_threshold(s.squelch_threshold - SQUELCH_STEP);
                Ok(())
            }),
            Message::SaveSettings => match save_settings(&self.detector.settings(), SETTINGS_PATH) {
                Ok(()) => log::info!("Settings saved to {}", SETTINGS_PATH),
                Err(e) => log::error!("Error saving settings: {}", e),
            },
            Message::LoadSettings => match load_settings(SETTINGS_PATH) {
                Ok(settings) => match self.detector.replace_settings(settings) {
                    Ok(()) => log::info!("Settings loaded from {}", SETTINGS_PATH),
                    Err(e) => log::error!("Rejected settings from {}: {}", SETTINGS_PATH, e),
                },
                Err(e) => log::error!("Error loading settings: {}", e),
            },
            Message::ToggleSpectrum => {
                self.display_data.spectrum_visible = !self.display_data.spectrum_visible;
            }
            Message::ToggleTracks => {
                self.display_data.tracks_visible = !self.display_data.tracks_visible;
            }
            Message::Tick => {
                // One short lock per redraw; drawing works on the copy.
                self.display_data.snapshot = self.detector.snapshot();
            }
        }
    }

    /// Applies a validated settings change, logging rejected values.
    fn adjust(&self, change: impl FnOnce(&mut Settings) -> sinewatch_core::Result<()>) {
        if let Err(e) = self.detector.update_settings(change).and_then(|applied| applied) {
            log::warn!("Rejected setting: {}", e);
        }
    }

    /// Renders the main application interface.
    fn view(&self) -> Element<'_, Message> {
        create_main_view(&self.display_data)
    }

    /// Redraw timer, roughly 30 FPS.
    fn subscription(&self) -> Subscription<Message> {
        iced::time::every(Duration::from_millis(33)).map(|_| Message::Tick)
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

// --- Settings Save/Load Functions ---

use std::fs;

/// Writes the settings as `key=value` lines.
fn save_settings(settings: &Settings, path: &str) -> std::io::Result<()> {
    fs::write(path, settings.to_kv_string())
}

/// Reads a `key=value` settings file; missing keys take their defaults.
fn load_settings(path: &str) -> std::io::Result<Settings> {
    let data = fs::read_to_string(path)?;
    Ok(Settings::from_kv_str(&data))
}
