//! # Main Display Module
//!
//! This module contains the main display components and layout logic
//! for the Sinewatch application.

use iced::widget::{button, column, container, horizontal_space, row, text, Space};
use iced::{Alignment, Element, Length};
use sinewatch_core::Settings;

use super::{spectrum, track_list};
use crate::{AppDisplayData, Message};

/// Configuration for a single button in the settings sidebar
#[derive(Debug, Clone)]
struct ButtonConfig {
    label: &'static str,
    message: Message,
}

const VIEW_BUTTONS: &[ButtonConfig] = &[
    ButtonConfig { label: "Spectrum", message: Message::ToggleSpectrum },
    ButtonConfig { label: "Tracks", message: Message::ToggleTracks },
];

const PROGRAM_BUTTONS: &[ButtonConfig] = &[
    ButtonConfig { label: "Save Settings", message: Message::SaveSettings },
    ButtonConfig { label: "Load Settings", message: Message::LoadSettings },
    ButtonConfig { label: "Quit", message: Message::Exit },
];

/// Creates the complete main application view
pub fn create_main_view(data: &AppDisplayData) -> Element<'static, Message> {
    if !data.audio_worker_active {
        return container(text("Audio stopped").size(40))
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into();
    }

    let title = text("Sinewatch").size(28);

    let mut panels = column![title, Space::with_height(10), create_status_line(data)].spacing(10);
    if let Some(panel) = create_spectrum_panel(data) {
        panels = panels.push(panel);
    }
    if let Some(panel) = create_tracks_panel(data) {
        panels = panels.push(panel);
    }
    panels = panels.push(create_symbols_panel(data));

    let main_content = row![
        panels.width(Length::Fill),
        Space::with_width(10),
        create_sidebar(&data.snapshot.settings),
    ]
    .align_y(Alignment::Start)
    .padding(20);

    container(main_content)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

/// One-line summary of what is currently heard.
fn create_status_line(data: &AppDisplayData) -> Element<'static, Message> {
    let snapshot = &data.snapshot;
    let active = snapshot.active_tracks().count();

    let (message, color) = if snapshot.freq_resolution == 0.0 {
        ("Waiting for audio...".to_string(), iced::Color::from_rgb(0.6, 0.6, 0.6))
    } else if active == 0 {
        (
            "No pure sine wave detected. Listening...".to_string(),
            iced::Color::from_rgb8(0xFF, 0xFF, 0x00),
        )
    } else {
        (
            format!("{} tone(s) detected", active),
            iced::Color::from_rgb8(0x00, 0xFF, 0x00),
        )
    };

    row![
        text(message).size(18).color(color),
        horizontal_space(),
        text(format!("{:.2} Hz/bin", snapshot.freq_resolution)).size(14),
    ]
    .align_y(Alignment::Center)
    .into()
}

/// Creates the spectrum panel widget.
fn create_spectrum_panel(data: &AppDisplayData) -> Option<Element<'static, Message>> {
    if !data.spectrum_visible {
        return None;
    }

    let spectrum_content = container(spectrum::Spectrum::new(&data.snapshot).view())
        .width(Length::Fill)
        .height(Length::Fill);

    let panel = container(
        column![text("Spectrum").size(18), Space::with_height(10), spectrum_content]
            .spacing(5)
            .padding(15),
    )
    .width(Length::Fill)
    .height(Length::Fixed(260.0));

    Some(panel.into())
}

/// Creates the track list panel.
fn create_tracks_panel(data: &AppDisplayData) -> Option<Element<'static, Message>> {
    if !data.tracks_visible {
        return None;
    }

    let tracks_content = container(track_list::TrackList::new(data.snapshot.tracks.clone()).view())
        .width(Length::Fill)
        .height(Length::Fill);

    let panel = container(
        column![text("Tracks").size(18), Space::with_height(10), tracks_content]
            .spacing(5)
            .padding(15),
    )
    .width(Length::Fill)
    .height(Length::Fixed(160.0));

    Some(panel.into())
}

/// Creates the decoded symbol panel.
fn create_symbols_panel(data: &AppDisplayData) -> Element<'static, Message> {
    let transcript = data.snapshot.transcript();
    let transcript = if transcript.is_empty() {
        "(no symbols yet)".to_string()
    } else {
        transcript
    };

    container(
        column![
            row![
                text("Symbols").size(18),
                horizontal_space(),
                text(format!("Unit: {:.0} ms", data.snapshot.dot_ms)).size(14),
            ]
            .align_y(Alignment::Center),
            Space::with_height(10),
            text(transcript).size(22),
        ]
        .spacing(5)
        .padding(15),
    )
    .width(Length::Fill)
    .into()
}

/// Creates the settings sidebar widget.
///
/// Parameter rows show the live value between a decrement and an increment
/// button; toggles show their state in the label.
fn create_sidebar(settings: &Settings) -> Element<'static, Message> {
    let parameters = column![
        make_parameter_row(
            "Gain",
            format!("{:+.0} dB", settings.gain_db),
            Message::GainDown,
            Message::GainUp
        ),
        make_parameter_row(
            "Low cut",
            format!("{:.0} Hz", settings.low_cut_hz),
            Message::LowCutDown,
            Message::LowCutUp
        ),
        make_parameter_row(
            "High cut",
            format!("{:.0} Hz", settings.high_cut_hz),
            Message::HighCutDown,
            Message::HighCutUp
        ),
        make_parameter_row(
            "Persistence",
            format!("{} ms", settings.persistence_ms),
            Message::PersistenceDown,
            Message::PersistenceUp
        ),
        make_parameter_row(
            "Squelch level",
            format!("{:.2}", settings.squelch_threshold),
            Message::SquelchDown,
            Message::SquelchUp
        ),
        make_toggle("Averaging", settings.averaging, Message::ToggleAveraging),
        make_toggle("Squelch", settings.squelch, Message::ToggleSquelch),
    ]
    .spacing(8);

    let sections = column![
        make_section("Detector", parameters.into()),
        make_section("View", make_button_list(VIEW_BUTTONS)),
        make_section("Program", make_button_list(PROGRAM_BUTTONS)),
    ]
    .spacing(10);

    container(sections.padding(15))
        .width(Length::Fixed(280.0))
        .height(Length::Fill)
        .into()
}

fn make_parameter_row(
    label: &'static str,
    value: String,
    decrease: Message,
    increase: Message,
) -> Element<'static, Message> {
    row![
        text(label).size(14).width(Length::Fixed(100.0)),
        button(text("-").size(14)).padding([4, 10]).on_press(decrease),
        text(value)
            .size(14)
            .width(Length::Fill)
            .align_x(iced::alignment::Horizontal::Center),
        button(text("+").size(14)).padding([4, 10]).on_press(increase),
    ]
    .spacing(4)
    .align_y(Alignment::Center)
    .into()
}

fn make_toggle(label: &'static str, enabled: bool, message: Message) -> Element<'static, Message> {
    let state = if enabled { "on" } else { "off" };
    let mut toggle = button(text(format!("{}: {}", label, state)).size(14).width(Length::Fill))
        .padding([6, 10])
        .on_press(message);

    if enabled {
        toggle = toggle.style(|_theme, _status| button::Style {
            background: Some(iced::Background::Color(iced::Color::from_rgb(0.2, 0.6, 0.3))),
            text_color: iced::Color::WHITE,
            ..button::Style::default()
        });
    }
    toggle.into()
}

fn make_button_list(buttons: &[ButtonConfig]) -> Element<'static, Message> {
    buttons
        .iter()
        .fold(column![].spacing(8), |col, config| {
            col.push(
                button(text(config.label).size(14).width(Length::Fill))
                    .padding([6, 10])
                    .on_press(config.message.clone()),
            )
        })
        .into()
}

/// Creates a sidebar section with a title above its contents.
fn make_section(title: &'static str, contents: Element<'static, Message>) -> Element<'static, Message> {
    column![text(title).size(18), Space::with_height(10), contents]
        .spacing(5)
        .into()
}
