//! # Track List Widget
//!
//! Lists every track slot with its frequency, purity and state, using a
//! Canvas like the other panels.

use iced::widget::canvas::{self, Frame, Geometry, Text};
use iced::widget::container;
use iced::{Color, Element, Point, Rectangle, Renderer, Theme};
use sinewatch_core::{Track, TrackPhase};

pub struct TrackList {
    tracks: Vec<Track>,
}

impl TrackList {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fill),
        )
        .into()
    }
}

impl<Message> canvas::Program<Message> for TrackList {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        theme: &Theme,
        bounds: Rectangle,
        _cursor: iced::mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        let text_color = theme.palette().text;

        let start_y: f32 = 10.0;
        let line_height: f32 = 24.0;
        let padding: f32 = 15.0;

        for (i, track) in self.tracks.iter().enumerate() {
            let y = start_y + i as f32 * line_height;

            let (detail, state, color) = match track.phase {
                TrackPhase::Empty => ("--".to_string(), "idle", Color::from_rgb(0.5, 0.5, 0.5)),
                TrackPhase::Pending { .. } => (
                    format!("{:.2} Hz", track.frequency),
                    "pending",
                    Color::from_rgb8(0xFF, 0xC3, 0x00),
                ),
                TrackPhase::Active { .. } => (
                    format!("{:.2} Hz | Purity: {:.2}%", track.frequency, track.purity),
                    "ACTIVE",
                    Color::from_rgb8(0x34, 0xDB, 0x98),
                ),
            };

            frame.fill_text(Text {
                content: format!("Track {}", i + 1),
                position: Point::new(padding, y),
                color: text_color,
                size: 16.0.into(),
                horizontal_alignment: iced::alignment::Horizontal::Left,
                vertical_alignment: iced::alignment::Vertical::Top,
                ..Text::default()
            });

            frame.fill_text(Text {
                content: detail,
                position: Point::new(padding + 90.0, y),
                color: text_color,
                size: 16.0.into(),
                horizontal_alignment: iced::alignment::Horizontal::Left,
                vertical_alignment: iced::alignment::Vertical::Top,
                ..Text::default()
            });

            frame.fill_text(Text {
                content: state.to_string(),
                position: Point::new(bounds.width - padding, y),
                color,
                size: 16.0.into(),
                horizontal_alignment: iced::alignment::Horizontal::Right,
                vertical_alignment: iced::alignment::Vertical::Top,
                ..Text::default()
            });
        }

        vec![frame.into_geometry()]
    }
}
