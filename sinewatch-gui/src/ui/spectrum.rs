//! # Spectrum Widget
//!
//! Bar chart of the normalized magnitude spectrum on a decibel scale, with
//! the band-pass edges and the tracked tones marked on top.

use iced::widget::canvas::{self, Geometry, Path, Stroke};
use iced::widget::container;
use iced::{mouse, Color, Element, Point, Rectangle, Renderer, Size, Theme};
use sinewatch_core::filter::hz_to_bin;
use sinewatch_core::Snapshot;

/// Small epsilon value to prevent log(0) errors in magnitude calculations.
const EPSILON: f32 = 1e-12;
/// Lowest level drawn, in dB below a full-scale sine.
const FLOOR_DB: f32 = -80.0;
/// Headroom shown above the upper band edge.
const DISPLAY_MARGIN: f32 = 1.2;

/// A tone marker drawn over the bars.
#[derive(Debug, Clone, Copy)]
struct Marker {
    bin: usize,
    active: bool,
}

pub struct Spectrum {
    /// Magnitudes in [0, 1], truncated to the displayed range.
    data: Vec<f32>,
    band: (usize, usize),
    markers: Vec<Marker>,
}

impl Spectrum {
    pub fn new(snapshot: &Snapshot) -> Self {
        let bins = snapshot.magnitudes.len();
        let res = snapshot.freq_resolution;
        let settings = &snapshot.settings;

        let shown = (hz_to_bin(settings.high_cut_hz * DISPLAY_MARGIN, res, bins) + 1).min(bins);
        let markers = snapshot
            .tracks
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| Marker {
                bin: hz_to_bin(t.frequency, res, bins),
                active: t.is_active(),
            })
            .collect();

        Self {
            data: snapshot.magnitudes[..shown].to_vec(),
            band: (
                hz_to_bin(settings.low_cut_hz, res, bins),
                hz_to_bin(settings.high_cut_hz, res, bins),
            ),
            markers,
        }
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

impl<Message> canvas::Program<Message> for Spectrum {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        if !bounds.width.is_finite() || !bounds.height.is_finite() || self.data.is_empty() {
            return vec![frame.into_geometry()];
        }

        let bar_width = bounds.width / self.data.len() as f32;
        let x_of = |bin: usize| bin as f32 * bar_width + bar_width / 2.0;

        for (i, &magnitude) in self.data.iter().enumerate() {
            let db = 10.0 * (magnitude + EPSILON).log10();
            let height = ((db - FLOOR_DB) / -FLOOR_DB).clamp(0.0, 1.0) * bounds.height;

            if height > 0.0 {
                let bar = Path::rectangle(
                    Point::new(i as f32 * bar_width, bounds.height - height),
                    Size::new(bar_width.max(1.0), height),
                );
                frame.fill(&bar, Color::from_rgb8(0x34, 0x98, 0xDB));
            }
        }

        let edge_stroke = Stroke::default()
            .with_width(1.0)
            .with_color(Color::from_rgb8(0x90, 0x90, 0x90));
        for edge in [self.band.0, self.band.1] {
            if edge < self.data.len() {
                let x = x_of(edge);
                let line = Path::line(Point::new(x, 0.0), Point::new(x, bounds.height));
                frame.stroke(&line, edge_stroke.clone());
            }
        }

        for marker in &self.markers {
            if marker.bin >= self.data.len() {
                continue;
            }
            let color = if marker.active {
                Color::from_rgb8(0x34, 0xDB, 0x98) // Green
            } else {
                Color::from_rgb8(0xFF, 0xC3, 0x00) // Yellow
            };
            let x = x_of(marker.bin);
            let line = Path::line(Point::new(x, 0.0), Point::new(x, bounds.height));
            frame.stroke(&line, Stroke::default().with_width(2.0).with_color(color));
        }

        vec![frame.into_geometry()]
    }
}
