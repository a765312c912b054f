//! Readout text formatting and rendering.
//!
//! The loop formats its cycle summary into a handful of short text lines
//! and hands them to a [`Readout`] implementation. Rendering onto an
//! `embedded-graphics` target is shared here so the OLED panel and the
//! desktop simulator draw identically.

use core::fmt::Write;

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_10X20};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::{Baseline, Text};
use embedded_layout::align::{Align, horizontal, vertical};

use crate::config::DisplayGeometry;
use crate::readings::{EnvReading, VocReading};

/// Characters per readout line; longer content is truncated, not wrapped.
pub const LINE_CAP: usize = 24;
/// Lines the readout can show at once.
pub const MAX_LINES: usize = 3;

pub type ReadoutLines = heapless::Vec<heapless::String<LINE_CAP>, MAX_LINES>;

/// A best-effort text display. Failures are logged and ignored by the
/// loop; a stale panel is not fatal.
pub trait Readout {
    type Error: core::fmt::Debug;

    fn show(&mut self, lines: &ReadoutLines) -> impl Future<Output = Result<(), Self::Error>>;
}

pub fn c_to_f(celsius: f32) -> f32 {
    celsius * 1.8 + 32.0
}

/// Format one cycle's values into readout lines.
///
/// With environment or VOC data available the panel shows three rows:
/// temperature, humidity/gas, and the index. With neither (the bare
/// particulate deployment) it shows just the index, large and centered.
pub fn format_readout(
    env: Option<&EnvReading>,
    voc: Option<VocReading>,
    index: u16,
) -> ReadoutLines {
    let mut lines = ReadoutLines::new();

    if env.is_none() && voc.is_none() {
        let mut line = heapless::String::new();
        let _ = write!(line, "{index}");
        let _ = lines.push(line);
        return lines;
    }

    if let Some(env) = env {
        let mut line = heapless::String::new();
        let _ = write!(
            line,
            "{:.2} C  {:.2} F",
            env.temperature_c,
            c_to_f(env.temperature_c)
        );
        let _ = lines.push(line);
    }

    let mut line = heapless::String::new();
    match (env, voc) {
        (Some(env), Some(voc)) => {
            let _ = write!(
                line,
                "{:.1} %RH  {} ppm",
                env.relative_humidity, voc.eco2_ppm
            );
        }
        (Some(env), None) => {
            let _ = write!(line, "{:.1} %RH", env.relative_humidity);
        }
        (None, Some(voc)) => {
            let _ = write!(line, "{} ppm  {} ppb", voc.eco2_ppm, voc.tvoc_ppb);
        }
        (None, None) => unreachable!(),
    }
    let _ = lines.push(line);

    let mut line = heapless::String::new();
    let _ = write!(line, "AQI {index}");
    let _ = lines.push(line);

    lines
}

/// Draws readout lines onto any monochrome `embedded-graphics` target.
#[derive(Debug, Clone, Copy)]
pub struct ReadoutScreen {
    geometry: DisplayGeometry,
}

impl ReadoutScreen {
    /// Left margin and line pitch for the row layout.
    const MARGIN_X: i32 = 5;
    const LINE_PITCH: i32 = 11;

    pub const fn new(geometry: DisplayGeometry) -> Self {
        Self { geometry }
    }

    pub fn draw<D>(&self, lines: &ReadoutLines, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        target.clear(BinaryColor::Off)?;

        if let [line] = lines.as_slice() {
            // Single value: large and centered, the way the bare
            // particulate station has always shown its index.
            let style = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
            let bounds = Rectangle::new(
                Point::zero(),
                Size::new(
                    u32::from(self.geometry.width),
                    u32::from(self.geometry.height),
                ),
            );
            Text::new(line, Point::zero(), style)
                .align_to(&bounds, horizontal::Center, vertical::Center)
                .draw(target)?;
            return Ok(());
        }

        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        for (row, line) in lines.iter().enumerate() {
            let origin = Point::new(Self::MARGIN_X, Self::LINE_PITCH * row as i32);
            Text::with_baseline(line, origin, style, Baseline::Top).draw(target)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_to_f() {
        assert_eq!(c_to_f(0.0), 32.0);
        assert_eq!(c_to_f(100.0), 212.0);
        assert!((c_to_f(21.5) - 70.7).abs() < 1e-4);
    }

    #[test]
    fn test_full_readout_has_three_lines() {
        let env = EnvReading {
            temperature_c: 21.5,
            relative_humidity: 45.2,
        };
        let voc = VocReading {
            eco2_ppm: 612,
            tvoc_ppb: 23,
        };
        let lines = format_readout(Some(&env), Some(voc), 58);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].as_str(), "21.50 C  70.70 F");
        assert_eq!(lines[1].as_str(), "45.2 %RH  612 ppm");
        assert_eq!(lines[2].as_str(), "AQI 58");
    }

    #[test]
    fn test_index_only_readout_is_a_single_line() {
        let lines = format_readout(None, None, 137);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_str(), "137");
    }

    #[test]
    fn test_voc_without_environment() {
        let voc = VocReading {
            eco2_ppm: 400,
            tvoc_ppb: 0,
        };
        let lines = format_readout(None, Some(voc), 12);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].as_str(), "400 ppm  0 ppb");
        assert_eq!(lines[1].as_str(), "AQI 12");
    }
}
