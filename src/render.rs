use anyhow::Result;
use embedded_graphics::{
    draw_target::DrawTarget,
    geometry::{Dimensions, OriginDimensions, Size},
    mono_font::{
        iso_8859_1::{FONT_4X6, FONT_6X10},
        MonoTextStyle,
    },
    pixelcolor::{raw::RawU16, Rgb565},
    prelude::*,
    primitives::Rectangle,
    text::{Baseline, Text},
    Pixel,
};
use log::{debug, info};

use crate::display::{DisplayState, Render};
use crate::layout::*;

/// RGB565 framebuffer in plain heap memory, row-major.
pub struct Framebuffer {
    buf: Vec<u16>,
    width: u32,
    height: u32,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: vec![0; (width * height) as usize],
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear_color(&mut self, color: Rgb565) {
        let raw = RawU16::from(color).into_inner();
        self.buf.fill(raw);
    }

    /// Raw RGB565 words, row-major.
    pub fn as_raw(&self) -> &[u16] {
        &self.buf
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb565> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let raw = self.buf[(y * self.width + x) as usize];
        Some(Rgb565::from(RawU16::new(raw)))
    }

    /// Rotate the contents by 180° in place.
    ///
    /// Pixel (x, y) moves to (w-1-x, h-1-y), which for a row-major buffer is
    /// a plain reversal.
    pub fn rotate_180(&mut self) {
        self.buf.reverse();
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Framebuffer {
    type Color = Rgb565;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let w = self.width;
        let h = self.height;
        for Pixel(point, color) in pixels {
            let x = point.x;
            let y = point.y;
            if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
                let idx = (y as u32 * w + x as u32) as usize;
                self.buf[idx] = RawU16::from(color).into_inner();
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let raw = RawU16::from(color).into_inner();
        let display = self.bounding_box();
        let area = area.intersection(&display);
        let w = self.width;
        for y in area.rows() {
            let row_start = (y as u32 * w) as usize;
            for x in area.columns() {
                self.buf[row_start + x as usize] = raw;
            }
        }
        Ok(())
    }
}

/// Physical output for a finished frame.
pub trait Panel {
    fn flush(&mut self, fb: &Framebuffer) -> Result<()>;
}

/// Panel that writes each frame to the log as ASCII art, one line per row.
#[derive(Debug, Default)]
pub struct LogPanel {
    frames: usize,
}

impl LogPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl Panel for LogPanel {
    fn flush(&mut self, fb: &Framebuffer) -> Result<()> {
        self.frames += 1;
        info!("frame {}", self.frames);
        for row in fb.as_raw().chunks(fb.width() as usize) {
            let line: String = row.iter().map(|&px| shade(px)).collect();
            info!("|{}|", line);
        }
        Ok(())
    }
}

/// One character for a pixel, by rough brightness.
fn shade(raw: u16) -> char {
    let c = Rgb565::from(RawU16::new(raw));
    // Channels scaled to 0..=63.
    let level = u16::from(c.r()) * 2 + u16::from(c.g()) + u16::from(c.b()) * 2;
    match level {
        0 => ' ',
        1..=40 => '.',
        41..=90 => '+',
        _ => '#',
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Half,
}

/// Draws [`DisplayState`] onto the 64×32 matrix.
pub struct MatrixRenderer<P: Panel> {
    fb: Framebuffer,
    panel: P,
    rotation: Rotation,
    shown: Option<DisplayState>,
}

impl<P: Panel> MatrixRenderer<P> {
    pub fn new(panel: P, rotation: Rotation) -> Self {
        Self {
            fb: Framebuffer::new(MATRIX_W, MATRIX_H),
            panel,
            rotation,
            shown: None,
        }
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.fb
    }

    fn draw(&mut self, state: &DisplayState) {
        let fb = &mut self.fb;
        fb.clear_color(BG);

        let big = |c| MonoTextStyle::new(&FONT_6X10, c);
        let small = |c| MonoTextStyle::new(&FONT_4X6, c);

        Text::with_baseline(&state.time_text, TIME_POS, big(TEXT_TIME), Baseline::Middle)
            .draw(fb)
            .ok();
        draw_indexed(fb, CLOUD_POS, &CLOUD, &CLOUD_PALETTE);
        Text::with_baseline(
            &state.weekday_text,
            WEEKDAY_POS,
            small(TEXT_WEEKDAY),
            Baseline::Middle,
        )
        .draw(fb)
        .ok();
        Text::with_baseline(&state.date_text, DATE_POS, small(TEXT_DATE), Baseline::Middle)
            .draw(fb)
            .ok();
        Text::with_baseline(
            &state.weather_text,
            WEATHER_POS,
            small(TEXT_WEATHER),
            Baseline::Middle,
        )
        .draw(fb)
        .ok();
        Text::with_baseline(
            &state.condition_text,
            CONDITION_POS,
            small(TEXT_CONDITION),
            Baseline::Middle,
        )
        .draw(fb)
        .ok();

        if self.rotation == Rotation::Half {
            fb.rotate_180();
        }
    }
}

impl<P: Panel> Render for MatrixRenderer<P> {
    fn render(&mut self, state: &DisplayState) -> Result<()> {
        if self.shown.as_ref() == Some(state) {
            return Ok(());
        }
        self.draw(state);
        self.panel.flush(&self.fb)?;
        debug!("Display: {} {} {}", state.time_text, state.weekday_text, state.date_text);
        self.shown = Some(state.clone());
        Ok(())
    }
}
