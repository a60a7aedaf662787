use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;

use crate::render::Framebuffer;

/// Convert 8-bit RGB to Rgb565.
pub const fn rgb(r: u8, g: u8, b: u8) -> Rgb565 {
    Rgb565::new(r >> 3, g >> 2, b >> 3)
}

/// Convert a 0xRRGGBB literal to Rgb565.
pub const fn hex(c: u32) -> Rgb565 {
    rgb((c >> 16) as u8, (c >> 8) as u8, c as u8)
}

// ── Panel ───────────────────────────────────────────────────────────

pub const MATRIX_W: u32 = 64;
pub const MATRIX_H: u32 = 32;

pub const BG: Rgb565 = hex(0x000000);

// ── Text colors ─────────────────────────────────────────────────────

pub const TEXT_TIME: Rgb565 = hex(0xFF0000);
pub const TEXT_WEEKDAY: Rgb565 = hex(0x8693FF);
pub const TEXT_DATE: Rgb565 = hex(0x01949A);
pub const TEXT_WEATHER: Rgb565 = hex(0x86FFA2);
pub const TEXT_CONDITION: Rgb565 = hex(0x01949A);

// ── Positions (left edge, vertical centre of the glyph row) ─────────

pub const TIME_POS: Point = Point::new(0, 4);
pub const CLOUD_POS: Point = Point::new(38, 0);
pub const WEEKDAY_POS: Point = Point::new(0, 12);
pub const DATE_POS: Point = Point::new(20, 12);
pub const WEATHER_POS: Point = Point::new(0, 20);
pub const CONDITION_POS: Point = Point::new(0, 28);

// ── Cloud icon ──────────────────────────────────────────────────────

pub const CLOUD_W: usize = 20;
pub const CLOUD_H: usize = 12;

/// Index 0 is transparent.
pub const CLOUD_PALETTE: [Rgb565; 5] = [
    hex(0x000000),
    hex(0xFFFFFF),
    hex(0x9EB4FF),
    hex(0x4169E1),
    hex(0x1E3B8C),
];

#[rustfmt::skip]
pub const CLOUD: [[u8; CLOUD_W]; CLOUD_H] = [
    [0,0,0,0,1,1,1,1,1,0,0,0,0,0,0,0,0,0,0,0],
    [0,0,0,1,1,1,1,1,1,2,2,2,0,0,0,0,0,0,0,0],
    [0,0,1,1,1,1,1,1,2,2,2,2,2,2,0,0,0,0,0,0],
    [0,1,1,1,1,1,1,2,2,2,2,2,2,2,3,3,3,0,0,0],
    [1,1,1,1,1,2,2,2,2,2,2,2,3,3,3,3,3,3,0,0],
    [1,1,2,2,2,2,2,2,2,2,2,3,3,3,3,3,3,3,3,0],
    [0,2,2,2,3,3,3,3,3,3,3,3,3,4,4,4,4,4,0,0],
    [0,0,3,3,3,3,3,3,3,3,3,4,4,4,4,4,4,0,0,0],
    [0,0,0,0,3,3,3,4,4,4,4,4,4,4,4,0,0,0,0,0],
    [0,0,0,0,0,4,4,4,4,4,4,4,0,0,0,0,0,0,0,0],
    [0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0],
    [0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0],
];

// ── Helpers ─────────────────────────────────────────────────────────

/// Blit a palette-indexed bitmap with its top-left corner at `origin`.
pub fn draw_indexed<const W: usize, const H: usize>(
    fb: &mut Framebuffer,
    origin: Point,
    bitmap: &[[u8; W]; H],
    palette: &[Rgb565],
) {
    let pixels = bitmap.iter().enumerate().flat_map(|(y, row)| {
        row.iter().enumerate().filter_map(move |(x, &idx)| {
            if idx == 0 {
                return None;
            }
            let color = *palette.get(usize::from(idx))?;
            Some(Pixel(origin + Point::new(x as i32, y as i32), color))
        })
    });
    fb.draw_iter(pixels).ok();
}
