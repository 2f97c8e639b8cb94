use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_filled_rect_mut, rect::Rect};

use super::font::{self, GLYPH_HEIGHT};
use crate::domain::legend::Legend;

pub const LEGEND_WIDTH: u32 = 200;
pub const ROW_HEIGHT: u32 = 30;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const SWATCH_LEFT: i32 = 10;
const SWATCH_RIGHT: i32 = 30;
const SWATCH_MARGIN: i32 = 10;
const LABEL_LEFT: i32 = 40;
const TEXT_SCALE: u32 = 2;

/// Side panel listing one swatch + name per legend entry.
#[derive(Debug, Clone)]
pub struct LegendRenderer {
    width: u32,
    row_height: u32,
}

impl Default for LegendRenderer {
    fn default() -> Self {
        Self { width: LEGEND_WIDTH, row_height: ROW_HEIGHT }
    }
}

impl LegendRenderer {
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Rows that do not fit in `height` are simply not drawn.
    pub fn render(&self, legend: &Legend, height: u32) -> RgbImage {
        let mut panel = RgbImage::from_pixel(self.width, height, BACKGROUND);
        let row_h = self.row_height as i32;

        for (i, entry) in legend.entries().iter().enumerate() {
            let top = i as i32 * row_h;
            if top >= height as i32 {
                break;
            }

            let swatch_h = (row_h - 2 * SWATCH_MARGIN).max(1) as u32;
            let swatch = Rect::at(SWATCH_LEFT, top + SWATCH_MARGIN)
                .of_size((SWATCH_RIGHT - SWATCH_LEFT) as u32, swatch_h);
            draw_filled_rect_mut(&mut panel, swatch, entry.color);

            let text_top = top + (row_h - (GLYPH_HEIGHT * TEXT_SCALE) as i32) / 2;
            font::draw_text(&mut panel, &entry.class_name, LABEL_LEFT, text_top, TEXT_COLOR, TEXT_SCALE);
        }
        panel
    }
}
