//! Offscreen rendering of ant grids via palette lookup.

use std::io::Cursor;

use antlab_core::{Grid, Palette, RuleTable, Turn};
use image::{ImageBuffer, ImageFormat, Rgb};
use thiserror::Error;

pub type RgbImage = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// Largest edge, in pixels, a rendered frame may have.
pub const MAX_IMAGE_EDGE: u32 = 16_384;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cell size {cell_size} is invalid for a {grid_size}x{grid_size} grid")]
    InvalidCellSize { cell_size: u32, grid_size: u32 },
    #[error("failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
}

/// Rasterises `grid` with `cell_size` pixel squares per cell.
///
/// Cells whose colour has no palette entry stay white.
pub fn rasterize(grid: &Grid, palette: &Palette, cell_size: u32) -> Result<RgbImage, RenderError> {
    let size = grid.size();
    let edge = size
        .checked_mul(cell_size)
        .filter(|&edge| cell_size > 0 && edge <= MAX_IMAGE_EDGE)
        .ok_or(RenderError::InvalidCellSize {
            cell_size,
            grid_size: size,
        })?;

    let mut image = RgbImage::from_pixel(edge, edge, BACKGROUND);
    for (idx, &color) in grid.cells().iter().enumerate() {
        let Some(rgb) = palette.get(color) else {
            continue;
        };
        let x0 = (idx as u32 % size) * cell_size;
        let y0 = (idx as u32 / size) * cell_size;
        for py in y0..y0 + cell_size {
            for px in x0..x0 + cell_size {
                image.put_pixel(px, py, Rgb(rgb));
            }
        }
    }
    Ok(image)
}

/// Rasterises `grid` and encodes the frame as PNG bytes.
pub fn render_png(grid: &Grid, palette: &Palette, cell_size: u32) -> Result<Vec<u8>, RenderError> {
    let image = rasterize(grid, palette, cell_size)?;
    let mut bytes = Vec::new();
    {
        let mut cursor = Cursor::new(&mut bytes);
        image.write_to(&mut cursor, ImageFormat::Png)?;
    }
    Ok(bytes)
}

/// One `Rule c -> n  Right|Left` line per colour of `rules`.
#[must_use]
pub fn rule_legend(rules: &RuleTable) -> Vec<String> {
    rules
        .as_slice()
        .iter()
        .enumerate()
        .map(|(color, rule)| {
            let turn = match rule.turn {
                Turn::Right => "Right",
                Turn::Left => "Left",
            };
            format!("Rule {color} -> {}  {turn}", rule.next)
        })
        .collect()
}
