//! Renders a grid of sample images titled with their predicted and true class.
//!
//! Each cell is a title banner, green when the prediction is correct and red otherwise,
//! carrying the `Pred: <name> | Truth: <name>` title in white, on top of the grayscale
//! image upscaled by [`CELL_SCALE`]. The titles are also logged alongside the rendered file.

use crate::classes::{ClassError, FashionClass};
use crate::data::{HEIGHT, WIDTH};
use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyle, ascii::FONT_5X8},
    pixelcolor::Rgb888,
    prelude::*,
    text::{Baseline, Text},
};
use image::{Rgb, RgbImage};
use std::convert::Infallible;
use std::path::Path;
use thiserror::Error;

pub const CELL_SCALE: u32 = 4;
pub const BANNER_HEIGHT: u32 = 12;
pub const CELL_PADDING: u32 = 4;

const TITLE_FONT: &MonoFont<'static> = &FONT_5X8;
/// Space between the banner border and the title text.
const TITLE_MARGIN: u32 = 2;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const TITLE_TEXT: Rgb888 = Rgb888::WHITE;

#[derive(Error, Debug)]
pub enum VisualizeError {
    #[error("{cells} cells do not fit in a {rows}x{cols} grid")]
    GridTooSmall {
        cells: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Expected {expected} predictions and labels, found {predicted} and {truth}")]
    LengthMismatch {
        expected: usize,
        predicted: usize,
        truth: usize,
    },

    #[error(transparent)]
    Class(#[from] ClassError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleColor {
    Correct,
    Incorrect,
}

impl TitleColor {
    pub fn rgb(self) -> Rgb<u8> {
        match self {
            TitleColor::Correct => Rgb([0, 128, 0]),
            TitleColor::Incorrect => Rgb([200, 0, 0]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GridCell {
    /// Row-major brightness values in `[0, 255]`.
    ///
    /// # Shape
    /// [HEIGHT * WIDTH]
    pub image: Vec<f32>,
    pub predicted: FashionClass,
    pub truth: FashionClass,
}

fn title(predicted: FashionClass, truth: FashionClass) -> String {
    format!("Pred: {predicted} | Truth: {truth}")
}

impl GridCell {
    pub fn title(&self) -> String {
        title(self.predicted, self.truth)
    }

    pub fn is_correct(&self) -> bool {
        self.predicted == self.truth
    }

    pub fn color(&self) -> TitleColor {
        if self.is_correct() {
            TitleColor::Correct
        } else {
            TitleColor::Incorrect
        }
    }
}

#[derive(Debug, Clone)]
pub struct PredictionGrid {
    rows: usize,
    cols: usize,
    cells: Vec<GridCell>,
}

impl PredictionGrid {
    pub fn new(cells: Vec<GridCell>, rows: usize, cols: usize) -> Result<Self, VisualizeError> {
        if cells.len() > rows * cols {
            return Err(VisualizeError::GridTooSmall {
                cells: cells.len(),
                rows,
                cols,
            });
        }
        Ok(Self { rows, cols, cells })
    }

    /// Builds the grid from images and their predicted and true class indices.
    pub fn from_parts(
        images: Vec<Vec<f32>>,
        predicted: &[usize],
        truth: &[usize],
        rows: usize,
        cols: usize,
    ) -> Result<Self, VisualizeError> {
        if predicted.len() != images.len() || truth.len() != images.len() {
            return Err(VisualizeError::LengthMismatch {
                expected: images.len(),
                predicted: predicted.len(),
                truth: truth.len(),
            });
        }
        let cells = images
            .into_iter()
            .zip(predicted.iter().zip(truth))
            .map(|(image, (&predicted, &truth))| -> Result<_, VisualizeError> {
                Ok(GridCell {
                    image,
                    predicted: FashionClass::try_from(predicted)?,
                    truth: FashionClass::try_from(truth)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(cells, rows, cols)
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// Width of the longest title any cell may carry, margins included.
    fn title_width() -> u32 {
        let chars = FashionClass::ALL
            .iter()
            .map(|&class| title(class, class).chars().count())
            .max()
            .unwrap_or(0) as u32;
        let advance = TITLE_FONT.character_size.width + TITLE_FONT.character_spacing;
        chars * advance + 2 * TITLE_MARGIN
    }

    /// Width of the banner, which is also the drawable width of a cell.
    fn content_width() -> u32 {
        Self::title_width().max(WIDTH as u32 * CELL_SCALE)
    }

    fn cell_size() -> (u32, u32) {
        let width = Self::content_width() + 2 * CELL_PADDING;
        let height = BANNER_HEIGHT + HEIGHT as u32 * CELL_SCALE + 2 * CELL_PADDING;
        (width, height)
    }

    /// Top-left corner of the cell at `index`, in row-major order.
    fn cell_origin(&self, index: usize) -> (u32, u32) {
        let (cell_width, cell_height) = Self::cell_size();
        let row = (index / self.cols) as u32;
        let col = (index % self.cols) as u32;
        (col * cell_width, row * cell_height)
    }

    /// Top-left corner of the upscaled image inside the cell at `index`, centered under the banner.
    fn image_origin(&self, index: usize) -> (u32, u32) {
        let (x0, y0) = self.cell_origin(index);
        let offset = (Self::content_width() - WIDTH as u32 * CELL_SCALE) / 2;
        (
            x0 + CELL_PADDING + offset,
            y0 + CELL_PADDING + BANNER_HEIGHT,
        )
    }

    pub fn render(&self) -> RgbImage {
        let (cell_width, cell_height) = Self::cell_size();
        let mut canvas = RgbImage::from_pixel(
            self.cols as u32 * cell_width,
            self.rows as u32 * cell_height,
            BACKGROUND,
        );
        let text_style = MonoTextStyle::new(TITLE_FONT, TITLE_TEXT);

        for (index, cell) in self.cells.iter().enumerate() {
            let (x0, y0) = self.cell_origin(index);
            let (x0, y0) = (x0 + CELL_PADDING, y0 + CELL_PADDING);

            let banner = cell.color().rgb();
            for y in 0..BANNER_HEIGHT {
                for x in 0..Self::content_width() {
                    canvas.put_pixel(x0 + x, y0 + y, banner);
                }
            }
            let position = Point::new((x0 + TITLE_MARGIN) as i32, (y0 + TITLE_MARGIN) as i32);
            let Ok(_) = Text::with_baseline(&cell.title(), position, text_style, Baseline::Top)
                .draw(&mut ImageTarget(&mut canvas));

            let (x0, y0) = self.image_origin(index);
            for (i, brightness) in cell.image.iter().take(HEIGHT * WIDTH).enumerate() {
                let gray = brightness.clamp(0., 255.).round() as u8;
                let (px, py) = ((i % WIDTH) as u32, (i / WIDTH) as u32);
                for dy in 0..CELL_SCALE {
                    for dx in 0..CELL_SCALE {
                        canvas.put_pixel(
                            x0 + px * CELL_SCALE + dx,
                            y0 + py * CELL_SCALE + dy,
                            Rgb([gray, gray, gray]),
                        );
                    }
                }
            }
        }
        canvas
    }

    /// Renders the grid into a png file at `path`, creating its parent directory if needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VisualizeError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.render().save(path)?;

        for (index, cell) in self.cells.iter().enumerate() {
            let mark = match cell.color() {
                TitleColor::Correct => "ok",
                TitleColor::Incorrect => "!!",
            };
            log::info!("[{index}] {mark} {}", cell.title());
        }
        log::info!("Saved the prediction grid into {path:?}");
        Ok(())
    }
}

/// Lets embedded-graphics draw into an [`RgbImage`]. Pixels outside of the image are dropped.
struct ImageTarget<'a>(&'a mut RgbImage);

impl OriginDimensions for ImageTarget<'_> {
    fn size(&self) -> Size {
        let (width, height) = self.0.dimensions();
        Size::new(width, height)
    }
}

impl DrawTarget for ImageTarget<'_> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = self.0.dimensions();
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            if x < width && y < height {
                self.0.put_pixel(x, y, Rgb([color.r(), color.g(), color.b()]));
            }
        }
        Ok(())
    }
}
