//! Text-only PNG layout using the `font8x8` bitmap glyphs.

use std::path::Path;

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{ImageFormat, ImageResult, Rgb, RgbImage};

const WIDTH: u32 = 1200;
const MARGIN: u32 = 32;
const LINE_GAP: u32 = 18;
const GLYPH: u32 = 8;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([20, 20, 20]);
const MUTED: Rgb<u8> = Rgb([90, 90, 90]);

/// One centered line of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    pub text: String,
    /// Integer pixel scale applied to the 8x8 glyphs.
    pub scale: u32,
    pub muted: bool,
}

impl TextLine {
    pub fn title(text: impl Into<String>) -> Self {
        Self::new(text, 3, false)
    }

    pub fn heading(text: impl Into<String>) -> Self {
        Self::new(text, 2, false)
    }

    pub fn body(text: impl Into<String>) -> Self {
        Self::new(text, 2, false)
    }

    pub fn small(text: impl Into<String>) -> Self {
        Self::new(text, 2, false)
    }

    pub fn footer(text: impl Into<String>) -> Self {
        Self::new(text, 2, true)
    }

    fn new(text: impl Into<String>, scale: u32, muted: bool) -> Self {
        Self {
            text: text.into(),
            scale,
            muted,
        }
    }

    fn height(&self) -> u32 {
        GLYPH * self.scale
    }

    #[allow(clippy::cast_possible_truncation)]
    fn width(&self) -> u32 {
        visible_chars(&self.text).count() as u32 * GLYPH * self.scale
    }
}

/// Characters that occupy a cell. Stored names are NFKD, so accents arrive
/// as separate combining marks; dropping them leaves the base letter.
fn visible_chars(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars()
        .filter(|&c| !matches!(c, '\u{0300}'..='\u{036F}'))
}

/// Lays `lines` out top to bottom on a white canvas.
///
/// Characters without a glyph are drawn as `?`; text wider than the canvas
/// is clipped.
#[must_use]
pub fn render_lines(lines: &[TextLine]) -> RgbImage {
    let content: u32 = lines.iter().map(|l| l.height() + LINE_GAP).sum();
    let height = content + 2 * MARGIN;
    let mut image = RgbImage::from_pixel(WIDTH, height, BACKGROUND);

    let mut y = MARGIN;
    for line in lines {
        let x = WIDTH.saturating_sub(line.width()) / 2;
        let color = if line.muted { MUTED } else { INK };
        draw_text(&mut image, &line.text, x, y, line.scale, color);
        y += line.height() + LINE_GAP;
    }
    image
}

fn draw_text(image: &mut RgbImage, text: &str, x: u32, y: u32, scale: u32, color: Rgb<u8>) {
    let advance = GLYPH * scale;
    for (i, ch) in visible_chars(text).enumerate() {
        let glyph = BASIC_FONTS
            .get(ch)
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8]);
        #[allow(clippy::cast_possible_truncation)]
        let origin_x = x + i as u32 * advance;
        if origin_x >= image.width() {
            break;
        }
        draw_glyph(image, &glyph, origin_x, y, scale, color);
    }
}

fn draw_glyph(image: &mut RgbImage, glyph: &[u8; 8], x: u32, y: u32, scale: u32, color: Rgb<u8>) {
    for (row, bits) in (0u32..).zip(glyph.iter()) {
        for col in 0..GLYPH {
            if bits & (1 << col) == 0 {
                continue;
            }
            for dy in 0..scale {
                for dx in 0..scale {
                    let px = x + col * scale + dx;
                    let py = y + row * scale + dy;
                    if px < image.width() && py < image.height() {
                        image.put_pixel(px, py, color);
                    }
                }
            }
        }
    }
}

/// Encodes `image` as PNG at `path`, creating parent directories.
///
/// Writes to a temporary sibling first and renames it over `path`, so a
/// concurrent reader sees either the old or the new file.
///
/// # Errors
///
/// Returns an error if a directory cannot be created or the file cannot be
/// encoded, written or renamed.
pub fn write_png(image: &RgbImage, path: &Path) -> ImageResult<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("png.tmp");
    image.save_with_format(&tmp, ImageFormat::Png)?;
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ink_pixels(image: &RgbImage) -> usize {
        image.pixels().filter(|p| **p != BACKGROUND).count()
    }

    #[test]
    fn canvas_height_grows_with_lines() {
        let one = render_lines(&[TextLine::body("a")]);
        let two = render_lines(&[TextLine::body("a"), TextLine::body("b")]);
        assert_eq!(one.width(), WIDTH);
        assert!(two.height() > one.height());
    }

    #[test]
    fn text_is_drawn() {
        let blank = render_lines(&[TextLine::body("")]);
        let inked = render_lines(&[TextLine::body("Total number of countries: 3")]);
        assert_eq!(ink_pixels(&blank), 0);
        assert!(ink_pixels(&inked) > 0);
    }

    #[test]
    fn unknown_glyphs_fall_back_instead_of_vanishing() {
        let image = render_lines(&[TextLine::body("\u{4E2D}")]);
        assert!(ink_pixels(&image) > 0);
    }

    #[test]
    fn combining_marks_take_no_cell() {
        assert_eq!(TextLine::body("Re\u{0301}union").width(), TextLine::body("Reunion").width());
    }

    #[test]
    fn overlong_lines_are_clipped() {
        let long = "W".repeat(500);
        let image = render_lines(&[TextLine::title(long)]);
        assert_eq!(image.width(), WIDTH);
    }

    #[test]
    fn write_png_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("summary.png");
        write_png(&render_lines(&[TextLine::body("x")]), &path).unwrap();
        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.width(), WIDTH);
    }
}
