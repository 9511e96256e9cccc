//! Software painter for overlay primitives
//!
//! Burns an [`OverlayFrame`] into an RGBA page raster for report export.
//! Shapes go through `tiny-skia`; labels use the `font8x8` bitmap font,
//! scaled in whole pixels so digits stay crisp on any page.

use crate::scene::{OverlayFrame, Primitive, StrokeStyle};
use blueprint_core::{Color, ScreenPoint, ScreenRect};
use blueprint_render::RgbaImage;
use font8x8::{UnicodeFonts, BASIC_FONTS, GREEK_FONTS, LATIN_FONTS};
use image::Rgba;
use tiny_skia::{
    ColorU8, FillRule, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, StrokeDash, Transform,
};

/// Glyph cell edge of the bitmap font, in font pixels
const GLYPH_CELLS: usize = 8;

/// Hollow box drawn when even the `?` fallback is unavailable
const MISSING_GLYPH: [u8; 8] = [0x7E, 0x42, 0x42, 0x42, 0x42, 0x42, 0x7E, 0x00];

/// Paint every primitive of `frame` onto `image`, in order
pub fn paint_frame(image: &mut RgbaImage, frame: &OverlayFrame) {
    let Some(mut pixmap) = to_pixmap(image) else {
        return;
    };
    for primitive in frame.primitives() {
        paint_primitive(&mut pixmap, primitive);
    }
    copy_back(&pixmap, image);
}

pub fn paint_primitive(pixmap: &mut Pixmap, primitive: &Primitive) {
    match primitive {
        Primitive::Rectangle {
            rect,
            fill,
            stroke,
            stroke_width,
            style,
        } => {
            let Some(bounds) = to_rect(rect) else {
                return;
            };
            if let Some(fill) = fill {
                pixmap.fill_rect(bounds, &paint(*fill, true), Transform::identity(), None);
            }
            let path = PathBuilder::from_rect(bounds);
            stroke_path(pixmap, &path, *stroke, *stroke_width, *style);
        }
        Primitive::Circle {
            center,
            radius,
            fill,
            stroke,
            stroke_width,
        } => {
            let Some(path) = PathBuilder::from_circle(center.x, center.y, *radius) else {
                return;
            };
            if let Some(fill) = fill {
                fill_path(pixmap, &path, *fill);
            }
            stroke_path(pixmap, &path, *stroke, *stroke_width, StrokeStyle::Solid);
        }
        Primitive::Label {
            center,
            text,
            color,
            size,
        } => draw_text(pixmap, *center, text, *color, *size),
        Primitive::Pin {
            tip,
            radius,
            fill,
            outline,
        } => {
            // Head sits one radius and a half above the tip, stem joins them
            let head = ScreenPoint::new(tip.x, tip.y - radius * 1.5);
            let stem_half = (radius / 4.0).max(0.5);
            let stem = ScreenRect::new(tip.x - stem_half, head.y, stem_half * 2.0, tip.y - head.y);
            if let Some(stem) = to_rect(&stem) {
                pixmap.fill_rect(stem, &paint(*outline, true), Transform::identity(), None);
            }
            if let Some(path) = PathBuilder::from_circle(head.x, head.y, *radius) {
                fill_path(pixmap, &path, *fill);
                stroke_path(pixmap, &path, *outline, (radius / 4.0).max(1.0), StrokeStyle::Solid);
            }
        }
    }
}

fn to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let Rgba([r, g, b, a]) = *src;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

fn copy_back(pixmap: &Pixmap, image: &mut RgbaImage) {
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
}

fn paint(color: Color, anti_alias: bool) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = anti_alias;
    paint
}

fn to_rect(rect: &ScreenRect) -> Option<Rect> {
    Rect::from_xywh(rect.x, rect.y, rect.width, rect.height)
}

fn fill_path(pixmap: &mut Pixmap, path: &Path, color: Color) {
    pixmap.fill_path(path, &paint(color, true), FillRule::Winding, Transform::identity(), None);
}

fn stroke_path(pixmap: &mut Pixmap, path: &Path, color: Color, width: f32, style: StrokeStyle) {
    let dash = match style {
        StrokeStyle::Solid => None,
        StrokeStyle::Dashed { dash, gap } => StrokeDash::new(vec![dash, gap], 0.0),
    };
    let stroke = Stroke {
        width: width.max(1.0),
        dash,
        ..Stroke::default()
    };
    pixmap.stroke_path(path, &paint(color, true), &stroke, Transform::identity(), None);
}

/// Bitmap rows for `c`, least significant bit leftmost
///
/// Falls back to `?` so an unsupported character still occupies visible ink.
fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| GREEK_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or(MISSING_GLYPH)
}

/// Draw `text` centered on `center`; `size` is the glyph cell height in pixels
fn draw_text(pixmap: &mut Pixmap, center: ScreenPoint, text: &str, color: Color, size: f32) {
    let count = text.chars().count();
    if count == 0 || !center.x.is_finite() || !center.y.is_finite() {
        return;
    }
    let cell = (size / GLYPH_CELLS as f32).round().max(1.0);
    let advance = GLYPH_CELLS as f32 * cell;
    let origin_x = (center.x - count as f32 * advance / 2.0).round();
    let origin_y = (center.y - advance / 2.0).round();

    let mut builder = PathBuilder::new();
    for (index, c) in text.chars().enumerate() {
        let pen_x = origin_x + index as f32 * advance;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_CELLS {
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                let x = pen_x + col as f32 * cell;
                let y = origin_y + row as f32 * cell;
                if let Some(rect) = Rect::from_xywh(x, y, cell, cell) {
                    builder.push_rect(rect);
                }
            }
        }
    }

    if let Some(path) = builder.finish() {
        let paint = paint(color, false);
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::OverlayTarget;
    use std::ops::Range;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn canvas() -> RgbaImage {
        RgbaImage::from_pixel(100, 100, WHITE)
    }

    fn paint_one(image: &mut RgbaImage, primitive: Primitive) {
        let mut frame = OverlayFrame::new(1);
        frame.push(OverlayTarget::Draft, primitive);
        paint_frame(image, &frame);
    }

    fn has_ink(image: &RgbaImage, xs: Range<u32>, ys: Range<u32>, ink: Rgba<u8>) -> bool {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .any(|(x, y)| *image.get_pixel(x, y) == ink)
    }

    #[test]
    fn test_solid_rect_stroke_and_translucent_fill() {
        let mut image = canvas();
        paint_one(
            &mut image,
            Primitive::Rectangle {
                rect: ScreenRect::new(20.0, 20.0, 40.0, 40.0),
                fill: Some(Color::RED.with_alpha(128)),
                stroke: Color::BLACK,
                stroke_width: 2.0,
                style: StrokeStyle::Solid,
            },
        );

        assert_eq!(*image.get_pixel(20, 40), BLACK);
        let inside = image.get_pixel(40, 40);
        assert!(inside[0] > 200 && inside[1] < 200, "fill should tint red: {inside:?}");
        assert_eq!(*image.get_pixel(5, 5), WHITE);
    }

    #[test]
    fn test_dashed_stroke_has_gaps() {
        let mut image = canvas();
        paint_one(
            &mut image,
            Primitive::Rectangle {
                rect: ScreenRect::new(10.0, 10.0, 80.0, 80.0),
                fill: None,
                stroke: Color::BLUE,
                stroke_width: 2.0,
                style: StrokeStyle::Dashed { dash: 6.0, gap: 6.0 },
            },
        );

        let top_row: Vec<bool> = (12..88).map(|x| *image.get_pixel(x, 10) != WHITE).collect();
        assert!(top_row.iter().any(|on| *on));
        assert!(top_row.iter().any(|on| !*on));
        assert_eq!(*image.get_pixel(50, 50), WHITE);
    }

    #[test]
    fn test_circle_and_label() {
        let mut image = canvas();
        let mut frame = OverlayFrame::new(1);
        frame.push(
            OverlayTarget::Draft,
            Primitive::Circle {
                center: ScreenPoint::new(50.0, 50.0),
                radius: 20.0,
                fill: Some(Color::GREEN),
                stroke: Color::WHITE,
                stroke_width: 1.0,
            },
        );
        frame.push(
            OverlayTarget::Draft,
            Primitive::Label {
                center: ScreenPoint::new(50.0, 50.0),
                text: "8".to_string(),
                color: Color::BLACK,
                size: 8.0,
            },
        );
        paint_frame(&mut image, &frame);

        // One-pixel cells: the glyph occupies the 8x8 box at (46, 46)
        assert!(has_ink(&image, 46..54, 46..54, BLACK));
        assert!(!has_ink(&image, 0..46, 0..100, BLACK));
        assert_eq!(*image.get_pixel(50, 36), Rgba([22, 163, 74, 255]));
        assert_eq!(*image.get_pixel(2, 2), WHITE);
    }

    #[test]
    fn test_label_draws_every_character() {
        let mut image = canvas();
        paint_one(
            &mut image,
            Primitive::Label {
                center: ScreenPoint::new(50.0, 50.0),
                text: "Ø/7".to_string(),
                color: Color::BLACK,
                size: 8.0,
            },
        );

        // Three 8px advances centered on x = 50
        for start in [38u32, 46, 54] {
            assert!(has_ink(&image, start..start + 8, 46..54, BLACK), "empty cell at x={start}");
        }
    }

    #[test]
    fn test_unsupported_characters_fall_back_to_question_mark() {
        assert_eq!(glyph('中'), glyph('?'));
        assert_ne!(glyph('Ø'), glyph('?'));
        assert_ne!(glyph('_'), glyph('?'));
        assert_ne!(glyph('7'), [0; 8]);
    }

    #[test]
    fn test_paint_clips_to_canvas() {
        let mut image = canvas();
        paint_one(
            &mut image,
            Primitive::Pin {
                tip: ScreenPoint::new(-5.0, 200.0),
                radius: 30.0,
                fill: Color::BLUE,
                outline: Color::WHITE,
            },
        );
        assert_eq!(image.dimensions(), (100, 100));
    }

    #[test]
    fn test_pin_head_sits_above_tip() {
        let mut image = canvas();
        paint_one(
            &mut image,
            Primitive::Pin {
                tip: ScreenPoint::new(50.0, 80.0),
                radius: 10.0,
                fill: Color::BLUE,
                outline: Color::WHITE,
            },
        );

        assert_eq!(*image.get_pixel(50, 65), Rgba([37, 99, 235, 255]));
        assert_eq!(*image.get_pixel(50, 90), WHITE);
    }
}
