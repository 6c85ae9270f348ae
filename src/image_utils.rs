use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::{
    contrast::{otsu_level, threshold},
    distance_transform::Norm,
    drawing::draw_hollow_rect_mut,
    morphology::open,
    rect::Rect,
};
use logging_timer::time;

use crate::geometry::clamp_to_bounds;

pub const WHITE: Luma<u8> = Luma([u8::MAX]);
#[allow(dead_code)]
pub const BLACK: Luma<u8> = Luma([u8::MIN]);

/// Radius of the opening pass. `Norm::LInf` with radius 2 is a 5x5 square.
const OPENING_RADIUS: u8 = 2;

/// Converts a grayscale scan into a two-level ink mask: Otsu's global
/// threshold, then a single opening pass to drop speckle noise.
///
/// Ink ends up black and paper white, so a dark bubble has a low mean.
#[time]
pub fn binarize(img: &GrayImage) -> GrayImage {
    let binary = threshold(img, otsu_level(img));
    open(&binary, Norm::LInf, OPENING_RADIUS)
}

/// Mean of channel 0 over the part of `window` that lies inside the image.
///
/// For a strictly two-level image this is `255 * (fraction of white pixels)`.
/// A window entirely outside the image reads as blank paper (255).
pub fn window_mean(img: &GrayImage, window: &Rect) -> f32 {
    let clamped = match clamp_to_bounds(window, img.dimensions()) {
        Some(clamped) => clamped,
        None => return f32::from(WHITE.0[0]),
    };

    let mut sum = 0u64;
    for y in clamped.top()..=clamped.bottom() {
        for x in clamped.left()..=clamped.right() {
            sum += u64::from(img.get_pixel(x as u32, y as u32).0[0]);
        }
    }

    let count = u64::from(clamped.width()) * u64::from(clamped.height());
    (sum as f64 / count as f64) as f32
}

/// Outlines `rect` with `thickness` nested 1px rectangles growing outward, so
/// the sampled area itself stays visible. Parts outside the canvas are clipped.
pub fn draw_outline_mut(canvas: &mut RgbImage, rect: Rect, thickness: u32, color: Rgb<u8>) {
    for offset in 0..thickness.max(1) {
        let grown = Rect::at(rect.left() - offset as i32, rect.top() - offset as i32)
            .of_size(rect.width() + 2 * offset, rect.height() + 2 * offset);
        draw_hollow_rect_mut(canvas, grown, color);
    }
}

#[cfg(test)]
mod tests {
    use imageproc::drawing::draw_filled_rect_mut;

    use super::*;

    /// Determines the number of pixels in an image that match the given luma.
    fn count_pixels(img: &GrayImage, luma: &Luma<u8>) -> u32 {
        img.pixels().filter(|p| *p == luma).count() as u32
    }

    #[test]
    fn test_window_mean_all_white_and_all_black() {
        let white = GrayImage::from_pixel(50, 50, WHITE);
        let black = GrayImage::from_pixel(50, 50, BLACK);
        let window = Rect::at(10, 10).of_size(16, 16);

        assert_eq!(window_mean(&white, &window), 255.0);
        assert_eq!(window_mean(&black, &window), 0.0);
    }

    #[test]
    fn test_window_mean_half_black() {
        let mut img = GrayImage::from_pixel(50, 50, WHITE);
        draw_filled_rect_mut(&mut img, Rect::at(10, 10).of_size(8, 16), BLACK);

        let mean = window_mean(&img, &Rect::at(10, 10).of_size(16, 16));
        assert!((mean - 127.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_window_mean_clamps_to_bounds() {
        let mut img = GrayImage::from_pixel(20, 20, WHITE);
        draw_filled_rect_mut(&mut img, Rect::at(0, 0).of_size(4, 4), BLACK);

        // Only the 4x4 in-bounds corner is sampled, and it is all black.
        let mean = window_mean(&img, &Rect::at(-4, -4).of_size(8, 8));
        assert_eq!(mean, 0.0);
    }

    #[test]
    fn test_window_mean_outside_is_white() {
        let img = GrayImage::from_pixel(20, 20, BLACK);
        assert_eq!(window_mean(&img, &Rect::at(40, 40).of_size(8, 8)), 255.0);
    }

    #[test]
    fn test_binarize_produces_two_levels() {
        let mut img = GrayImage::from_pixel(60, 60, Luma([230]));
        draw_filled_rect_mut(&mut img, Rect::at(20, 20).of_size(20, 20), Luma([30]));

        let binary = binarize(&img);
        let black = count_pixels(&binary, &BLACK);
        let white = count_pixels(&binary, &WHITE);

        assert_eq!(black + white, 60 * 60);
        assert_eq!(black, 20 * 20);
        assert_eq!(*binary.get_pixel(30, 30), BLACK);
        assert_eq!(*binary.get_pixel(5, 5), WHITE);
    }

    #[test]
    fn test_binarize_removes_speckles() {
        let mut img = GrayImage::from_pixel(60, 60, Luma([20]));
        // A lone bright speck inside ink is smaller than the 5x5 element.
        draw_filled_rect_mut(&mut img, Rect::at(30, 30).of_size(2, 2), Luma([240]));
        draw_filled_rect_mut(&mut img, Rect::at(0, 0).of_size(60, 20), Luma([240]));

        let binary = binarize(&img);
        assert_eq!(*binary.get_pixel(30, 30), BLACK);
        assert_eq!(*binary.get_pixel(10, 5), WHITE);
    }

    #[test]
    fn test_draw_outline_thickness() {
        let mut canvas = RgbImage::from_pixel(40, 40, Rgb([255, 255, 255]));
        let red = Rgb([255, 0, 0]);
        draw_outline_mut(&mut canvas, Rect::at(10, 10).of_size(10, 10), 2, red);

        assert_eq!(*canvas.get_pixel(10, 10), red);
        assert_eq!(*canvas.get_pixel(9, 9), red);
        assert_eq!(*canvas.get_pixel(8, 8), Rgb([255, 255, 255]));
        // Interior of the sampled area is untouched.
        assert_eq!(*canvas.get_pixel(15, 15), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_draw_outline_clips_at_edges() {
        let mut canvas = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        draw_outline_mut(&mut canvas, Rect::at(-4, -4).of_size(8, 8), 2, Rgb([0, 255, 0]));
        assert_eq!(*canvas.get_pixel(3, 0), Rgb([0, 255, 0]));
    }
}
