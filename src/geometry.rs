use imageproc::rect::Rect;

use crate::types::Choice;

/// The square sampled around a bubble center. The top-left corner sits at
/// `center - diameter / 2` using integer division, so odd diameters put the
/// extra pixel on the bottom/right side.
///
/// Corners are saturated so the window stays representable for any center;
/// such windows lie far outside any image and sample as blank.
pub fn sampling_window(center: Choice, diameter: u32) -> Rect {
    let half = (diameter / 2) as i32;
    let max_corner = i32::MAX - diameter as i32;
    let corner = |c: i32| c.saturating_sub(half).min(max_corner);
    Rect::at(corner(center.x), corner(center.y)).of_size(diameter, diameter)
}

/// Restricts `rect` to an image of the given dimensions. Returns `None` when
/// the two do not overlap at all.
pub fn clamp_to_bounds(rect: &Rect, dimensions: (u32, u32)) -> Option<Rect> {
    let (width, height) = dimensions;
    if width == 0 || height == 0 {
        return None;
    }
    rect.intersect(Rect::at(0, 0).of_size(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_window_even_diameter() {
        let window = sampling_window(Choice::new(100, 100), 16);
        assert_eq!(window, Rect::at(92, 92).of_size(16, 16));
    }

    #[test]
    fn test_sampling_window_odd_diameter_truncates() {
        let window = sampling_window(Choice::new(100, 50), 15);
        assert_eq!(window, Rect::at(93, 43).of_size(15, 15));
        assert_eq!(window.right(), 107);
    }

    #[test]
    fn test_sampling_window_at_integer_extremes() {
        let low = sampling_window(Choice::new(i32::MIN, i32::MIN), 16);
        assert_eq!(low.left(), i32::MIN);
        assert_eq!(clamp_to_bounds(&low, (100, 100)), None);

        let high = sampling_window(Choice::new(i32::MAX, i32::MAX), 16);
        assert_eq!(high.right(), i32::MAX - 1);
        assert_eq!(clamp_to_bounds(&high, (100, 100)), None);
    }

    #[test]
    fn test_clamp_inside_is_unchanged() {
        let window = Rect::at(10, 10).of_size(16, 16);
        assert_eq!(clamp_to_bounds(&window, (100, 100)), Some(window));
    }

    #[test]
    fn test_clamp_at_top_left_corner() {
        let window = sampling_window(Choice::new(2, 3), 16);
        assert_eq!(
            clamp_to_bounds(&window, (100, 100)),
            Some(Rect::at(0, 0).of_size(10, 11))
        );
    }

    #[test]
    fn test_clamp_at_bottom_right_corner() {
        let window = sampling_window(Choice::new(99, 99), 16);
        assert_eq!(
            clamp_to_bounds(&window, (100, 100)),
            Some(Rect::at(91, 91).of_size(9, 9))
        );
    }

    #[test]
    fn test_clamp_outside_is_none() {
        let window = sampling_window(Choice::new(-50, 10), 16);
        assert_eq!(clamp_to_bounds(&window, (100, 100)), None);
        assert_eq!(clamp_to_bounds(&window, (0, 0)), None);
    }
}
