//! Pointer normalization
//!
//! Maps viewport pixel coordinates (origin top-left, y down) to normalized
//! device coordinates (origin center, y up, `[-1, 1]` across the viewport).

/// Size of the surface pointer events are reported against.
///
/// Always non-degenerate: a zero-sized viewport (e.g. a minimized window)
/// cannot be constructed, so pointer handling is skipped for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    width: f32,
    height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Option<Self> {
        let usable = |v: f32| v.is_finite() && v > 0.0;
        (usable(width) && usable(height)).then_some(Self { width, height })
    }

    pub fn from_physical(size: winit::dpi::PhysicalSize<u32>) -> Option<Self> {
        Self::new(size.width as f32, size.height as f32)
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }
}

/// Pointer position in normalized device coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerState {
    pub x: f32,
    pub y: f32,
}

impl PointerState {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Normalizes a viewport-relative pixel position
    pub fn from_screen(position: (f32, f32), viewport: Viewport) -> Self {
        let (x, y) = position;
        Self {
            x: (x / viewport.width) * 2.0 - 1.0,
            y: -(y / viewport.height) * 2.0 + 1.0,
        }
    }

    /// Inverse of [`PointerState::from_screen`]
    pub fn to_screen(self, viewport: Viewport) -> (f32, f32) {
        (
            (self.x + 1.0) * 0.5 * viewport.width,
            (1.0 - self.y) * 0.5 * viewport.height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(800.0, 600.0).unwrap()
    }

    #[test]
    fn corners_and_center_map_to_ndc() {
        let vp = viewport();
        assert_eq!(PointerState::from_screen((0.0, 0.0), vp), PointerState::new(-1.0, 1.0));
        assert_eq!(PointerState::from_screen((800.0, 600.0), vp), PointerState::new(1.0, -1.0));
        assert_eq!(PointerState::from_screen((400.0, 300.0), vp), PointerState::new(0.0, 0.0));
    }

    #[test]
    fn y_axis_points_up() {
        let vp = viewport();
        let upper = PointerState::from_screen((400.0, 100.0), vp);
        let lower = PointerState::from_screen((400.0, 500.0), vp);
        assert!(upper.y > 0.0);
        assert!(lower.y < 0.0);
    }

    #[test]
    fn degenerate_viewport_is_rejected() {
        assert!(Viewport::new(0.0, 600.0).is_none());
        assert!(Viewport::new(800.0, 0.0).is_none());
        assert!(Viewport::new(f32::NAN, 600.0).is_none());
        assert!(Viewport::from_physical(winit::dpi::PhysicalSize::new(0, 0)).is_none());
    }

    #[test]
    fn screen_round_trip() {
        let vp = viewport();
        let (x, y) = PointerState::new(0.4, 0.2).to_screen(vp);
        let back = PointerState::from_screen((x, y), vp);
        assert!((back.x - 0.4).abs() < 1e-6);
        assert!((back.y - 0.2).abs() < 1e-6);
    }
}
