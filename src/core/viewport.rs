use crate::animation::clock::SharedClock;
use crate::animation::spring::Spring;
use crate::core::config::ViewportConfig;
use crate::core::geo::{Point, Rect};
use crate::{Result, ViewerError};

/// The window onto the content, in normalized coordinates where the content
/// spans `[0, 1]` horizontally and `[0, content_height]` vertically.
///
/// Center and zoom are each driven by a [`Spring`], so every query comes in a
/// `current` flavour (where the animation is now) and a target flavour (where
/// it will settle).
#[derive(Debug, Clone)]
pub struct Viewport {
    container_size: Point,
    content_size: Point,
    content_aspect: f64,
    content_height: f64,
    home_bounds: Rect,
    config: ViewportConfig,
    clock: SharedClock,

    center_x: Spring,
    center_y: Spring,
    zoom: Spring,
    /// Content point that should stay under the same pixel while zooming
    zoom_point: Option<Point>,
}

impl Viewport {
    /// Creates a viewport showing the whole content
    pub fn new(
        container_size: Point,
        content_size: Point,
        config: ViewportConfig,
        clock: SharedClock,
    ) -> Result<Self> {
        if !is_positive_size(container_size) {
            return Err(ViewerError::InvalidGeometry(format!(
                "container size must be positive, got {}",
                container_size
            )));
        }
        if !is_positive_size(content_size) {
            return Err(ViewerError::InvalidGeometry(format!(
                "content size must be positive, got {}",
                content_size
            )));
        }

        let now = clock.now_millis();
        let spring = |initial| {
            Spring::new(
                initial,
                config.spring_stiffness,
                config.animation_time,
                now,
            )
        };
        let content_aspect = content_size.x / content_size.y;
        let content_height = content_size.y / content_size.x;

        let mut viewport = Self {
            container_size,
            content_size,
            content_aspect,
            content_height,
            home_bounds: Rect::new(0.0, 0.0, 1.0, content_height),
            center_x: spring(0.0),
            center_y: spring(0.0),
            zoom: spring(1.0),
            zoom_point: None,
            config,
            clock,
        };

        viewport.go_home(true);
        viewport.update();
        Ok(viewport)
    }

    fn now(&self) -> f64 {
        self.clock.now_millis()
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn container_size(&self) -> Point {
        self.container_size
    }

    pub fn content_size(&self) -> Point {
        self.content_size
    }

    /// Height of the content in normalized units (width is always 1)
    pub fn content_height(&self) -> f64 {
        self.content_height
    }

    pub fn home_bounds(&self) -> Rect {
        self.home_bounds
    }

    /// Container width over height
    pub fn aspect_ratio(&self) -> f64 {
        self.container_size.x / self.container_size.y
    }

    pub fn zoom_point(&self) -> Option<Point> {
        self.zoom_point
    }

    /// Zoom at which the whole content fits the container
    pub fn home_zoom(&self) -> f64 {
        let aspect_factor = self.content_aspect / self.aspect_ratio();
        if aspect_factor >= 1.0 {
            1.0
        } else {
            aspect_factor
        }
    }

    pub fn min_zoom(&self) -> f64 {
        let home = self.home_zoom();
        (self.config.min_zoom_image_ratio * home).min(home)
    }

    pub fn max_zoom(&self) -> f64 {
        let zoom =
            self.content_size.x * self.config.max_zoom_pixel_ratio / self.container_size.x;
        zoom.max(self.home_zoom())
    }

    pub fn zoom(&self, current: bool) -> f64 {
        if current {
            self.zoom.value()
        } else {
            self.zoom.target_value()
        }
    }

    /// Whether every spring has settled on its target
    pub fn is_at_rest(&self) -> bool {
        self.center_x.is_at_rest() && self.center_y.is_at_rest() && self.zoom.is_at_rest()
    }

    /// The visible region of the content
    pub fn bounds(&self, current: bool) -> Rect {
        let center = self.center(current);
        let width = 1.0 / self.zoom(current);
        let height = width / self.aspect_ratio();
        Rect::new(
            center.x - width / 2.0,
            center.y - height / 2.0,
            width,
            height,
        )
    }

    /// Center of the view. The target center accounts for a pending zoom
    /// anchor, so it is where the center will be once the zoom settles.
    pub fn center(&self, current: bool) -> Point {
        let center_current = Point::new(self.center_x.value(), self.center_y.value());
        let center_target = Point::new(self.center_x.target_value(), self.center_y.target_value());

        if current {
            return center_current;
        }
        let zoom_point = match self.zoom_point {
            Some(point) => point,
            None => return center_target,
        };
        let zoom = self.zoom(false);
        if !(zoom > 0.0) || !zoom.is_finite() {
            return center_target;
        }

        let old_zoom_pixel = self.pixel_from_point(zoom_point, true);

        let width = 1.0 / zoom;
        let height = width / self.aspect_ratio();
        let bounds = Rect::new(
            center_current.x - width / 2.0,
            center_current.y - height / 2.0,
            width,
            height,
        );
        let new_zoom_pixel =
            (zoom_point - bounds.top_left()) * (self.container_size.x / bounds.width);
        let delta_points = (new_zoom_pixel - old_zoom_pixel) / (self.container_size.x * zoom);

        center_target + delta_points
    }

    pub fn pan_by(&mut self, delta: Point, immediately: bool) {
        let center = Point::new(self.center_x.target_value(), self.center_y.target_value());
        self.pan_to(center + delta, immediately);
    }

    pub fn pan_to(&mut self, center: Point, immediately: bool) {
        if immediately {
            self.center_x.reset_to(center.x);
            self.center_y.reset_to(center.y);
        } else {
            self.center_x.spring_to(center.x);
            self.center_y.spring_to(center.y);
        }
    }

    pub fn zoom_by(&mut self, factor: f64, ref_point: Option<Point>, immediately: bool) {
        self.zoom_to(self.zoom(false) * factor, ref_point, immediately);
    }

    /// Zooms to `zoom`, keeping `ref_point` under the same pixel if given
    pub fn zoom_to(&mut self, zoom: f64, ref_point: Option<Point>, immediately: bool) {
        if immediately {
            self.zoom.reset_to(zoom);
        } else {
            self.zoom.spring_to(zoom);
        }
        self.zoom_point = ref_point;
    }

    /// Pulls the zoom into range and pans back any non-wrapping axis on which
    /// less than `visibility_ratio` of the view overlaps the content
    pub fn apply_constraints(&mut self, immediately: bool) {
        let actual_zoom = self.zoom(false);
        let constrained_zoom = actual_zoom.max(self.min_zoom()).min(self.max_zoom());
        if actual_zoom != constrained_zoom {
            self.zoom_to(constrained_zoom, self.zoom_point, immediately);
        }

        let bounds = self.bounds(false);
        let horizontal_threshold = self.config.visibility_ratio * bounds.width;
        let vertical_threshold = self.config.visibility_ratio * bounds.height;

        let left = bounds.x + bounds.width;
        let right = 1.0 - bounds.x;
        let top = bounds.y + bounds.height;
        let bottom = self.content_height - bounds.y;

        let mut dx = 0.0;
        if !self.config.wrap_horizontal {
            if left < horizontal_threshold {
                dx = horizontal_threshold - left;
            } else if right < horizontal_threshold {
                dx = right - horizontal_threshold;
            }
        }

        let mut dy = 0.0;
        if !self.config.wrap_vertical {
            if top < vertical_threshold {
                dy = vertical_threshold - top;
            } else if bottom < vertical_threshold {
                dy = bottom - vertical_threshold;
            }
        }

        if dx != 0.0 || dy != 0.0 {
            log::trace!("constraining view by ({}, {})", dx, dy);
            self.fit_bounds(bounds.translate(Point::new(dx, dy)), immediately);
        }
    }

    /// Shows `bounds`, grown to the container aspect around its center.
    /// While animating, the point that sits at the same pixel in the old and
    /// new views stays fixed, so the view zooms without sliding.
    pub fn fit_bounds(&mut self, bounds: Rect, immediately: bool) {
        if !(bounds.width > 0.0 && bounds.height > 0.0)
            || !bounds.width.is_finite()
            || !bounds.height.is_finite()
        {
            log::warn!("ignoring degenerate bounds {}", bounds);
            return;
        }

        let aspect = self.aspect_ratio();
        let center = bounds.center();

        let mut new_bounds = bounds;
        if new_bounds.aspect_ratio() >= aspect {
            new_bounds.height = bounds.width / aspect;
            new_bounds.y = center.y - new_bounds.height / 2.0;
        } else {
            new_bounds.width = bounds.height * aspect;
            new_bounds.x = center.x - new_bounds.width / 2.0;
        }

        // restart from wherever the animation is right now
        self.pan_to(self.center(true), true);
        self.zoom_to(self.zoom(true), None, true);

        let old_bounds = self.bounds(false);
        let old_zoom = self.zoom(false);
        let new_zoom = 1.0 / new_bounds.width;

        if new_zoom == old_zoom || new_bounds.width == old_bounds.width {
            self.pan_to(center, immediately);
            return;
        }

        let width = self.container_size.x;
        let old_scale = width / old_bounds.width;
        let new_scale = width / new_bounds.width;
        let ref_point = (old_bounds.top_left() * old_scale - new_bounds.top_left() * new_scale)
            / (old_scale - new_scale);

        self.zoom_to(new_zoom, Some(ref_point), immediately);
    }

    /// Fits the whole content, first folding the center back into range on
    /// wrapping axes
    pub fn go_home(&mut self, immediately: bool) {
        let center = self.center(false);
        let now = self.now();

        if self.config.wrap_horizontal {
            self.center_x.reset_to(wrap(center.x, 1.0));
            self.center_x.update(now);
        }
        if self.config.wrap_vertical {
            self.center_y.reset_to(wrap(center.y, self.content_height));
            self.center_y.update(now);
        }

        self.fit_bounds(self.home_bounds, immediately);
    }

    /// Adapts to a new container size. With `maintain_bounds` the content
    /// keeps its on-screen scale and top-left corner; otherwise the previous
    /// bounds are refitted into the new container. Returns false when the
    /// new size is empty and nothing changed.
    pub fn resize(&mut self, new_container_size: Point, maintain_bounds: bool) -> bool {
        if !is_positive_size(new_container_size) {
            log::warn!("ignoring resize to {}", new_container_size);
            return false;
        }

        let old_bounds = self.bounds(false);
        let width_factor = new_container_size.x / self.container_size.x;
        self.container_size = new_container_size;

        let mut new_bounds = old_bounds;
        if maintain_bounds {
            new_bounds.width = old_bounds.width * width_factor;
            new_bounds.height = new_bounds.width / self.aspect_ratio();
        }

        self.fit_bounds(new_bounds, true);
        true
    }

    /// Advances the springs to the clock's current time, keeping the zoom
    /// anchor fixed on screen. Returns whether anything moved.
    pub fn update(&mut self) -> bool {
        let now = self.now();
        let old_center_x = self.center_x.value();
        let old_center_y = self.center_y.value();
        let old_zoom = self.zoom.value();

        let old_zoom_pixel = self.zoom_point.map(|p| self.pixel_from_point(p, true));

        self.zoom.update(now);

        match (self.zoom_point, old_zoom_pixel) {
            (Some(zoom_point), Some(old_pixel)) if self.zoom.value() != old_zoom => {
                let new_pixel = self.pixel_from_point(zoom_point, true);
                let delta = self.delta_points_from_pixels(new_pixel - old_pixel, true);
                self.center_x.shift_by(delta.x);
                self.center_y.shift_by(delta.y);
            }
            _ => self.zoom_point = None,
        }

        self.center_x.update(now);
        self.center_y.update(now);

        self.center_x.value() != old_center_x
            || self.center_y.value() != old_center_y
            || self.zoom.value() != old_zoom
    }

    pub fn delta_pixels_from_points(&self, delta: Point, current: bool) -> Point {
        delta * (self.container_size.x * self.zoom(current))
    }

    pub fn delta_points_from_pixels(&self, delta: Point, current: bool) -> Point {
        delta / (self.container_size.x * self.zoom(current))
    }

    /// Container pixel at which a content point is shown
    pub fn pixel_from_point(&self, point: Point, current: bool) -> Point {
        let bounds = self.bounds(current);
        (point - bounds.top_left()) * (self.container_size.x / bounds.width)
    }

    /// Content point shown at a container pixel
    pub fn point_from_pixel(&self, pixel: Point, current: bool) -> Point {
        let bounds = self.bounds(current);
        pixel / (self.container_size.x / bounds.width) + bounds.top_left()
    }
}

fn is_positive_size(size: Point) -> bool {
    size.x > 0.0 && size.y > 0.0 && size.x.is_finite() && size.y.is_finite()
}

/// Folds `value` into `[0, period)`
fn wrap(value: f64, period: f64) -> f64 {
    (period + value % period) % period
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::clock::ManualClock;

    const EPSILON: f64 = 1e-9;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPSILON,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    fn viewport(container: (f64, f64), content: (f64, f64)) -> (Viewport, ManualClock) {
        let clock = ManualClock::new(0.0);
        let viewport = Viewport::new(
            Point::new(container.0, container.1),
            Point::new(content.0, content.1),
            ViewportConfig::default(),
            clock.shared(),
        )
        .unwrap();
        (viewport, clock)
    }

    fn settle(viewport: &mut Viewport, clock: &ManualClock) {
        for _ in 0..100 {
            clock.advance(50.0);
            viewport.update();
        }
    }

    #[test]
    fn test_viewport_creation_shows_home() {
        let (viewport, _) = viewport((256.0, 256.0), (256.0, 256.0));
        assert_eq!(viewport.zoom(true), 1.0);
        assert_eq!(viewport.bounds(true), Rect::new(0.0, 0.0, 1.0, 1.0));
        assert!(viewport.zoom_point().is_none());
    }

    #[test]
    fn test_home_zoom() {
        let (same_aspect, _) = viewport((1000.0, 500.0), (2000.0, 1000.0));
        assert_eq!(same_aspect.home_zoom(), 1.0);

        let (wide_content, _) = viewport((500.0, 500.0), (2000.0, 1000.0));
        assert_eq!(wide_content.home_zoom(), 1.0);

        let (tall_content, _) = viewport((500.0, 500.0), (1000.0, 2000.0));
        assert_eq!(tall_content.home_zoom(), 0.5);
    }

    #[test]
    fn test_tall_content_starts_centered() {
        let (viewport, _) = viewport((100.0, 100.0), (1000.0, 2000.0));
        assert_close(viewport.zoom(true), 0.5);

        let center = viewport.center(true);
        assert_close(center.x, 0.5);
        assert_close(center.y, 1.0);
        assert_close(viewport.bounds(true).height, 2.0);
    }

    #[test]
    fn test_zoom_limits() {
        let (viewport, _) = viewport((500.0, 500.0), (2000.0, 1000.0));
        assert_close(viewport.min_zoom(), 0.8);
        assert_close(viewport.max_zoom(), 8.0);

        // tiny content still allows reaching home
        let (small, _) = self::viewport((500.0, 500.0), (10.0, 10.0));
        assert_eq!(small.max_zoom(), 1.0);
    }

    #[test]
    fn test_pixel_round_trip() {
        let (mut viewport, clock) = viewport((640.0, 480.0), (3000.0, 2000.0));
        viewport.zoom_by(3.0, Some(Point::new(0.3, 0.2)), false);
        clock.advance(300.0);
        viewport.update();

        for pixel in [
            Point::new(0.0, 0.0),
            Point::new(320.0, 240.0),
            Point::new(639.0, 17.5),
        ] {
            let point = viewport.point_from_pixel(pixel, true);
            let back = viewport.pixel_from_point(point, true);
            assert!((back.x - pixel.x).abs() < 1e-6);
            assert!((back.y - pixel.y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zoom_about_center_does_not_pan() {
        let (mut viewport, clock) = viewport((256.0, 256.0), (1024.0, 1024.0));
        let center = viewport.center(true);
        viewport.zoom_by(2.0, Some(center), false);
        settle(&mut viewport, &clock);

        assert_close(viewport.zoom(true), 2.0);
        let after = viewport.center(true);
        assert_close(after.x, center.x);
        assert_close(after.y, center.y);
        assert!(viewport.is_at_rest());
    }

    #[test]
    fn test_zoom_keeps_anchor_pixel_fixed() {
        let (mut viewport, clock) = viewport((400.0, 400.0), (1024.0, 1024.0));
        let anchor = Point::new(0.25, 0.75);
        let pixel = viewport.pixel_from_point(anchor, true);

        viewport.zoom_by(2.5, Some(anchor), false);
        for _ in 0..40 {
            clock.advance(40.0);
            viewport.update();
            let moved = viewport.pixel_from_point(anchor, true);
            assert!((moved.x - pixel.x).abs() < 1e-6);
            assert!((moved.y - pixel.y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_target_center_accounts_for_anchor() {
        let (mut viewport, clock) = viewport((400.0, 400.0), (1024.0, 1024.0));
        let anchor = Point::new(0.1, 0.1);
        viewport.zoom_by(2.0, Some(anchor), false);
        let predicted = viewport.center(false);

        settle(&mut viewport, &clock);
        let settled = viewport.center(true);
        assert!((predicted.x - settled.x).abs() < 1e-9);
        assert!((predicted.y - settled.y).abs() < 1e-9);
    }

    #[test]
    fn test_immediate_zoom_with_anchor() {
        let (mut viewport, _) = viewport((400.0, 400.0), (1024.0, 1024.0));
        let anchor = Point::new(0.2, 0.4);
        let pixel = viewport.pixel_from_point(anchor, true);

        viewport.zoom_to(4.0, Some(anchor), true);
        assert!(viewport.update());

        assert_eq!(viewport.zoom(true), 4.0);
        let moved = viewport.pixel_from_point(anchor, true);
        assert!((moved.x - pixel.x).abs() < 1e-6);
        assert!((moved.y - pixel.y).abs() < 1e-6);
    }

    #[test]
    fn test_pan_by_animates_to_target() {
        let (mut viewport, clock) = viewport((200.0, 200.0), (1000.0, 1000.0));
        viewport.pan_by(Point::new(0.1, -0.2), false);
        assert_close(viewport.center(false).x, 0.6);
        assert_close(viewport.center(false).y, 0.3);
        assert_eq!(viewport.center(true), Point::new(0.5, 0.5));

        clock.advance(100.0);
        assert!(viewport.update());
        settle(&mut viewport, &clock);
        assert_close(viewport.center(true).x, 0.6);
        assert_close(viewport.center(true).y, 0.3);
        assert!(!viewport.update());
    }

    #[test]
    fn test_apply_constraints_pulls_view_back() {
        let (mut viewport, _) = viewport((256.0, 256.0), (256.0, 256.0));
        viewport.pan_to(Point::new(5.0, 5.0), true);
        viewport.update();

        viewport.apply_constraints(true);
        viewport.update();

        let bounds = viewport.bounds(true);
        let overlap_x = (bounds.x + bounds.width).min(1.0) - bounds.x.max(0.0);
        let overlap_y = (bounds.y + bounds.height).min(1.0) - bounds.y.max(0.0);
        assert!(overlap_x >= 0.5 * bounds.width - EPSILON);
        assert!(overlap_y >= 0.5 * bounds.height - EPSILON);
        assert_close(viewport.center(true).x, 1.0);
        assert_close(viewport.center(true).y, 1.0);
    }

    #[test]
    fn test_apply_constraints_clamps_zoom() {
        let (mut viewport, clock) = viewport((500.0, 500.0), (1000.0, 1000.0));
        viewport.zoom_to(100.0, None, false);
        viewport.apply_constraints(false);
        settle(&mut viewport, &clock);
        assert_close(viewport.zoom(true), viewport.max_zoom());

        viewport.zoom_to(0.01, None, true);
        viewport.apply_constraints(true);
        viewport.update();
        assert_close(viewport.zoom(true), viewport.min_zoom());
    }

    #[test]
    fn test_wrapping_axis_is_not_constrained() {
        let clock = ManualClock::new(0.0);
        let config = ViewportConfig {
            wrap_horizontal: true,
            ..ViewportConfig::default()
        };
        let mut viewport = Viewport::new(
            Point::new(256.0, 256.0),
            Point::new(256.0, 256.0),
            config,
            clock.shared(),
        )
        .unwrap();

        viewport.pan_to(Point::new(5.5, 0.5), true);
        viewport.update();
        viewport.apply_constraints(true);
        viewport.update();
        assert_close(viewport.center(true).x, 5.5);

        viewport.go_home(true);
        viewport.update();
        assert_close(viewport.center(true).x, 0.5);
    }

    #[test]
    fn test_fit_bounds_matches_container_aspect() {
        let (mut viewport, clock) = viewport((400.0, 200.0), (1000.0, 1000.0));
        viewport.fit_bounds(Rect::new(0.25, 0.25, 0.25, 0.25), false);
        settle(&mut viewport, &clock);

        let bounds = viewport.bounds(true);
        assert_close(bounds.width, 0.5);
        assert_close(bounds.height, 0.25);
        assert_close(bounds.center().x, 0.375);
        assert_close(bounds.center().y, 0.375);
    }

    #[test]
    fn test_fit_bounds_ignores_degenerate_rect() {
        let (mut viewport, _) = viewport((400.0, 200.0), (1000.0, 1000.0));
        let before = viewport.bounds(false);
        viewport.fit_bounds(Rect::new(0.5, 0.5, 0.0, 0.0), true);
        viewport.update();
        assert_eq!(viewport.bounds(false), before);
    }

    #[test]
    fn test_resize_maintains_visible_content() {
        let (mut viewport, _) = viewport((400.0, 400.0), (1000.0, 1000.0));
        let before = viewport.bounds(true);

        viewport.resize(Point::new(800.0, 800.0), true);
        viewport.update();
        let after = viewport.bounds(true);
        assert_close(after.width, before.width * 2.0);
        assert_close(viewport.zoom(true), 0.5);

        let (mut refit, _) = self::viewport((400.0, 400.0), (1000.0, 1000.0));
        refit.resize(Point::new(800.0, 400.0), false);
        refit.update();
        assert_close(refit.zoom(true), 0.5);
        assert_close(refit.bounds(true).height, 1.0);
        assert_close(refit.center(true).x, 0.5);
        assert_close(refit.center(true).y, 0.5);
    }

    #[test]
    fn test_resize_ignores_empty_container() {
        let (mut viewport, _) = viewport((400.0, 400.0), (1000.0, 1000.0));
        assert!(!viewport.resize(Point::new(0.0, 300.0), true));
        assert_eq!(viewport.container_size(), Point::new(400.0, 400.0));
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        let clock = ManualClock::new(0.0);
        let result = Viewport::new(
            Point::new(0.0, 100.0),
            Point::new(100.0, 100.0),
            ViewportConfig::default(),
            clock.shared(),
        );
        assert!(matches!(result, Err(ViewerError::InvalidGeometry(_))));
    }

    #[test]
    fn test_wrap_helper() {
        assert_close(wrap(5.5, 1.0), 0.5);
        assert_close(wrap(-0.25, 1.0), 0.75);
        assert_close(wrap(0.3, 1.0), 0.3);
    }
}
