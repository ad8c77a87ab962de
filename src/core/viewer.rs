//! The viewer ties a viewport to one or more drawers and runs the frame loop.
//!
//! Hosts call [`Viewer::update_once`] on a timer (see
//! [`Viewer::next_frame_delay`]), forward decoded input through
//! [`Viewer::handle_input`], and drain [`ViewerEvent`]s afterwards.

use std::collections::VecDeque;

use crate::animation::clock::SharedClock;
use crate::core::config::ViewerOptions;
use crate::core::constants::{ANIMATING_FRAME_DELAY_MS, TARGET_UPDATES_PER_SECOND};
use crate::core::geo::Point;
use crate::core::viewport::Viewport;
use crate::drawer::{Drawer, Overlay};
use crate::input::events::{EventHandled, InputEvent, ViewerEvent};
use crate::rendering::surface::Surface;
use crate::tiles::loader::ImageLoader;
use crate::tiles::source::TileSource;
use crate::{Result, ViewerError};

/// Continuous zoom driven by a held button
#[derive(Debug, Clone, Copy)]
struct ZoomHold {
    factor_per_second: f64,
    last_time: f64,
}

pub struct Viewer<L: ImageLoader, S> {
    options: ViewerOptions,
    clock: SharedClock,
    container_size: Point,
    prev_container_size: Point,

    viewport: Option<Viewport>,
    /// The opened image first, then any layers
    drawers: Vec<Drawer<L, S>>,

    animating: bool,
    force_redraw: bool,
    zoom_hold: Option<ZoomHold>,
    events: VecDeque<ViewerEvent>,
}

impl<L, S> Viewer<L, S>
where
    L: ImageLoader,
    S: Surface<L::Image>,
{
    pub fn new(options: ViewerOptions, container_size: Point, clock: SharedClock) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            clock,
            container_size,
            prev_container_size: container_size,
            viewport: None,
            drawers: Vec::new(),
            animating: false,
            force_redraw: false,
            zoom_hold: None,
            events: VecDeque::new(),
        })
    }

    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    pub fn is_open(&self) -> bool {
        self.viewport.is_some()
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn container_size(&self) -> Point {
        self.container_size
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    pub fn viewport_mut(&mut self) -> Option<&mut Viewport> {
        self.viewport.as_mut()
    }

    pub fn drawers(&self) -> &[Drawer<L, S>] {
        &self.drawers
    }

    pub fn drawers_mut(&mut self) -> &mut [Drawer<L, S>] {
        &mut self.drawers
    }

    /// Opens `source`, replacing whatever was open.
    ///
    /// On failure the viewer stays closed and `OpenFailed` is raised.
    pub fn open(&mut self, source: TileSource, loader: L, surface: S) -> Result<()> {
        self.close();

        let viewport = match Viewport::new(
            self.container_size,
            source.dimensions(),
            self.options.viewport.clone(),
            self.clock.clone(),
        ) {
            Ok(viewport) => viewport,
            Err(err) => {
                log::warn!("unable to open image: {}", err);
                self.events.push_back(ViewerEvent::OpenFailed(err.to_string()));
                return Err(err);
            }
        };

        log::info!(
            "opened {}x{} image with levels {}..={}",
            source.dimensions().x,
            source.dimensions().y,
            source.min_level(),
            source.max_level()
        );

        let drawer = Drawer::new(
            source,
            self.options.drawer.clone(),
            loader,
            surface,
            self.clock.clone(),
        );
        self.viewport = Some(viewport);
        self.drawers.push(drawer);
        self.prev_container_size = self.container_size;
        self.animating = false;
        self.force_redraw = true;
        self.events.push_back(ViewerEvent::Open);
        Ok(())
    }

    pub fn close(&mut self) {
        if self.viewport.take().is_none() {
            return;
        }
        self.drawers.clear();
        self.animating = false;
        self.zoom_hold = None;
        log::info!("closed image");
        self.events.push_back(ViewerEvent::Close);
    }

    /// Adds another image drawn through the same viewport, on top of the
    /// ones already open
    pub fn add_layer(&mut self, source: TileSource, loader: L, surface: S) -> Result<()> {
        if self.viewport.is_none() {
            return Err(ViewerError::NotOpen);
        }
        log::debug!("adding layer with {} levels", source.max_level() + 1);
        self.drawers.push(Drawer::new(
            source,
            self.options.drawer.clone(),
            loader,
            surface,
            self.clock.clone(),
        ));
        self.force_redraw = true;
        Ok(())
    }

    /// Adds an overlay to the opened image. Returns false for a duplicate id.
    pub fn add_overlay(&mut self, overlay: Overlay) -> Result<bool> {
        let drawer = self.drawers.first_mut().ok_or(ViewerError::NotOpen)?;
        Ok(drawer.add_overlay(overlay))
    }

    pub fn remove_overlay(&mut self, id: &str) -> Result<bool> {
        let drawer = self.drawers.first_mut().ok_or(ViewerError::NotOpen)?;
        Ok(drawer.remove_overlay(id))
    }

    /// Records the container's size; the viewport follows on the next update
    pub fn set_container_size(&mut self, size: Point) {
        self.container_size = size;
    }

    pub fn drain_events(&mut self) -> Vec<ViewerEvent> {
        self.events.drain(..).collect()
    }

    /// Runs one frame. Returns whether the view is still animating.
    pub fn update_once(&mut self) -> bool {
        if self.viewport.is_none() {
            return false;
        }
        self.apply_zoom_hold();

        let viewport = match self.viewport.as_mut() {
            Some(viewport) => viewport,
            None => return false,
        };

        if self.container_size != self.prev_container_size {
            self.prev_container_size = self.container_size;
            if viewport.resize(self.container_size, true) {
                self.events.push_back(ViewerEvent::Resize);
            }
        }

        let animated = viewport.update();

        if !self.animating && animated {
            self.events.push_back(ViewerEvent::AnimationStart);
        }

        for drawer in &mut self.drawers {
            drawer.process_loads();
        }

        if animated {
            for drawer in &mut self.drawers {
                drawer.update(viewport);
            }
            self.events.push_back(ViewerEvent::Animation);
        } else if self.force_redraw || self.drawers.iter().any(|d| d.needs_update()) {
            for drawer in &mut self.drawers {
                drawer.update(viewport);
            }
            self.force_redraw = false;
        }

        if self.animating && !animated {
            self.events.push_back(ViewerEvent::AnimationFinish);
        }
        self.animating = animated;
        animated
    }

    /// Milliseconds to wait before the next [`Viewer::update_once`], given
    /// when the previous one ran
    pub fn next_frame_delay(&self, prev_update_ms: Option<f64>) -> f64 {
        if self.animating {
            return ANIMATING_FRAME_DELAY_MS;
        }
        let now = self.clock.now_millis();
        let prev = prev_update_ms.unwrap_or(now);
        let target = prev + 1000.0 / TARGET_UPDATES_PER_SECOND;
        (target - now).max(1.0)
    }

    pub fn handle_input(&mut self, event: InputEvent) -> EventHandled {
        if let InputEvent::Resize { size } = event {
            self.set_container_size(size);
            return EventHandled::Handled;
        }

        let navigation = &self.options.navigation;
        let viewport = match self.viewport.as_mut() {
            Some(viewport) => viewport,
            None => return EventHandled::NotHandled,
        };

        match event {
            InputEvent::Click {
                position,
                quick,
                shift,
            } => {
                if !quick {
                    return EventHandled::NotHandled;
                }
                let factor = if shift {
                    1.0 / navigation.zoom_per_click
                } else {
                    navigation.zoom_per_click
                };
                let anchor = viewport.point_from_pixel(position, true);
                viewport.zoom_by(factor, Some(anchor), false);
                viewport.apply_constraints(false);
            }
            InputEvent::Drag { delta, .. } => {
                let delta = viewport.delta_points_from_pixels(-delta, false);
                viewport.pan_by(delta, false);
            }
            InputEvent::Release { inside_press } => {
                if !inside_press {
                    return EventHandled::NotHandled;
                }
                viewport.apply_constraints(false);
            }
            InputEvent::Scroll {
                position, scroll, ..
            } => {
                let factor = navigation.zoom_per_scroll.powf(scroll);
                let anchor = viewport.point_from_pixel(position, true);
                viewport.zoom_by(factor, Some(anchor), false);
                viewport.apply_constraints(false);
            }
            InputEvent::Resize { .. } => {}
        }
        EventHandled::Handled
    }

    pub fn zoom_in(&mut self) {
        let factor = self.options.navigation.zoom_per_click;
        self.zoom_step(factor);
    }

    pub fn zoom_out(&mut self) {
        let factor = 1.0 / self.options.navigation.zoom_per_click;
        self.zoom_step(factor);
    }

    pub fn go_home(&mut self) {
        if let Some(viewport) = self.viewport.as_mut() {
            viewport.go_home(false);
        }
    }

    pub fn begin_zooming_in(&mut self) {
        let factor = self.options.navigation.zoom_per_second;
        self.begin_zooming(factor);
    }

    pub fn begin_zooming_out(&mut self) {
        let factor = 1.0 / self.options.navigation.zoom_per_second;
        self.begin_zooming(factor);
    }

    pub fn end_zooming(&mut self) {
        self.zoom_hold = None;
    }

    pub fn is_zooming(&self) -> bool {
        self.zoom_hold.is_some()
    }

    fn begin_zooming(&mut self, factor_per_second: f64) {
        self.zoom_hold = Some(ZoomHold {
            factor_per_second,
            last_time: self.clock.now_millis(),
        });
    }

    fn zoom_step(&mut self, factor: f64) {
        self.end_zooming();
        if let Some(viewport) = self.viewport.as_mut() {
            viewport.zoom_by(factor, None, false);
            viewport.apply_constraints(false);
        }
    }

    fn apply_zoom_hold(&mut self) {
        let (hold, viewport) = match (self.zoom_hold.as_mut(), self.viewport.as_mut()) {
            (Some(hold), Some(viewport)) => (hold, viewport),
            _ => return,
        };
        let now = self.clock.now_millis();
        let factor = hold.factor_per_second.powf((now - hold.last_time) / 1000.0);
        viewport.zoom_by(factor, None, false);
        viewport.apply_constraints(false);
        hold.last_time = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::clock::ManualClock;
    use crate::rendering::surface::{RenderContext, SurfaceMode};
    use crate::tiles::loader::DeferredImageLoader;

    type TestViewer = Viewer<DeferredImageLoader<u32>, RenderContext<u32>>;

    fn source() -> TileSource {
        TileSource::dzi(512, 512, 256, 0, "t/", "png").unwrap()
    }

    fn open_viewer(clock: &ManualClock) -> TestViewer {
        let mut viewer =
            TestViewer::new(ViewerOptions::default(), Point::new(256.0, 256.0), clock.shared())
                .unwrap();
        viewer
            .open(
                source(),
                DeferredImageLoader::default(),
                RenderContext::new(SurfaceMode::Immediate),
            )
            .unwrap();
        viewer
    }

    #[test]
    fn test_open_and_close_events() {
        let clock = ManualClock::new(0.0);
        let mut viewer = open_viewer(&clock);
        assert!(viewer.is_open());
        assert_eq!(viewer.drain_events(), vec![ViewerEvent::Open]);

        viewer.close();
        assert!(!viewer.is_open());
        assert!(viewer.drawers().is_empty());
        assert_eq!(viewer.drain_events(), vec![ViewerEvent::Close]);

        // closing twice is silent
        viewer.close();
        assert!(viewer.drain_events().is_empty());
    }

    #[test]
    fn test_reopen_closes_previous() {
        let clock = ManualClock::new(0.0);
        let mut viewer = open_viewer(&clock);
        viewer.drain_events();
        viewer
            .open(
                source(),
                DeferredImageLoader::default(),
                RenderContext::new(SurfaceMode::Immediate),
            )
            .unwrap();
        assert_eq!(viewer.drain_events(), vec![ViewerEvent::Close, ViewerEvent::Open]);
        assert_eq!(viewer.drawers().len(), 1);
    }

    #[test]
    fn test_failed_open_stays_closed() {
        let clock = ManualClock::new(0.0);
        let mut viewer =
            TestViewer::new(ViewerOptions::default(), Point::new(0.0, 0.0), clock.shared())
                .unwrap();
        let result = viewer.open(
            source(),
            DeferredImageLoader::default(),
            RenderContext::new(SurfaceMode::Immediate),
        );
        assert!(matches!(result, Err(ViewerError::InvalidGeometry(_))));
        assert!(!viewer.is_open());
        assert!(matches!(
            viewer.drain_events().as_slice(),
            [ViewerEvent::OpenFailed(_)]
        ));
    }

    #[test]
    fn test_first_frame_draws_and_requests() {
        let clock = ManualClock::new(0.0);
        let mut viewer = open_viewer(&clock);
        assert!(!viewer.update_once());
        let requests = viewer.drawers_mut()[0].loader_mut().take_requests();
        assert_eq!(requests.len(), 1);
    }

    #[test]
    fn test_click_zoom_animates() {
        let clock = ManualClock::new(0.0);
        let mut viewer = open_viewer(&clock);
        viewer.update_once();
        viewer.drain_events();

        let handled = viewer.handle_input(InputEvent::Click {
            position: Point::new(128.0, 128.0),
            quick: true,
            shift: false,
        });
        assert_eq!(handled, EventHandled::Handled);
        let target = viewer.viewport().unwrap().zoom(false);
        assert!((target - 2.0).abs() < 1e-9);

        clock.advance(100.0);
        assert!(viewer.update_once());
        assert_eq!(
            viewer.drain_events(),
            vec![ViewerEvent::AnimationStart, ViewerEvent::Animation]
        );
        assert_eq!(viewer.next_frame_delay(Some(0.0)), 1.0);

        clock.advance(2000.0);
        viewer.update_once();
        clock.advance(16.0);
        assert!(!viewer.update_once());
        assert!(viewer.drain_events().contains(&ViewerEvent::AnimationFinish));
        assert!((viewer.viewport().unwrap().zoom(true) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_slow_click_is_ignored() {
        let clock = ManualClock::new(0.0);
        let mut viewer = open_viewer(&clock);
        let handled = viewer.handle_input(InputEvent::Click {
            position: Point::new(10.0, 10.0),
            quick: false,
            shift: false,
        });
        assert_eq!(handled, EventHandled::NotHandled);
        assert_eq!(viewer.viewport().unwrap().zoom(false), 1.0);
    }

    #[test]
    fn test_shift_click_zooms_out() {
        let clock = ManualClock::new(0.0);
        let mut viewer = open_viewer(&clock);
        viewer.zoom_in();
        viewer.zoom_in();
        viewer.handle_input(InputEvent::Click {
            position: Point::new(128.0, 128.0),
            quick: true,
            shift: true,
        });
        assert!((viewer.viewport().unwrap().zoom(false) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_drag_pans_against_pointer() {
        let clock = ManualClock::new(0.0);
        let mut viewer = open_viewer(&clock);
        viewer.zoom_in();
        let before = viewer.viewport().unwrap().center(false);
        viewer.handle_input(InputEvent::Drag {
            position: Point::new(100.0, 100.0),
            delta: Point::new(64.0, 0.0),
            shift: false,
        });
        let after = viewer.viewport().unwrap().center(false);
        // 256px shows half the content at zoom 2, so 64px is 1/8
        assert!((after.x - (before.x - 0.125)).abs() < 1e-9);
        assert!((after.y - before.y).abs() < 1e-9);
    }

    #[test]
    fn test_scroll_uses_zoom_per_scroll() {
        let clock = ManualClock::new(0.0);
        let mut viewer = open_viewer(&clock);
        viewer.handle_input(InputEvent::Scroll {
            position: Point::new(128.0, 128.0),
            scroll: 2.0,
            shift: false,
        });
        assert!((viewer.viewport().unwrap().zoom(false) - 1.44).abs() < 1e-9);
    }

    #[test]
    fn test_input_without_image() {
        let clock = ManualClock::new(0.0);
        let mut viewer =
            TestViewer::new(ViewerOptions::default(), Point::new(100.0, 100.0), clock.shared())
                .unwrap();
        let handled = viewer.handle_input(InputEvent::Release { inside_press: true });
        assert_eq!(handled, EventHandled::NotHandled);
        assert!(!viewer.update_once());
        assert!(matches!(
            viewer.add_overlay(Overlay::over_rect("r", Default::default())),
            Err(ViewerError::NotOpen)
        ));
    }

    #[test]
    fn test_resize_event_on_next_frame() {
        let clock = ManualClock::new(0.0);
        let mut viewer = open_viewer(&clock);
        viewer.update_once();
        viewer.drain_events();

        viewer.handle_input(InputEvent::Resize {
            size: Point::new(512.0, 256.0),
        });
        assert!(viewer.drain_events().is_empty());
        viewer.update_once();
        assert!(viewer.drain_events().contains(&ViewerEvent::Resize));
        assert_eq!(
            viewer.viewport().unwrap().container_size(),
            Point::new(512.0, 256.0)
        );
    }

    #[test]
    fn test_empty_resize_is_not_reported() {
        let clock = ManualClock::new(0.0);
        let mut viewer = open_viewer(&clock);
        viewer.update_once();
        viewer.drain_events();

        viewer.set_container_size(Point::new(0.0, 0.0));
        viewer.update_once();
        assert!(!viewer.drain_events().contains(&ViewerEvent::Resize));
        assert_eq!(
            viewer.viewport().unwrap().container_size(),
            Point::new(256.0, 256.0)
        );

        viewer.set_container_size(Point::new(256.0, 128.0));
        viewer.update_once();
        assert!(viewer.drain_events().contains(&ViewerEvent::Resize));
    }

    #[test]
    fn test_single_zoom_cancels_held_zoom() {
        let clock = ManualClock::new(0.0);
        let mut viewer = open_viewer(&clock);
        viewer.begin_zooming_in();
        viewer.zoom_in();
        assert!(!viewer.is_zooming());

        clock.advance(500.0);
        viewer.update_once();
        assert!((viewer.viewport().unwrap().zoom(false) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_held_zoom_follows_elapsed_time() {
        let clock = ManualClock::new(0.0);
        let mut viewer = open_viewer(&clock);
        viewer.begin_zooming_in();
        assert!(viewer.is_zooming());

        clock.advance(500.0);
        viewer.update_once();
        let expected = 2.0_f64.powf(0.5);
        assert!((viewer.viewport().unwrap().zoom(false) - expected).abs() < 1e-9);

        viewer.end_zooming();
        clock.advance(500.0);
        viewer.update_once();
        assert!((viewer.viewport().unwrap().zoom(false) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_idle_frame_delay() {
        let clock = ManualClock::new(1000.0);
        let viewer = open_viewer(&clock);
        let delay = viewer.next_frame_delay(Some(995.0));
        assert!((delay - (995.0 + 1000.0 / 60.0 - 1000.0)).abs() < 1e-9);
        assert_eq!(viewer.next_frame_delay(Some(0.0)), 1.0);
    }

    #[test]
    fn test_layers_share_viewport() {
        let clock = ManualClock::new(0.0);
        let mut viewer = open_viewer(&clock);
        viewer
            .add_layer(
                source(),
                DeferredImageLoader::default(),
                RenderContext::new(SurfaceMode::Immediate),
            )
            .unwrap();
        assert_eq!(viewer.drawers().len(), 2);
        viewer.update_once();
        for drawer in viewer.drawers_mut() {
            assert_eq!(drawer.loader_mut().take_requests().len(), 1);
        }
    }
}
