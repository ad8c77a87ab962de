use deepzoom::prelude::*;

/// Frame-loop scenarios for a drawer fed by a host that answers every
/// request immediately
#[cfg(test)]
mod drawer_tests {
    use super::*;

    type TestDrawer = Drawer<DeferredImageLoader<u32>, RenderContext<u32>>;

    fn viewport(clock: &ManualClock, width: f64, height: f64) -> Viewport {
        Viewport::new(
            Point::new(256.0, 256.0),
            Point::new(width, height),
            ViewportConfig::default(),
            clock.shared(),
        )
        .unwrap()
    }

    fn drawer(clock: &ManualClock, source: TileSource, config: DrawerConfig) -> TestDrawer {
        Drawer::new(
            source,
            config,
            DeferredImageLoader::default(),
            RenderContext::immediate(),
            clock.shared(),
        )
    }

    fn no_blend() -> DrawerConfig {
        DrawerConfig {
            blend_time: 0.0,
            ..DrawerConfig::default()
        }
    }

    /// Runs frames until the drawer is idle, answering requests with the
    /// tile's level unless `fails` says otherwise. Returns the number of
    /// loads issued.
    fn run_until_idle(
        clock: &ManualClock,
        drawer: &mut TestDrawer,
        viewport: &Viewport,
        fails: impl Fn(TileKey) -> bool,
        mut after_frame: impl FnMut(&TestDrawer),
    ) -> usize {
        let mut issued = 0;
        for _ in 0..500 {
            clock.advance(16.0);
            drawer.update(viewport);
            after_frame(&*drawer);

            let requests = drawer.loader_mut().take_requests();
            if requests.is_empty() && !drawer.needs_update() {
                return issued;
            }
            issued += requests.len();
            for request in requests {
                let image = if fails(request.key) {
                    None
                } else {
                    Some(request.key.level)
                };
                assert!(drawer.loader_mut().complete(request.key, image));
            }
        }
        panic!("drawer never settled");
    }

    fn drawn_levels(drawer: &TestDrawer) -> Vec<u32> {
        drawer.surface().tiles().map(|(level, ..)| *level).collect()
    }

    #[test]
    fn test_view_resolves_to_sharpest_useful_level() {
        let clock = ManualClock::new(0.0);
        let viewport = viewport(&clock, 512.0, 512.0);
        let source = TileSource::dzi(512, 512, 256, 0, "tiles/", "png").unwrap();
        let mut drawer = drawer(&clock, source, no_blend());

        // levels 0..=8 hold one tile each, level 9 holds four
        let issued = run_until_idle(&clock, &mut drawer, &viewport, |_| false, |_| {});
        assert_eq!(issued, 13);

        // one more frame to draw with everything loaded
        clock.advance(16.0);
        drawer.update(&viewport);
        assert_eq!(drawn_levels(&drawer), vec![9, 9, 9, 9]);
        assert!(drawer.surface().tiles().all(|(_, _, _, opacity)| opacity == 1.0));
        assert!(!drawer.needs_update());
    }

    #[test]
    fn test_failed_level_falls_back_to_coarser_tiles() {
        let clock = ManualClock::new(0.0);
        let viewport = viewport(&clock, 512.0, 512.0);
        let source = TileSource::dzi(512, 512, 256, 0, "tiles/", "png").unwrap();
        let mut drawer = drawer(&clock, source, no_blend());

        run_until_idle(&clock, &mut drawer, &viewport, |key| key.level == 9, |_| {});
        clock.advance(16.0);
        drawer.update(&viewport);

        assert_eq!(drawn_levels(&drawer), vec![8]);
        let failed = drawer.tile(&TileKey::new(9, 1, 1)).unwrap();
        assert!(!failed.exists);
        assert!(!failed.loading);
    }

    #[test]
    fn test_blending_keeps_frames_coming() {
        let clock = ManualClock::new(0.0);
        let viewport = viewport(&clock, 256.0, 256.0);
        let source = TileSource::dzi(256, 256, 256, 0, "tiles/", "png").unwrap();
        let config = DrawerConfig {
            blend_time: 1.0,
            ..DrawerConfig::default()
        };
        let mut drawer = drawer(&clock, source, config);

        let mut saw_partial = false;
        run_until_idle(
            &clock,
            &mut drawer,
            &viewport,
            |_| false,
            |drawer| {
                if drawer
                    .surface()
                    .tiles()
                    .any(|(_, _, _, opacity)| opacity > 0.0 && opacity < 1.0)
                {
                    saw_partial = true;
                }
            },
        );
        assert!(saw_partial);

        clock.advance(16.0);
        drawer.update(&viewport);
        assert!(drawer.surface().tiles().all(|(_, _, _, opacity)| opacity == 1.0));
    }

    #[test]
    fn test_loaded_pool_stays_bounded_while_panning() {
        let clock = ManualClock::new(0.0);
        let mut viewport = viewport(&clock, 4096.0, 4096.0);
        let source = TileSource::dzi(4096, 4096, 256, 0, "tiles/", "jpg").unwrap();
        let config = DrawerConfig {
            max_image_cache_count: 32,
            blend_time: 0.0,
            ..DrawerConfig::default()
        };
        let mut drawer = drawer(&clock, source, config);

        viewport.zoom_to(16.0, None, true);
        viewport.update();

        let mut issued = 0;
        for step in 0..16 {
            let x = (step as f64 + 0.5) / 16.0;
            viewport.pan_to(Point::new(x, 0.5), true);
            viewport.update();

            issued += run_until_idle(
                &clock,
                &mut drawer,
                &viewport,
                |_| false,
                |drawer| assert!(drawer.num_tiles_loaded() <= 32),
            );
        }

        assert!(issued > 32, "only {} loads issued", issued);
        assert_eq!(drawer.num_tiles_loaded(), 32);

        // the coarse levels survive eviction
        for level in 0..=8 {
            assert!(drawer.tile(&TileKey::new(level, 0, 0)).unwrap().loaded);
        }
        // the tiles at the start of the sweep did not
        assert!(!drawer.tile(&TileKey::new(12, 0, 7)).unwrap().loaded);
    }

    #[test]
    fn test_reset_starts_over() {
        let clock = ManualClock::new(0.0);
        let viewport = viewport(&clock, 512.0, 512.0);
        let source = TileSource::dzi(512, 512, 256, 0, "tiles/", "png").unwrap();
        let mut drawer = drawer(&clock, source, no_blend());

        run_until_idle(&clock, &mut drawer, &viewport, |_| false, |_| {});
        assert_eq!(drawer.num_tiles_loaded(), 13);

        drawer.reset();
        assert_eq!(drawer.num_tiles_loaded(), 0);
        assert!(drawer.needs_update());

        let issued = run_until_idle(&clock, &mut drawer, &viewport, |_| false, |_| {});
        assert_eq!(issued, 13);
    }

    #[test]
    fn test_wrapped_view_draws_folded_tiles() {
        let clock = ManualClock::new(0.0);
        let config = ViewerOptions::default().with_wrap(true, false).viewport;
        let mut viewport = Viewport::new(
            Point::new(256.0, 256.0),
            Point::new(256.0, 256.0),
            config,
            clock.shared(),
        )
        .unwrap();
        let source = TileSource::dzi(256, 256, 256, 0, "tiles/", "png").unwrap();
        let mut drawer = drawer(&clock, source, no_blend());

        // a quarter period past the right edge of the image
        viewport.pan_to(Point::new(1.25, 0.5), true);
        viewport.update();

        run_until_idle(&clock, &mut drawer, &viewport, |_| false, |_| {});
        clock.advance(16.0);
        drawer.update(&viewport);

        let wrapped = drawer.tile(&TileKey::new(8, 1, 0)).unwrap();
        assert_eq!(wrapped.url, "tiles/8/0_0.png");
        assert!(wrapped.loaded);

        let mut drawn: Vec<_> = drawer
            .surface()
            .tiles()
            .map(|(level, position, _, opacity)| (*level, position, opacity))
            .collect();
        drawn.sort_by(|a, b| a.1.x.total_cmp(&b.1.x));
        assert_eq!(
            drawn,
            vec![
                (8, Point::new(-192.0, 0.0), 1.0),
                (8, Point::new(64.0, 0.0), 1.0),
            ]
        );
    }

    #[test]
    fn test_legacy_source_picks_matching_file() {
        let clock = ManualClock::new(0.0);
        let viewport = viewport(&clock, 1024.0, 1024.0);
        let source = TileSource::from(
            LegacyTileSource::new(vec![
                LegacyLevel::new("small.png", 128, 128),
                LegacyLevel::new("medium.png", 256, 256),
                LegacyLevel::new("large.png", 1024, 1024),
            ])
            .unwrap(),
        );
        let mut drawer = drawer(&clock, source, no_blend());

        run_until_idle(&clock, &mut drawer, &viewport, |_| false, |_| {});
        clock.advance(16.0);
        drawer.update(&viewport);

        let urls: Vec<_> = drawer
            .last_drawn()
            .filter_map(|key| drawer.tile(key))
            .map(|tile| tile.url.clone())
            .collect();
        assert_eq!(urls, vec!["medium.png".to_string()]);
    }
}
