use deepzoom::prelude::*;
use deepzoom::tiles::source::tiles_url_for_descriptor;
use std::thread;
use std::time::Duration;

/// Pretends to download and decode a tile, returning its size in pixels
struct SyntheticFetcher {
    latency: Duration,
}

impl ImageFetcher for SyntheticFetcher {
    type Image = (u32, u32);

    fn fetch(&self, url: &str) -> deepzoom::Result<(u32, u32)> {
        thread::sleep(self.latency);
        if url.is_empty() {
            return Err(ViewerError::Load("empty tile url".to_string()));
        }
        Ok((256, 256))
    }
}

type DemoViewer = Viewer<ThreadedImageLoader<SyntheticFetcher>, RenderContext<(u32, u32)>>;

/// Runs frames until the viewer has nothing left to do
fn run_until_idle(viewer: &mut DemoViewer, clock: &SharedClock) -> usize {
    let mut frames = 0;

    for _ in 0..10_000 {
        let prev_update = Some(clock.now_millis());
        viewer.update_once();
        frames += 1;

        let drawer = &viewer.drawers()[0];
        let busy = viewer.is_animating()
            || drawer.needs_update()
            || drawer.loader().downloading() > 0;
        if !busy {
            break;
        }
        let delay = viewer.next_frame_delay(prev_update);
        thread::sleep(Duration::from_secs_f64(delay / 1000.0));
    }
    frames
}

fn report(viewer: &DemoViewer, label: &str) {
    let viewport = match viewer.viewport() {
        Some(viewport) => viewport,
        None => return,
    };
    let drawer = &viewer.drawers()[0];
    let bounds = viewport.bounds(true);
    println!(
        "   {}: zoom {:.3}, bounds {}, {} tiles drawn, {} loaded",
        label,
        viewport.zoom(true),
        bounds,
        drawer.surface().tiles().count(),
        drawer.num_tiles_loaded()
    );
}

/// Drives the viewer without any display: tiles are "fetched" on worker
/// threads and drawing is recorded
fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("Deep zoom headless example");
    println!("==========================");

    let options = ViewerOptions::default();
    options.validate()?;
    let clock = SystemClock::shared();

    let mut viewer: DemoViewer =
        Viewer::new(options.clone(), Point::new(1024.0, 768.0), clock.clone())?;

    let source = TileSource::dzi(
        16384,
        12288,
        254,
        1,
        tiles_url_for_descriptor("https://example.com/images/harbor.dzi"),
        "jpg",
    )?;
    println!(
        "Opening {}x{} image, levels {}..={}",
        source.dimensions().x,
        source.dimensions().y,
        source.min_level(),
        source.max_level()
    );

    let loader = ThreadedImageLoader::new(
        SyntheticFetcher {
            latency: Duration::from_millis(5),
        },
        options.loader.clone(),
    );
    viewer.open(source, loader, RenderContext::positioned())?;

    let frames = run_until_idle(&mut viewer, &clock);
    report(&viewer, &format!("home view after {} frames", frames));

    println!("\nNavigating:");
    viewer.handle_input(InputEvent::Click {
        position: Point::new(700.0, 300.0),
        quick: true,
        shift: false,
    });
    let frames = run_until_idle(&mut viewer, &clock);
    report(&viewer, &format!("click zoom, {} frames", frames));

    viewer.handle_input(InputEvent::Scroll {
        position: Point::new(512.0, 384.0),
        scroll: 3.0,
        shift: false,
    });
    run_until_idle(&mut viewer, &clock);
    report(&viewer, "scrolled in");

    viewer.handle_input(InputEvent::Drag {
        position: Point::new(512.0, 384.0),
        delta: Point::new(-300.0, 120.0),
        shift: false,
    });
    viewer.handle_input(InputEvent::Release { inside_press: true });
    run_until_idle(&mut viewer, &clock);
    report(&viewer, "dragged");

    viewer.handle_input(InputEvent::Resize {
        size: Point::new(800.0, 800.0),
    });
    run_until_idle(&mut viewer, &clock);
    report(&viewer, "resized");

    viewer.go_home();
    run_until_idle(&mut viewer, &clock);
    report(&viewer, "home again");

    println!("\nEvents:");
    for event in viewer.drain_events() {
        println!("   {}", event.name());
    }

    viewer.close();
    Ok(())
}
