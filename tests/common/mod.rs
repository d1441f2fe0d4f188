//! Shared helpers for the integration tests.

use std::cell::RefCell;
use std::rc::Rc;

use deepzoom_annotator::tool::PointerEvent;
use deepzoom_annotator::{
    Annotator, AnnotatorConfig, AnnotatorEvent, ImageBounds, Point, ViewerAdapter, ViewerEvent,
};

/// A viewer zoomed by `scale` and panned by `offset` (viewport = image * scale + offset).
pub struct FakeViewer {
    pub scale: f64,
    pub offset: Point,
    pub image: ImageBounds,
}

impl ViewerAdapter for FakeViewer {
    fn viewport_to_image(&self, point: Point) -> Point {
        Point::new(
            (point.x - self.offset.x) / self.scale,
            (point.y - self.offset.y) / self.scale,
        )
    }

    fn image_size(&self) -> ImageBounds {
        self.image
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 1000x500 image shown at 2x zoom, panned by (100, 50).
pub fn annotator(config: AnnotatorConfig) -> Annotator<FakeViewer> {
    init_logging();
    let viewer = FakeViewer {
        scale: 2.0,
        offset: Point::new(100.0, 50.0),
        image: ImageBounds::new(1000.0, 500.0),
    };
    Annotator::new(viewer, config)
}

/// Viewport position of an image point in [`annotator`]'s viewer.
pub fn viewport(x: f64, y: f64) -> Point {
    Point::new(x * 2.0 + 100.0, y * 2.0 + 50.0)
}

pub fn record(annotator: &mut Annotator<FakeViewer>) -> Rc<RefCell<Vec<AnnotatorEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    annotator.on(move |e| sink.borrow_mut().push(e.clone()));
    events
}

pub fn press(x: f64, y: f64, ms: f64) -> ViewerEvent {
    ViewerEvent::CanvasPress {
        position: viewport(x, y),
        event: PointerEvent::at(ms),
    }
}

pub fn drag(x: f64, y: f64, ms: f64) -> ViewerEvent {
    ViewerEvent::CanvasDrag {
        position: viewport(x, y),
        event: PointerEvent::at(ms),
    }
}

pub fn release(x: f64, y: f64, ms: f64) -> ViewerEvent {
    ViewerEvent::CanvasRelease {
        position: viewport(x, y),
        event: PointerEvent::at(ms),
    }
}

/// Press and release at one image point. Returns the annotation completed by
/// either half of the click.
pub fn click(
    annotator: &mut Annotator<FakeViewer>,
    x: f64,
    y: f64,
    ms: f64,
) -> Option<deepzoom_annotator::Annotation> {
    let pressed = annotator.handle_viewer_event(press(x, y, ms));
    let released = annotator.handle_viewer_event(release(x, y, ms + 50.0));
    pressed.or(released)
}
