#![no_main]

//! Drag clamping over arbitrary viewports, element sizes, and margins.

use arbitrary::Arbitrary;
use dimmer_core::{Document, HeadlessDocument, Point, Size};
use dimmer_widgets::modal::{DragController, drag_limit};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    viewport: (u32, u32),
    size: (u32, u32),
    margin: (i16, i16),
    grab: (i32, i32),
    moves: Vec<(i32, i32)>,
}

fuzz_target!(|input: Input| {
    let mut doc = HeadlessDocument::new(Size::new(input.viewport.0, input.viewport.1));
    let container = doc.create_attached("div", Size::ZERO);
    let Ok(el) = doc.create_child(container, "div") else {
        return;
    };
    doc.set_client_size(el, Size::new(input.size.0, input.size.1));
    let Ok(drag) = DragController::attach(&mut doc, el) else {
        return;
    };
    let (mx, my) = (i32::from(input.margin.0), i32::from(input.margin.1));
    let mut drag = drag.margin(mx, my);
    let limit = Point::new(
        drag_limit(input.viewport.0, input.size.0, mx),
        drag_limit(input.viewport.1, input.size.1, my),
    );

    if !drag.pointer_down(&doc, el, Point::new(input.grab.0, input.grab.1)) {
        return;
    }
    for &(x, y) in input.moves.iter().take(64) {
        let Ok(Some(pos)) = drag.pointer_move(&mut doc, Point::new(x, y)) else {
            continue;
        };
        if limit.x >= 0 {
            assert!(i64::from(pos.x).abs() <= i64::from(limit.x), "{pos:?} vs {limit:?}");
        }
        if limit.y >= 0 {
            assert!(i64::from(pos.y).abs() <= i64::from(limit.y), "{pos:?} vs {limit:?}");
        }
        assert_eq!(doc.offset(el), pos);
    }
});
