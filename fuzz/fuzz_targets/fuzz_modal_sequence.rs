#![no_main]

//! Random open/close/input/time sequences against the modal stack. Panics
//! if any stack invariant breaks.

use arbitrary::Arbitrary;
use dimmer_core::Size;
use dimmer_harness::{Op, Page};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum FuzzOp {
    Open {
        element: u8,
        fade_ms: u16,
        fade_delay_tenths: u8,
        escape_close: bool,
        allow_drag: bool,
    },
    Close,
    Escape,
    ClickBackdrop,
    ClickClose,
    Drag { dx: i16, dy: i16 },
    Advance(u16),
}

impl FuzzOp {
    fn to_op(&self) -> Op {
        match *self {
            Self::Open {
                element,
                fade_ms,
                fade_delay_tenths,
                escape_close,
                allow_drag,
            } => Op::Open {
                element: usize::from(element),
                fade_ms: u64::from(fade_ms % 1_000),
                fade_delay: f32::from(fade_delay_tenths % 20) / 10.0,
                escape_close,
                allow_drag,
            },
            Self::Close => Op::Close,
            Self::Escape => Op::Escape,
            Self::ClickBackdrop => Op::ClickBackdrop,
            Self::ClickClose => Op::ClickClose,
            Self::Drag { dx, dy } => Op::Drag {
                dx: i32::from(dx),
                dy: i32::from(dy),
            },
            Self::Advance(ms) => Op::Advance(u64::from(ms % 2_000)),
        }
    }
}

#[derive(Debug, Arbitrary)]
struct Session {
    viewport: (u16, u16),
    elements: u8,
    ops: Vec<FuzzOp>,
}

fuzz_target!(|session: Session| {
    let viewport = Size::new(u32::from(session.viewport.0), u32::from(session.viewport.1));
    let mut page = Page::with_viewport(viewport);
    for _ in 0..=(session.elements % 6) {
        page.element(Size::new(240, 180));
    }

    for op in session.ops.iter().take(256) {
        let op = op.to_op();
        if op.apply(&mut page).is_err() {
            return;
        }
        if let Err(msg) = page.check_invariants() {
            panic!("invariant broken after {op:?}: {msg}");
        }
    }

    while let Ok(Some(_)) = page.close() {}
    if page.settle().is_err() {
        return;
    }
    if let Err(msg) = page.check_invariants() {
        panic!("invariant broken after teardown: {msg}");
    }
    assert!(page.attached_containers().is_empty());
});
