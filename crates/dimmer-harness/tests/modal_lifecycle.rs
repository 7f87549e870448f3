#![forbid(unsafe_code)]

//! Integration tests: modal stack lifecycle on a headless page.

use dimmer_core::{Display, Document, Event, Size};
use dimmer_harness::{Page, assert_tree, ops};
use dimmer_widgets::modal::{
    AFTER_CLOSE_EVENT, CloseReason, ModalAction, ModalError, ModalOptionsPatch, ModalPhase,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn instant() -> ModalOptionsPatch {
    ModalOptionsPatch::new().fade_duration_ms(0)
}

// ============================================================================
// Stack ordering
// ============================================================================

#[test]
fn n_opens_then_n_closes_empty_the_page() {
    for n in 1..=6 {
        let mut page = Page::new();
        let els: Vec<_> = (0..n).map(|_| page.element(Size::new(200, 150))).collect();
        for &el in &els {
            page.open(el, &ModalOptionsPatch::new()).unwrap();
            page.check_invariants().unwrap();
        }
        assert_eq!(page.modals().depth(), n);
        for _ in 0..n {
            assert!(page.close().unwrap().is_some());
            page.check_invariants().unwrap();
        }
        page.settle().unwrap();
        page.check_invariants().unwrap();

        let lock = page.modals().scroll_lock();
        assert_eq!((lock.acquisitions(), lock.releases()), (1, 1), "n = {n}");
        assert_eq!(page.doc().unpin_count(), 1);
        assert!(page.attached_containers().is_empty());
    }
}

#[test]
fn two_opens_then_one_close_removes_the_newest() {
    let mut page = Page::new();
    let first = page.element(Size::new(200, 150));
    let second = page.element(Size::new(200, 150));
    let a = page.open(first, &ModalOptionsPatch::new()).unwrap();
    let b = page.open(second, &ModalOptionsPatch::new()).unwrap();
    assert_ne!(a, b);

    assert_eq!(page.close().unwrap(), Some(b));
    page.settle().unwrap();
    page.check_invariants().unwrap();

    assert_eq!(page.modals().top_id(), Some(a));
    assert_eq!(page.modals().phase(a), Some(ModalPhase::Open));
    assert_eq!(page.modals().phase(b), Some(ModalPhase::Closed));
    assert_eq!(page.doc().parent(second), Some(page.doc().body()));
    assert_eq!(page.attached_containers().len(), 1);
    assert!(page.modals().scroll_lock().is_locked());
}

#[test]
fn close_on_empty_page_changes_nothing() {
    let mut page = Page::new();
    page.doc_mut().user_scroll(120);
    assert_eq!(page.close().unwrap(), None);
    assert_eq!(page.modals().scroll_lock().acquisitions(), 0);
    assert_eq!(page.modals().scroll_lock().releases(), 0);
    assert_eq!(page.doc().pin_count(), 0);
    assert_eq!(page.doc().scroll_y(), 120);
    page.check_invariants().unwrap();
}

#[test]
fn scroll_offset_survives_a_modal() {
    let mut page = Page::new();
    let el = page.element(Size::new(200, 150));
    page.doc_mut().user_scroll(340);

    page.open(el, &instant()).unwrap();
    assert_eq!(page.doc().pinned_at(), Some(340));
    page.doc_mut().user_scroll(10);

    page.close().unwrap();
    assert_eq!(page.doc().pinned_at(), None);
    assert_eq!(page.doc().scroll_y(), 340);
}

#[test]
fn opening_an_open_element_is_rejected() {
    let mut page = Page::new();
    let el = page.element(Size::new(200, 150));
    let id = page.open(el, &ModalOptionsPatch::new()).unwrap();
    let err = page.open(el, &ModalOptionsPatch::new()).unwrap_err();
    assert_eq!(err, ModalError::AlreadyOpen { element: el, id });
    page.check_invariants().unwrap();
}

// ============================================================================
// Fades
// ============================================================================

#[test]
fn zero_duration_open_is_synchronous() {
    let mut page = Page::new();
    let el = page.element(Size::new(200, 150));
    let id = page.open(el, &instant()).unwrap();

    assert_eq!(page.modals().phase(id), Some(ModalPhase::Open));
    assert_eq!(page.modals().pending_timers(), 0);
    let style = page.doc().style(el).unwrap();
    assert_eq!(style.opacity, Some(1.0));
    assert!(style.is_shown());
    assert_tree!(
        page.doc(),
        page.doc().body(),
        "
body
  div.mask.blocker.current [display=block visibility=visible opacity=1]
    div.modal [display=inline-block visibility=visible opacity=1]
      a.close-modal
"
    );
}

#[test]
fn zero_duration_close_detaches_synchronously() {
    let mut page = Page::new();
    let el = page.element(Size::new(200, 150));
    page.open(el, &instant()).unwrap();
    page.close().unwrap();

    assert_eq!(page.modals().closing_count(), 0);
    assert_eq!(page.modals().pending_timers(), 0);
    assert_tree!(
        page.doc(),
        page.doc().body(),
        "
body
  div.modal [display=none visibility=hidden opacity=0]
"
    );
}

#[test]
fn content_waits_for_the_fade_delay() {
    let mut page = Page::new();
    let el = page.element(Size::new(200, 150));
    let id = page.open(el, &ModalOptionsPatch::new()).unwrap();

    // 260ms × 0.6 = 156ms before the content starts to fade in.
    page.run_for(150).unwrap();
    assert_eq!(page.doc().opacity(el), Some(0.0));
    page.run_for(100).unwrap();
    let mid = page.doc().opacity(el).unwrap_or(0.0);
    assert!(mid > 0.0 && mid < 1.0, "content opacity {mid}");

    page.run_for(300).unwrap();
    assert_eq!(page.doc().opacity(el), Some(1.0));
    assert_eq!(page.modals().phase(id), Some(ModalPhase::Open));
    assert_eq!(page.modals().pending_timers(), 0);
}

#[test]
fn immediate_close_never_reappears() {
    let mut page = Page::new();
    let el = page.element(Size::new(200, 150));
    page.open(el, &ModalOptionsPatch::new().fade_delay(0.0)).unwrap();
    page.run_for(40).unwrap();
    page.close().unwrap();

    let mut peak = page.doc().opacity(el).unwrap_or(0.0);
    for _ in 0..30 {
        page.run_for(10).unwrap();
        let now = page.doc().opacity(el).unwrap_or(0.0);
        assert!(now <= peak, "opacity rose from {peak} to {now}");
        peak = now;
    }
    let style = page.doc().style(el).unwrap();
    assert!(!style.is_shown());
    assert_eq!(style.display, Some(Display::None));
    assert_eq!(page.modals().pending_timers(), 0);
    assert_eq!(page.modals().closing_count(), 0);
}

#[test]
fn close_during_fade_delay_skips_the_reveal() {
    let mut page = Page::new();
    let el = page.element(Size::new(200, 150));
    page.open(el, &ModalOptionsPatch::new()).unwrap();
    page.run_for(50).unwrap();
    page.close().unwrap();
    page.settle().unwrap();

    assert!(!page.doc().style(el).unwrap().is_shown());
    page.check_invariants().unwrap();
}

#[test]
fn reopen_during_close_fade_finishes_the_old_close() {
    let mut page = Page::new();
    let el = page.element(Size::new(200, 150));
    let first = page.open(el, &instant()).unwrap();
    page.modals_mut().set_options(&ModalOptionsPatch::new().fade_duration_ms(200)).unwrap();
    page.close().unwrap();
    let second = page.open(el, &ModalOptionsPatch::new()).unwrap();
    page.run_for(500).unwrap();
    page.close().unwrap();
    page.run_for(50).unwrap();
    assert_eq!(page.modals().phase(second), Some(ModalPhase::Closing));

    let third = page.open(el, &instant()).unwrap();
    assert_eq!(page.modals().phase(second), Some(ModalPhase::Closed));
    assert_eq!(page.modals().phase(first), Some(ModalPhase::Closed));
    assert!(page.doc().style(el).unwrap().is_shown());
    assert_eq!(page.modals().closing_count(), 0);

    page.settle().unwrap();
    assert_eq!(page.modals().phase(third), Some(ModalPhase::Open));
    page.check_invariants().unwrap();
}

// ============================================================================
// Escape and clicks
// ============================================================================

#[test]
fn escape_closes_only_the_top_modal() {
    let mut page = Page::new();
    let first = page.element(Size::new(200, 150));
    let second = page.element(Size::new(200, 150));
    let a = page.open(first, &instant()).unwrap();
    let b = page.open(second, &instant()).unwrap();
    assert_eq!(page.modals().escape_owner(), Some(b));

    let action = page.send(&Event::escape()).unwrap();
    assert_eq!(
        action,
        Some(ModalAction::Closed {
            id: b,
            reason: CloseReason::Escape
        })
    );
    assert_eq!(page.modals().top_id(), Some(a));
    assert_eq!(page.modals().escape_owner(), Some(a));

    page.send(&Event::escape()).unwrap();
    assert!(page.modals().is_empty());
    assert_eq!(page.modals().escape_owner(), None);
    page.check_invariants().unwrap();
}

#[test]
fn escape_is_ignored_when_the_top_opted_out() {
    let mut page = Page::new();
    let first = page.element(Size::new(200, 150));
    let second = page.element(Size::new(200, 150));
    page.open(first, &instant()).unwrap();
    page.open(second, &instant().escape_close(false)).unwrap();

    assert_eq!(page.send(&Event::escape()).unwrap(), None);
    assert_eq!(page.modals().depth(), 2);
    page.check_invariants().unwrap();
}

#[test]
fn after_close_fires_once_per_close() {
    let mut page = Page::new();
    let el = page.element(Size::new(200, 150));
    let id = page.open(el, &ModalOptionsPatch::new()).unwrap();
    page.run_for(400).unwrap();
    page.close().unwrap();
    assert!(page.doc().dispatched(el).is_empty());

    page.settle().unwrap();
    assert_eq!(page.doc().dispatched(el), [AFTER_CLOSE_EVENT.to_string()]);
    assert_eq!(page.modals_mut().drain_closed(), vec![id]);

    page.open(el, &instant()).unwrap();
    page.close().unwrap();
    assert_eq!(page.doc().dispatched(el).len(), 2);
}

#[test]
fn backdrop_click_needs_the_container_itself() {
    let mut page = Page::new();
    let el = page.element(Size::new(200, 150));
    let inner = page.child(el, "p").unwrap();
    let id = page.open(el, &instant()).unwrap();

    assert_eq!(page.send(&Event::click(inner)).unwrap(), None);
    assert_eq!(page.send(&Event::click(el)).unwrap(), None);
    assert!(page.modals().contains(id));

    let container = page.modals().container(id).unwrap();
    assert_eq!(
        page.send(&Event::click(container)).unwrap(),
        Some(ModalAction::Closed {
            id,
            reason: CloseReason::Backdrop
        })
    );
    page.check_invariants().unwrap();
}

#[test]
fn backdrop_click_respects_click_close() {
    let mut page = Page::new();
    let el = page.element(Size::new(200, 150));
    let id = page.open(el, &instant().click_close(false)).unwrap();
    let container = page.modals().container(id).unwrap();
    assert_eq!(page.send(&Event::click(container)).unwrap(), None);
    assert!(page.modals().contains(id));
}

#[test]
fn close_button_closes_and_is_removed() {
    let mut page = Page::new();
    let el = page.element(Size::new(200, 150));
    let id = page.open(el, &instant()).unwrap();
    let button = page.modals().close_button(id).unwrap();

    assert_eq!(
        page.send(&Event::click(button)).unwrap(),
        Some(ModalAction::Closed {
            id,
            reason: CloseReason::CloseButton
        })
    );
    assert_eq!(page.doc().parent(button), None);
    assert!(!page.doc().exists(button));
    assert!(page.doc().children(el).is_empty());
}

#[test]
fn open_close_cycles_release_synthesized_nodes() {
    let mut page = Page::new();
    let el = page.element(Size::new(200, 150));
    let baseline = page.doc().element_count();
    let mut retired = Vec::new();
    for round in 0..200 {
        let patch = if round % 2 == 0 { instant() } else { ModalOptionsPatch::new() };
        let id = page.open(el, &patch).unwrap();
        retired.push(page.modals().container(id).unwrap());
        retired.extend(page.modals().close_button(id));
        page.close().unwrap();
        page.settle().unwrap();
        page.check_invariants().unwrap();
    }
    assert_eq!(page.doc().element_count(), baseline);
    assert!(retired.iter().all(|&node| !page.doc().exists(node)));
}

#[test]
fn hidden_close_button_is_not_created() {
    let mut page = Page::new();
    let el = page.element(Size::new(200, 150));
    let id = page.open(el, &instant().show_close(false)).unwrap();
    assert_eq!(page.modals().close_button(id), None);
    assert!(page.doc().children(el).is_empty());
}

// ============================================================================
// Random sessions
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_sessions_keep_invariants(steps in ops(40)) {
        let mut page = Page::new();
        for _ in 0..4 {
            page.element(Size::new(240, 180));
        }
        for step in &steps {
            step.apply(&mut page).unwrap();
            if let Err(msg) = page.check_invariants() {
                return Err(TestCaseError::fail(format!("after {step:?}: {msg}")));
            }
        }
        while page.close().unwrap().is_some() {}
        page.settle().unwrap();
        prop_assert!(page.check_invariants().is_ok());
        prop_assert!(page.attached_containers().is_empty());
        prop_assert_eq!(page.doc().pinned_at(), None);
    }
}
