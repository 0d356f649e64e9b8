//! Keyboard callbacks: navigation, selection cycling, labeling, housekeeping.
//!
//! Handles: prev_image, next_image, next_unannotated, prev_unannotated,
//! clear_annotations, undo_point, and the text_key dispatch for letter,
//! digit, and punctuation bindings.

use std::rc::Rc;

use slint::ComponentHandle;

use super::{
    ImageLoader, SharedState, persist, persist_and_report, refresh_class_legend,
    refresh_label_text, refresh_overlays,
};
use crate::dataset::Dataset;
use crate::voc;
use crate::{AppWindow, BoxView, ClassItem, PointView};

/// Sets up all keyboard-related callbacks on the UI.
pub fn setup_keyboard_callbacks(
    ui: &AppWindow,
    state: SharedState,
    loader: ImageLoader,
    boxes: Rc<slint::VecModel<BoxView>>,
    points: Rc<slint::VecModel<PointView>>,
    class_items: Rc<slint::VecModel<ClassItem>>,
) {
    setup_navigation(ui, state.clone(), loader.clone());
    setup_clear_annotations(ui, state.clone(), boxes.clone(), points.clone());
    setup_undo_point(ui, state.clone(), boxes.clone(), points.clone());
    setup_text_key(ui, state, loader, boxes, points, class_items);
}

/// Leave the current image and show the one `advance` picks. A half-drawn box
/// is abandoned on the way out, and dropping its corner flushes any edits the
/// pending state was holding back; an image left with no boxes gets its
/// sidecar removed.
fn navigate(state: &SharedState, loader: &ImageLoader, advance: impl FnOnce(&mut Dataset)) {
    // Scope the borrow; the loader borrows the state again.
    let index = {
        let mut st = state.borrow_mut();
        let image = st.dataset.current_abs();
        if st.session.pending_corner() {
            st.session.points.pop();
            if let Err(e) = persist(&mut st) {
                log::error!("Failed to save annotations for {}: {}", image.display(), e);
            }
        } else if st.session.points.is_empty() {
            if let Err(e) = voc::remove_sidecar(&image) {
                log::warn!("Failed to remove empty sidecar for {}: {}", image.display(), e);
            }
        }
        advance(&mut st.dataset);
        st.dataset.position()
    };
    loader(index);
}

fn setup_navigation(ui: &AppWindow, state: SharedState, loader: ImageLoader) {
    let st = state.clone();
    let ld = loader.clone();
    ui.on_prev_image(move || navigate(&st, &ld, |ds| ds.step(-1)));

    let st = state.clone();
    let ld = loader.clone();
    ui.on_next_image(move || navigate(&st, &ld, |ds| ds.step(1)));

    let st = state.clone();
    let ld = loader.clone();
    ui.on_next_unannotated(move || navigate(&st, &ld, |ds| ds.seek_unannotated(true)));

    ui.on_prev_unannotated(move || navigate(&state, &loader, |ds| ds.seek_unannotated(false)));
}

fn setup_clear_annotations(
    ui: &AppWindow,
    state: SharedState,
    boxes: Rc<slint::VecModel<BoxView>>,
    points: Rc<slint::VecModel<PointView>>,
) {
    let ui_weak = ui.as_weak();
    ui.on_clear_annotations(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        let mut st = state.borrow_mut();
        st.session.clear();
        let image = st.dataset.current_abs();
        if let Err(e) = voc::remove_sidecar(&image) {
            log::error!("Failed to remove sidecar for {}: {}", image.display(), e);
            ui.set_status_text(format!("Delete failed: {}", e).into());
        }
        refresh_overlays(&ui, &st, &boxes, &points);
    });
}

fn setup_undo_point(
    ui: &AppWindow,
    state: SharedState,
    boxes: Rc<slint::VecModel<BoxView>>,
    points: Rc<slint::VecModel<PointView>>,
) {
    let ui_weak = ui.as_weak();
    ui.on_undo_point(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        let mut st = state.borrow_mut();
        if st.session.backspace() {
            persist_and_report(&ui, &mut st);
        }
        refresh_overlays(&ui, &st, &boxes, &points);
    });
}

fn setup_text_key(
    ui: &AppWindow,
    state: SharedState,
    loader: ImageLoader,
    boxes: Rc<slint::VecModel<BoxView>>,
    points: Rc<slint::VecModel<PointView>>,
    class_items: Rc<slint::VecModel<ClassItem>>,
) {
    let ui_weak = ui.as_weak();
    ui.on_text_key(move |key| {
        let Some(ui) = ui_weak.upgrade() else { return };
        match key.as_str() {
            "a" | "A" => navigate(&state, &loader, |ds| ds.step(-1)),
            "d" | "D" => navigate(&state, &loader, |ds| ds.step(1)),
            "w" | "W" => navigate(&state, &loader, |ds| ds.seek_unannotated(true)),
            "s" | "S" => navigate(&state, &loader, |ds| ds.seek_unannotated(false)),
            "," => navigate(&state, &loader, |ds| ds.seek_annotated(false)),
            "." => navigate(&state, &loader, |ds| ds.seek_annotated(true)),
            "t" | "T" => {
                let mut st = state.borrow_mut();
                st.labels_visible = !st.labels_visible;
                ui.set_labels_visible(st.labels_visible);
            }
            "q" | "Q" => {
                let mut st = state.borrow_mut();
                st.session.cycle_selection(false);
                refresh_overlays(&ui, &st, &boxes, &points);
            }
            "e" | "E" => {
                let mut st = state.borrow_mut();
                st.session.cycle_selection(true);
                refresh_overlays(&ui, &st, &boxes, &points);
            }
            "p" | "P" => {
                let mut st = state.borrow_mut();
                if st.session.revert() {
                    persist_and_report(&ui, &mut st);
                }
                refresh_overlays(&ui, &st, &boxes, &points);
            }
            _ => {
                if let Some(digit) = key.chars().next().filter(|c| c.is_ascii_digit()) {
                    apply_digit(&ui, &state, &boxes, &points, &class_items, digit);
                }
            }
        }
    });
}

/// A digit key picks a class: it becomes the default label and, when boxes
/// exist, relabels the selected one. The highlight drops either way so the
/// class color is visible.
fn apply_digit(
    ui: &AppWindow,
    state: &SharedState,
    boxes: &slint::VecModel<BoxView>,
    points: &slint::VecModel<PointView>,
    class_items: &slint::VecModel<ClassItem>,
    digit: char,
) {
    let mut st = state.borrow_mut();
    st.session.highlighted = false;
    let name = st.classes.class_for_digit(digit).map(|c| c.name.clone());
    if let Some(name) = name {
        st.default_label = name.clone();
        if st.session.relabel(&name) {
            persist_and_report(ui, &mut st);
        }
        refresh_label_text(ui, &st);
        refresh_class_legend(&st, class_items);
    }
    refresh_overlays(ui, &st, boxes, points);
}
