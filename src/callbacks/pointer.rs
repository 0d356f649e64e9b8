//! Pointer callbacks for the image canvas.
//!
//! Handles: canvas_pressed, canvas_moved, canvas_released
//!
//! Coordinates arrive already converted to image pixels; the session decides
//! whether an event starts a drag, moves one, or places a corner.

use std::rc::Rc;

use slint::ComponentHandle;

use super::{SharedState, persist_and_report, refresh_overlays};
use crate::session::Point;
use crate::{AppWindow, BoxView, PointView};

/// Sets up all pointer-related callbacks on the UI.
pub fn setup_pointer_callbacks(
    ui: &AppWindow,
    state: SharedState,
    boxes: Rc<slint::VecModel<BoxView>>,
    points: Rc<slint::VecModel<PointView>>,
) {
    setup_canvas_pressed(ui, state.clone(), boxes.clone(), points.clone());
    setup_canvas_moved(ui, state.clone(), boxes.clone(), points.clone());
    setup_canvas_released(ui, state, boxes, points);
}

fn setup_canvas_pressed(
    ui: &AppWindow,
    state: SharedState,
    boxes: Rc<slint::VecModel<BoxView>>,
    points: Rc<slint::VecModel<PointView>>,
) {
    let ui_weak = ui.as_weak();
    ui.on_canvas_pressed(move |x, y| {
        let Some(ui) = ui_weak.upgrade() else { return };
        let mut st = state.borrow_mut();
        st.session.press(Point::new(x, y));
        refresh_overlays(&ui, &st, &boxes, &points);
    });
}

fn setup_canvas_moved(
    ui: &AppWindow,
    state: SharedState,
    boxes: Rc<slint::VecModel<BoxView>>,
    points: Rc<slint::VecModel<PointView>>,
) {
    let ui_weak = ui.as_weak();
    ui.on_canvas_moved(move |x, y| {
        let Some(ui) = ui_weak.upgrade() else { return };
        let mut st = state.borrow_mut();
        st.session.motion(Point::new(x, y));
        refresh_overlays(&ui, &st, &boxes, &points);
    });
}

fn setup_canvas_released(
    ui: &AppWindow,
    state: SharedState,
    boxes: Rc<slint::VecModel<BoxView>>,
    points: Rc<slint::VecModel<PointView>>,
) {
    let ui_weak = ui.as_weak();
    ui.on_canvas_released(move |x, y| {
        let Some(ui) = ui_weak.upgrade() else { return };
        let mut st = state.borrow_mut();
        let label = st.default_label.clone();
        if st.session.release(Point::new(x, y), &label) {
            persist_and_report(&ui, &mut st);
        }
        refresh_overlays(&ui, &st, &boxes, &points);
    });
}
