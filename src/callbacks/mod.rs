//! Callback handlers for the annotator application.
//!
//! UI callback implementations organized by input source:
//! - `pointer` - canvas press/move/release driving box drawing and drags
//! - `keyboard` - navigation, selection, labeling, and housekeeping keys
//!
//! The pieces they share live here: the application state cell, the sidecar
//! persistence step, and the view refresh helpers.

pub mod keyboard;
pub mod pointer;

use std::cell::RefCell;
use std::rc::Rc;

use crate::classes::ClassConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::session::{Bounds, ImageSession, opposite_corners};
use crate::utils::parse_color;
use crate::voc::{self, VocAnnotation};
use crate::{AppWindow, BoxView, ClassItem, PointView};

/// Everything the callbacks read and mutate, behind one cell.
pub struct AppState {
    pub dataset: Dataset,
    pub session: ImageSession,
    pub classes: ClassConfig,
    /// Written into each sidecar's source block.
    pub database: String,
    /// Label assigned to newly completed boxes.
    pub default_label: String,
    pub labels_visible: bool,
}

pub type SharedState = Rc<RefCell<AppState>>;

/// Loads the dataset entry at an index and refreshes the whole view.
pub type ImageLoader = Rc<dyn Fn(usize)>;

/// Sets up all callbacks on the UI.
pub fn setup_callbacks(
    ui: &AppWindow,
    state: SharedState,
    loader: ImageLoader,
    boxes: Rc<slint::VecModel<BoxView>>,
    points: Rc<slint::VecModel<PointView>>,
    class_items: Rc<slint::VecModel<ClassItem>>,
) {
    pointer::setup_pointer_callbacks(ui, state.clone(), boxes.clone(), points.clone());
    keyboard::setup_keyboard_callbacks(ui, state, loader, boxes, points, class_items);
}

/// Flush the session to the current image's sidecar: delete the file when no
/// boxes remain, rewrite it otherwise. Does nothing while a second corner is
/// pending, so a half-drawn box never reaches disk.
pub fn persist(state: &mut AppState) -> Result<()> {
    if state.session.pending_corner() {
        return Ok(());
    }
    state.session.normalize();

    let image_path = state.dataset.current_abs();
    if state.session.points.is_empty() {
        return voc::remove_sidecar(&image_path);
    }

    let filename = image_path
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or_default()
        .to_string();
    let mut annotation = VocAnnotation::new(
        filename,
        state.session.image_width as i32,
        state.session.image_height as i32,
    );
    annotation.folder = image_path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|f| f.to_str())
        .unwrap_or_default()
        .to_string();
    annotation.path = image_path.display().to_string();
    annotation.database = state.database.clone();
    for (pair, label) in state.session.labels.iter().enumerate() {
        let a = state.session.points[2 * pair];
        let b = state.session.points[2 * pair + 1];
        annotation.add_object(label.clone(), a.x as i32, a.y as i32, b.x as i32, b.y as i32);
    }
    annotation.save(&voc::sidecar_path(&image_path))
}

/// `persist`, with failures routed to the status line instead of unwinding.
pub fn persist_and_report(ui: &AppWindow, state: &mut AppState) {
    if let Err(e) = persist(state) {
        log::error!("Failed to save annotations: {}", e);
        ui.set_status_text(format!("Save failed: {}", e).into());
    }
}

/// Rebuild the box and point overlay models plus the preview rectangle from
/// the session. Called after every pointer or keyboard edit.
pub fn refresh_overlays(
    ui: &AppWindow,
    state: &AppState,
    boxes: &slint::VecModel<BoxView>,
    points: &slint::VecModel<PointView>,
) {
    let session = &state.session;

    let mut box_rows = Vec::with_capacity(session.box_count());
    for pair in 0..session.box_count() {
        let b = Bounds::from_corners(session.points[2 * pair], session.points[2 * pair + 1]);
        let label = &session.labels[pair];
        // Hover tint goes underneath the class-colored box.
        if session.hovered_box == Some(pair) {
            box_rows.push(box_row(
                &b,
                slint::Color::from_argb_u8(255, 255, 255, 255),
                slint::Color::from_argb_u8(50, 255, 255, 255),
                "",
            ));
        }
        let (border, fill) = box_colors(state, pair, label);
        box_rows.push(box_row(&b, border, fill, label));
    }
    boxes.set_vec(box_rows);

    let mut point_rows: Vec<PointView> = session
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| PointView {
            x: p.x,
            y: p.y,
            hovered: session.hovered_point == Some(i),
        })
        .collect();
    // Virtual opposite corners look like stored points; hovering one promotes
    // it to stored, so these rows are never the hovered one.
    for pair in 0..session.box_count() {
        for p in opposite_corners(session.points[2 * pair], session.points[2 * pair + 1]) {
            point_rows.push(PointView {
                x: p.x,
                y: p.y,
                hovered: false,
            });
        }
    }
    points.set_vec(point_rows);

    if let Some((a, b)) = session.preview_box() {
        ui.set_show_preview(true);
        ui.set_preview_x(a.x.min(b.x));
        ui.set_preview_y(a.y.min(b.y));
        ui.set_preview_width((a.x - b.x).abs());
        ui.set_preview_height((a.y - b.y).abs());
    } else {
        ui.set_show_preview(false);
    }

    ui.set_points_text(format!("Points: {}", session.points.len()).into());
}

fn box_row(b: &Bounds, border: slint::Color, fill: slint::Color, label: &str) -> BoxView {
    BoxView {
        x: b.xmin,
        y: b.ymin,
        width: b.width(),
        height: b.height(),
        border_color: border,
        fill_color: fill,
        label: label.into(),
    }
}

/// Border and fill for one box: the selection highlight when it is shown,
/// otherwise the class color; unknown labels fall back to the stock green.
fn box_colors(state: &AppState, pair: usize, label: &str) -> (slint::Color, slint::Color) {
    let session = &state.session;
    if session.highlighted && session.selected == pair {
        return (
            slint::Color::from_argb_u8(255, 255, 255, 255),
            slint::Color::from_argb_u8(128, 255, 255, 255),
        );
    }
    match state.classes.color_for_label(label).and_then(parse_color) {
        Some(c) => (
            slint::Color::from_argb_u8(255, c.red(), c.green(), c.blue()),
            slint::Color::from_argb_u8(120, c.red(), c.green(), c.blue()),
        ),
        None => (
            slint::Color::from_argb_u8(250, 0, 255, 0),
            slint::Color::from_argb_u8(120, 100, 255, 100),
        ),
    }
}

/// Refresh the header: file name, position, species. Runs on every image load.
pub fn refresh_header(ui: &AppWindow, state: &mut AppState) {
    let filename = state
        .dataset
        .current()
        .display()
        .to_string();
    ui.set_current_image_name(filename.into());
    ui.set_position_text(
        format!("{} / {}", state.dataset.position() + 1, state.dataset.len()).into(),
    );
    let species = match state.dataset.current_species() {
        Some(s) => format!("Species: {}", s),
        None => String::new(),
    };
    ui.set_species_text(species.into());
    refresh_label_text(ui, state);
}

/// Refresh the "current label" readout.
pub fn refresh_label_text(ui: &AppWindow, state: &AppState) {
    ui.set_current_label_text(format!("Label: {}", state.default_label).into());
}

/// Rebuild the class legend; the entry matching the default label is marked
/// active.
pub fn refresh_class_legend(state: &AppState, class_items: &slint::VecModel<ClassItem>) {
    let rows: Vec<ClassItem> = state
        .classes
        .classes
        .iter()
        .enumerate()
        .map(|(i, c)| ClassItem {
            name: c.name.clone().into(),
            color: c
                .color
                .as_deref()
                .and_then(parse_color)
                .unwrap_or(slint::Color::from_rgb_u8(0, 255, 0)),
            key: match i {
                0..=8 => (i + 1).to_string().into(),
                9 => "0".into(),
                _ => "".into(),
            },
            active: c.name == state.default_label,
        })
        .collect();
    class_items.set_vec(rows);
}
