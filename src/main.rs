slint::include_modules!();

mod callbacks;
mod classes;
mod config;
mod dataset;
mod error;
mod session;
mod utils;
mod voc;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use callbacks::{AppState, ImageLoader, refresh_class_legend, refresh_header, refresh_overlays};
use dataset::Dataset;
use session::ImageSession;

fn main() -> Result<(), slint::PlatformError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = config::load_config();
    let cli_root = std::env::args().nth(1);
    let root = match config::resolve_library_root(cli_root.as_deref(), &config) {
        Some(root) => root,
        None => match pick_library_folder() {
            Some(root) => {
                // Remember the picked folder for the next start.
                config.dataset.root = Some(root.display().to_string());
                if let Err(e) = config::save_config(&config) {
                    log::warn!("Failed to save config: {}", e);
                }
                root
            }
            None => {
                log::error!("No image library chosen; exiting");
                return Ok(());
            }
        },
    };

    let dataset = match Dataset::open(&root, config.dataset.sort_by_species) {
        Ok(dataset) => dataset,
        Err(e) => {
            log::error!("Failed to open image library {}: {}", root.display(), e);
            return Ok(());
        }
    };
    log::info!(
        "Opened {} with {} images",
        dataset.root().display(),
        dataset.len()
    );

    let class_config = classes::load_classes(config.classes.config_file.as_deref(), &root);

    let ui = AppWindow::new()?;

    let boxes = Rc::new(slint::VecModel::from(Vec::<BoxView>::new()));
    ui.set_boxes(boxes.clone().into());
    let points = Rc::new(slint::VecModel::from(Vec::<PointView>::new()));
    ui.set_points(points.clone().into());
    let class_items = Rc::new(slint::VecModel::from(Vec::<ClassItem>::new()));
    ui.set_class_items(class_items.clone().into());

    let placeholder = utils::placeholder_image();
    ui.set_image_source(placeholder.clone());

    let state = Rc::new(RefCell::new(AppState {
        dataset,
        session: ImageSession::default(),
        classes: class_config,
        database: config.labeling.database.clone(),
        default_label: config.labeling.default_label.clone(),
        labels_visible: true,
    }));

    refresh_class_legend(&state.borrow(), &class_items);

    // Shared loader used by every navigation path: loads the image and its
    // sidecar at the given index and refreshes the whole view.
    let loader: ImageLoader = {
        let state = state.clone();
        let ui_weak = ui.as_weak();
        let boxes = boxes.clone();
        let points = points.clone();
        Rc::new(move |index: usize| {
            let Some(ui) = ui_weak.upgrade() else { return };
            let mut st = state.borrow_mut();
            st.dataset.jump_to(index);
            let image_path = st.dataset.current_abs();

            let (image, width, height, status) = match utils::load_image(&image_path) {
                Ok((image, w, h)) => (
                    image,
                    w as f32,
                    h as f32,
                    format!("Loaded {}", image_path.display()),
                ),
                Err(e) => {
                    log::warn!("{}", e);
                    let fallback = placeholder.clone();
                    let size = fallback.size();
                    (
                        fallback,
                        size.width as f32,
                        size.height as f32,
                        e.to_string(),
                    )
                }
            };

            let (stored_points, stored_labels) = match voc::load_sidecar(&image_path) {
                Ok(Some(annotation)) => annotation.to_points_labels(),
                Ok(None) => (Vec::new(), Vec::new()),
                Err(e) => {
                    log::warn!("Unreadable sidecar for {}: {}", image_path.display(), e);
                    (Vec::new(), Vec::new())
                }
            };
            st.session.load(stored_points, stored_labels, width, height);

            ui.set_image_source(image);
            ui.set_image_width(width);
            ui.set_image_height(height);
            refresh_header(&ui, &mut st);
            refresh_overlays(&ui, &st, &boxes, &points);
            ui.set_status_text(status.into());

            if let Err(e) = st.dataset.flush_species_cache() {
                log::warn!("Failed to write species cache: {}", e);
            }
        })
    };

    callbacks::setup_callbacks(
        &ui,
        state.clone(),
        loader.clone(),
        boxes.clone(),
        points.clone(),
        class_items.clone(),
    );

    let start = state.borrow().dataset.position();
    loader(start);

    ui.run()
}

/// Ask for the image library when neither the command line nor the config
/// names one.
fn pick_library_folder() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Choose image library")
        .pick_folder()
}
