//! Image library scanning, wrap-around navigation, and species metadata.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{AppError, Result};
use crate::voc;

/// Cached relative-path to species mapping, kept in the library root.
pub const SPECIES_CACHE_FILE: &str = ".species_cache.json";

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// The image library: every image under the root, plus a cursor into it.
///
/// The species cache is read from disk on the first lookup, not at open time.
#[derive(Debug)]
pub struct Dataset {
    root: PathBuf,
    entries: Vec<PathBuf>,
    index: usize,
    species: BTreeMap<String, String>,
    species_loaded: bool,
    species_dirty: bool,
}

impl Dataset {
    /// Scan `root` recursively for images. With `sort_by_species` the entries
    /// are ordered by `(species, path)` instead of by path alone, resolving
    /// every species up front through the cache.
    pub fn open(root: &Path, sort_by_species: bool) -> Result<Dataset> {
        let mut entries = Vec::new();
        collect_images(root, root, &mut entries)?;
        if entries.is_empty() {
            return Err(AppError::Dataset(format!(
                "no images found under {}",
                root.display()
            )));
        }
        entries.sort();

        let mut dataset = Dataset {
            root: root.to_path_buf(),
            entries,
            index: 0,
            species: BTreeMap::new(),
            species_loaded: false,
            species_dirty: false,
        };
        if sort_by_species {
            dataset.sort_entries_by_species();
            dataset.flush_species_cache()?;
        }
        Ok(dataset)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn position(&self) -> usize {
        self.index
    }

    /// Current image, relative to the root.
    pub fn current(&self) -> &Path {
        &self.entries[self.index]
    }

    pub fn current_abs(&self) -> PathBuf {
        self.root.join(self.current())
    }

    /// Step the cursor, wrapping at both ends.
    pub fn step(&mut self, delta: isize) {
        let len = self.entries.len() as isize;
        let next = (self.index as isize + delta).rem_euclid(len);
        self.index = next as usize;
    }

    /// Jump straight to an entry; out-of-range indexes are ignored.
    pub fn jump_to(&mut self, index: usize) {
        if index < self.entries.len() {
            self.index = index;
        }
    }

    /// Step until an image with stored boxes is found, or the scan wraps back
    /// to entry 0.
    pub fn seek_annotated(&mut self, forward: bool) {
        self.seek(forward, true);
    }

    /// Step until an image without stored boxes is found, or the scan wraps
    /// back to entry 0.
    pub fn seek_unannotated(&mut self, forward: bool) {
        self.seek(forward, false);
    }

    fn seek(&mut self, forward: bool, want_annotated: bool) {
        let delta = if forward { 1 } else { -1 };
        loop {
            self.step(delta);
            if self.current_is_annotated() == want_annotated || self.index == 0 {
                break;
            }
        }
    }

    /// Whether the current image's sidecar holds at least one box.
    pub fn current_is_annotated(&self) -> bool {
        match voc::load_sidecar(&self.current_abs()) {
            Ok(Some(ann)) => !ann.objects.is_empty(),
            Ok(None) => false,
            Err(e) => {
                log::warn!("{}: unreadable sidecar: {e}", self.current().display());
                false
            }
        }
    }

    /// Species of the current image, resolved through the cache and the
    /// per-image metadata XML.
    pub fn current_species(&mut self) -> Option<String> {
        self.species_for(self.index)
    }

    fn species_for(&mut self, index: usize) -> Option<String> {
        self.ensure_species_cache();
        let key = self.entries[index].to_string_lossy().into_owned();
        if let Some(found) = self.species.get(&key) {
            return Some(found.clone());
        }
        let metadata = metadata_path(&self.root.join(&self.entries[index]));
        let species = read_species_metadata(&metadata)?;
        self.species.insert(key, species.clone());
        self.species_dirty = true;
        Some(species)
    }

    fn ensure_species_cache(&mut self) {
        if !self.species_loaded {
            self.species = load_species_cache(&self.root);
            self.species_loaded = true;
        }
    }

    fn sort_entries_by_species(&mut self) {
        for i in 0..self.entries.len() {
            self.species_for(i);
        }
        let species = &self.species;
        self.entries.sort_by(|a, b| {
            let ka = species.get(a.to_string_lossy().as_ref());
            let kb = species.get(b.to_string_lossy().as_ref());
            // Images without a species key sort after keyed ones.
            match (ka, kb) {
                (Some(sa), Some(sb)) => sa.cmp(sb).then_with(|| a.cmp(b)),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.cmp(b),
            }
        });
    }

    /// Write the species cache back if anything new was resolved.
    pub fn flush_species_cache(&mut self) -> Result<()> {
        if !self.species_dirty {
            return Ok(());
        }
        let path = self.root.join(SPECIES_CACHE_FILE);
        fs::write(&path, serde_json::to_string_pretty(&self.species)?)?;
        self.species_dirty = false;
        Ok(())
    }
}

fn collect_images(dir: &Path, root: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_images(&path, root, out)?;
        } else if has_image_extension(&path) {
            if let Ok(rel) = path.strip_prefix(root) {
                out.push(rel.to_path_buf());
            }
        }
    }
    Ok(())
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// `<stem>.xml` next to the image carries the dataset metadata.
pub fn metadata_path(image_path: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    image_path.with_file_name(format!("{stem}.xml"))
}

/// Pull the `<Content>` element out of a metadata XML, if there is one.
fn read_species_metadata(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let mut reader = Reader::from_str(&content);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"Content" => {
                let tag = e.name();
                return reader.read_text(tag).ok().map(|t| t.trim().to_string());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

fn load_species_cache(root: &Path) -> BTreeMap<String, String> {
    let path = root.join(SPECIES_CACHE_FILE);
    if !path.exists() {
        return BTreeMap::new();
    }
    match fs::read_to_string(&path).map_err(AppError::from).and_then(|c| {
        serde_json::from_str::<BTreeMap<String, String>>(&c).map_err(AppError::from)
    }) {
        Ok(map) => map,
        Err(e) => {
            log::warn!("ignoring unreadable species cache: {e}");
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voc::{VocAnnotation, sidecar_path};
    use tempfile::{TempDir, tempdir};

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    fn annotate(root: &Path, rel: &str) {
        let image = root.join(rel);
        let mut ann = VocAnnotation::new(rel.to_string(), 100, 100);
        ann.add_object("thing".to_string(), 1, 1, 9, 9);
        ann.save(&sidecar_path(&image)).unwrap();
    }

    fn library() -> TempDir {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.jpg");
        touch(dir.path(), "b.png");
        touch(dir.path(), "sub/c.jpeg");
        touch(dir.path(), "sub/d.JPG");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "a.xml");
        dir
    }

    #[test]
    fn scan_filters_sorts_and_recurses() {
        let dir = library();
        let ds = Dataset::open(dir.path(), false).unwrap();
        let rel: Vec<_> = (0..ds.len()).map(|i| ds.entries[i].clone()).collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("a.jpg"),
                PathBuf::from("b.png"),
                PathBuf::from("sub/c.jpeg"),
                PathBuf::from("sub/d.JPG"),
            ]
        );
    }

    #[test]
    fn empty_library_is_an_error() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "readme.txt");
        assert!(Dataset::open(dir.path(), false).is_err());
    }

    #[test]
    fn stepping_wraps_both_ways() {
        let dir = library();
        let mut ds = Dataset::open(dir.path(), false).unwrap();
        assert_eq!(ds.position(), 0);
        ds.step(-1);
        assert_eq!(ds.position(), 3);
        ds.step(1);
        assert_eq!(ds.position(), 0);
        ds.step(1);
        assert_eq!(ds.position(), 1);
    }

    #[test]
    fn seek_finds_annotated_and_unannotated() {
        let dir = library();
        annotate(dir.path(), "sub/c.jpeg");

        let mut ds = Dataset::open(dir.path(), false).unwrap();
        ds.seek_annotated(true);
        assert_eq!(ds.current(), Path::new("sub/c.jpeg"));
        assert!(ds.current_is_annotated());

        ds.seek_unannotated(true);
        assert_eq!(ds.current(), Path::new("sub/d.JPG"));

        ds.seek_annotated(false);
        assert_eq!(ds.current(), Path::new("sub/c.jpeg"));
    }

    #[test]
    fn seek_with_no_match_stops_at_first_entry() {
        let dir = library();
        let mut ds = Dataset::open(dir.path(), false).unwrap();
        ds.step(1);
        ds.seek_annotated(true);
        assert_eq!(ds.position(), 0);
    }

    #[test]
    fn empty_sidecar_counts_as_unannotated() {
        let dir = library();
        let image = dir.path().join("a.jpg");
        VocAnnotation::new("a.jpg".to_string(), 100, 100)
            .save(&sidecar_path(&image))
            .unwrap();
        let ds = Dataset::open(dir.path(), false).unwrap();
        assert!(!ds.current_is_annotated());
    }

    #[test]
    fn species_comes_from_metadata_and_sticks_in_cache() {
        let dir = library();
        fs::write(
            dir.path().join("a.xml"),
            "<Metadata><Content>Rosa canina</Content></Metadata>",
        )
        .unwrap();

        let mut ds = Dataset::open(dir.path(), false).unwrap();
        assert_eq!(ds.current_species().as_deref(), Some("Rosa canina"));
        ds.flush_species_cache().unwrap();
        assert!(dir.path().join(SPECIES_CACHE_FILE).exists());

        // The cache answers even after the metadata file is gone.
        fs::remove_file(dir.path().join("a.xml")).unwrap();
        let mut again = Dataset::open(dir.path(), false).unwrap();
        assert_eq!(again.current_species().as_deref(), Some("Rosa canina"));
    }

    #[test]
    fn missing_metadata_means_no_species() {
        let dir = library();
        let mut ds = Dataset::open(dir.path(), false).unwrap();
        ds.step(1);
        assert_eq!(ds.current_species(), None);
    }

    #[test]
    fn species_sort_groups_keyed_entries_first() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "x.jpg");
        touch(dir.path(), "y.jpg");
        touch(dir.path(), "z.jpg");
        fs::write(dir.path().join("x.xml"), "<a><Content>Quercus</Content></a>").unwrap();
        fs::write(dir.path().join("z.xml"), "<a><Content>Acer</Content></a>").unwrap();

        let ds = Dataset::open(dir.path(), true).unwrap();
        let rel: Vec<_> = ds.entries.clone();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("z.jpg"), // Acer
                PathBuf::from("x.jpg"), // Quercus
                PathBuf::from("y.jpg"), // no species
            ]
        );
    }
}
