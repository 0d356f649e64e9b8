//! Pascal VOC XML sidecar read/write.
//!
//! Every image gets at most one sidecar, `<stem>_annotations.xml`, next to the
//! image file; `<stem>.xml` is reserved for dataset metadata. An image with no
//! boxes has no sidecar at all.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{AppError, Result};
use crate::session::Point;

#[derive(Debug, Clone, PartialEq)]
pub struct VocObject {
    pub name: String,
    pub bbox: (i32, i32, i32, i32), // xmin, ymin, xmax, ymax
    pub difficult: i32,
    pub truncated: i32,
    pub pose: String,
}

impl VocObject {
    fn empty() -> Self {
        VocObject {
            name: String::new(),
            bbox: (-1, -1, -1, -1),
            difficult: 0,
            truncated: 0,
            pose: "Unspecified".to_string(),
        }
    }

    fn has_missing_coords(&self) -> bool {
        let (xmin, ymin, xmax, ymax) = self.bbox;
        xmin == -1 || ymin == -1 || xmax == -1 || ymax == -1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VocAnnotation {
    pub folder: String,
    pub filename: String,
    pub path: String,
    pub database: String,
    pub width: i32,
    pub height: i32,
    pub depth: i32,
    pub objects: Vec<VocObject>,
}

impl VocAnnotation {
    pub fn new(filename: String, width: i32, height: i32) -> Self {
        VocAnnotation {
            folder: String::new(),
            filename,
            path: String::new(),
            database: "Unknown".to_string(),
            width,
            height,
            depth: 3, // RGB
            objects: Vec::new(),
        }
    }

    pub fn add_object(&mut self, name: String, xmin: i32, ymin: i32, xmax: i32, ymax: i32) {
        self.objects.push(VocObject {
            name,
            bbox: (xmin, ymin, xmax, ymax),
            difficult: 0,
            truncated: 0,
            pose: "Unspecified".to_string(),
        });
    }

    /// Flatten the objects back into the session's corner-pair form.
    pub fn to_points_labels(&self) -> (Vec<Point>, Vec<String>) {
        let mut points = Vec::with_capacity(self.objects.len() * 2);
        let mut labels = Vec::with_capacity(self.objects.len());
        for obj in &self.objects {
            let (xmin, ymin, xmax, ymax) = obj.bbox;
            points.push(Point::new(xmin as f32, ymin as f32));
            points.push(Point::new(xmax as f32, ymax as f32));
            labels.push(obj.name.clone());
        }
        (points, labels)
    }

    pub fn to_xml(&self) -> String {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .ok();
        writer
            .write_event(Event::Start(BytesStart::new("annotation")))
            .ok();

        write_element(&mut writer, "folder", &self.folder);
        write_element(&mut writer, "filename", &self.filename);
        write_element(&mut writer, "path", &self.path);

        writer
            .write_event(Event::Start(BytesStart::new("source")))
            .ok();
        write_element(&mut writer, "database", &self.database);
        writer.write_event(Event::End(BytesEnd::new("source"))).ok();

        writer.write_event(Event::Start(BytesStart::new("size"))).ok();
        write_element(&mut writer, "width", &self.width.to_string());
        write_element(&mut writer, "height", &self.height.to_string());
        write_element(&mut writer, "depth", &self.depth.to_string());
        writer.write_event(Event::End(BytesEnd::new("size"))).ok();

        write_element(&mut writer, "segmented", "0");

        for obj in &self.objects {
            writer
                .write_event(Event::Start(BytesStart::new("object")))
                .ok();
            write_element(&mut writer, "name", &obj.name);
            write_element(&mut writer, "pose", &obj.pose);
            write_element(&mut writer, "truncated", &obj.truncated.to_string());
            write_element(&mut writer, "difficult", &obj.difficult.to_string());
            writer
                .write_event(Event::Start(BytesStart::new("bndbox")))
                .ok();
            write_element(&mut writer, "xmin", &obj.bbox.0.to_string());
            write_element(&mut writer, "ymin", &obj.bbox.1.to_string());
            write_element(&mut writer, "xmax", &obj.bbox.2.to_string());
            write_element(&mut writer, "ymax", &obj.bbox.3.to_string());
            writer.write_event(Event::End(BytesEnd::new("bndbox"))).ok();
            writer.write_event(Event::End(BytesEnd::new("object"))).ok();
        }

        writer
            .write_event(Event::End(BytesEnd::new("annotation")))
            .ok();

        let result = writer.into_inner().into_inner();
        String::from_utf8(result).unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_xml())?;
        Ok(())
    }

    /// Parse a sidecar file. Unknown elements are skipped; a bndbox with
    /// missing coordinates is kept with `-1` in the gaps and logged, so one
    /// corrupt object does not lose the rest of the file.
    pub fn parse(content: &str, origin: &Path) -> Result<VocAnnotation> {
        let mut reader = Reader::from_str(content);
        let mut ann = VocAnnotation::new(String::new(), 0, 0);
        let mut current: Option<VocObject> = None;
        let mut saw_root = false;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let tag = e.name();
                    match tag.as_ref() {
                        b"annotation" => saw_root = true,
                        b"folder" => ann.folder = reader.read_text(tag)?.into_owned(),
                        b"filename" => ann.filename = reader.read_text(tag)?.into_owned(),
                        b"path" => ann.path = reader.read_text(tag)?.into_owned(),
                        b"database" => ann.database = reader.read_text(tag)?.into_owned(),
                        b"width" => ann.width = parse_int(&reader.read_text(tag)?, 0),
                        b"height" => ann.height = parse_int(&reader.read_text(tag)?, 0),
                        b"depth" => ann.depth = parse_int(&reader.read_text(tag)?, 3),
                        b"object" => current = Some(VocObject::empty()),
                        b"name" => {
                            if let Some(obj) = current.as_mut() {
                                obj.name = reader.read_text(tag)?.into_owned();
                            }
                        }
                        b"pose" => {
                            if let Some(obj) = current.as_mut() {
                                obj.pose = reader.read_text(tag)?.into_owned();
                            }
                        }
                        b"truncated" => {
                            if let Some(obj) = current.as_mut() {
                                obj.truncated = parse_int(&reader.read_text(tag)?, 0);
                            }
                        }
                        b"difficult" => {
                            if let Some(obj) = current.as_mut() {
                                obj.difficult = parse_int(&reader.read_text(tag)?, 0);
                            }
                        }
                        b"xmin" | b"ymin" | b"xmax" | b"ymax" => {
                            let value = parse_int(&reader.read_text(tag)?, -1);
                            if let Some(obj) = current.as_mut() {
                                match tag.as_ref() {
                                    b"xmin" => obj.bbox.0 = value,
                                    b"ymin" => obj.bbox.1 = value,
                                    b"xmax" => obj.bbox.2 = value,
                                    _ => obj.bbox.3 = value,
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Event::End(e) if e.name().as_ref() == b"object" => {
                    if let Some(obj) = current.take() {
                        if obj.has_missing_coords() {
                            log::warn!(
                                "{}: bounding box with missing coordinates, keeping -1",
                                origin.display()
                            );
                        }
                        ann.objects.push(obj);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        if !saw_root {
            return Err(AppError::AnnotationFile(format!(
                "{}: no <annotation> element",
                origin.display()
            )));
        }
        Ok(ann)
    }
}

fn write_element(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str, value: &str) {
    writer.write_event(Event::Start(BytesStart::new(name))).ok();
    writer.write_event(Event::Text(BytesText::new(value))).ok();
    writer.write_event(Event::End(BytesEnd::new(name))).ok();
}

fn parse_int(text: &str, missing: i32) -> i32 {
    text.trim().parse().unwrap_or(missing)
}

/// `<stem>_annotations.xml` next to the image.
pub fn sidecar_path(image_path: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    image_path.with_file_name(format!("{stem}_annotations.xml"))
}

/// Read the sidecar for an image. A missing file reads as no annotations.
pub fn load_sidecar(image_path: &Path) -> Result<Option<VocAnnotation>> {
    let sidecar = sidecar_path(image_path);
    if !sidecar.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&sidecar)?;
    Ok(Some(VocAnnotation::parse(&content, &sidecar)?))
}

/// Delete an image's sidecar if present. Used when its annotations go empty.
pub fn remove_sidecar(image_path: &Path) -> Result<()> {
    let sidecar = sidecar_path(image_path);
    if sidecar.exists() {
        fs::remove_file(&sidecar)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sidecar_next_to_image() {
        let p = sidecar_path(Path::new("/data/plants/rose.jpg"));
        assert_eq!(p, Path::new("/data/plants/rose_annotations.xml"));
    }

    #[test]
    fn sidecar_for_dotted_stem() {
        let p = sidecar_path(Path::new("/data/shot.v2.png"));
        assert_eq!(p, Path::new("/data/shot.v2_annotations.xml"));
    }

    #[test]
    fn xml_has_voc_shape() {
        let mut ann = VocAnnotation::new("rose.jpg".to_string(), 640, 480);
        ann.folder = "plants".to_string();
        ann.database = "PlantCLEF".to_string();
        ann.add_object("flower".to_string(), 10, 20, 110, 220);
        let xml = ann.to_xml();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<database>PlantCLEF</database>"));
        assert!(xml.contains("<width>640</width>"));
        assert!(xml.contains("<segmented>0</segmented>"));
        assert!(xml.contains("<pose>Unspecified</pose>"));
        assert!(xml.contains("<xmin>10</xmin>"));
        assert!(xml.contains("<ymax>220</ymax>"));
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("rose.jpg");

        let mut ann = VocAnnotation::new("rose.jpg".to_string(), 640, 480);
        ann.database = "PlantCLEF".to_string();
        ann.add_object("flower".to_string(), 10, 20, 110, 220);
        ann.add_object("leaf".to_string(), 0, 0, 640, 480);
        ann.save(&sidecar_path(&image)).unwrap();

        let loaded = load_sidecar(&image).unwrap().unwrap();
        assert_eq!(loaded.database, "PlantCLEF");
        assert_eq!(loaded.width, 640);
        assert_eq!(loaded.height, 480);
        assert_eq!(loaded.objects, ann.objects);

        let (points, labels) = loaded.to_points_labels();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], Point::new(10.0, 20.0));
        assert_eq!(points[3], Point::new(640.0, 480.0));
        assert_eq!(labels, vec!["flower".to_string(), "leaf".to_string()]);
    }

    #[test]
    fn labels_with_markup_round_trip() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("a.png");

        let mut ann = VocAnnotation::new("a.png".to_string(), 100, 100);
        ann.add_object("black & white <cat>".to_string(), 1, 2, 3, 4);
        ann.save(&sidecar_path(&image)).unwrap();

        let loaded = load_sidecar(&image).unwrap().unwrap();
        assert_eq!(loaded.objects[0].name, "black & white <cat>");
    }

    #[test]
    fn missing_sidecar_reads_as_none() {
        let dir = tempdir().unwrap();
        assert!(load_sidecar(&dir.path().join("nothing.jpg")).unwrap().is_none());
    }

    #[test]
    fn partial_bndbox_is_kept_with_minus_one() {
        let xml = "<annotation><size><width>50</width><height>60</height></size>\
                   <object><name>torn</name><bndbox><xmin>5</xmin><ymax>9</ymax></bndbox>\
                   </object></annotation>";
        let ann = VocAnnotation::parse(xml, Path::new("torn.xml")).unwrap();
        assert_eq!(ann.objects.len(), 1);
        assert_eq!(ann.objects[0].bbox, (5, -1, -1, 9));
    }

    #[test]
    fn content_without_annotation_root_is_an_error() {
        assert!(VocAnnotation::parse("just some text", Path::new("x.xml")).is_err());
        assert!(VocAnnotation::parse("<sizes><width>3</width></sizes>", Path::new("x.xml")).is_err());
    }

    #[test]
    fn unknown_elements_are_skipped() {
        let xml = "<annotation><flavor>extra</flavor><object><name>x</name>\
                   <bndbox><xmin>1</xmin><ymin>2</ymin><xmax>3</xmax><ymax>4</ymax></bndbox>\
                   <confidence>0.9</confidence></object></annotation>";
        let ann = VocAnnotation::parse(xml, Path::new("x.xml")).unwrap();
        assert_eq!(ann.objects[0].bbox, (1, 2, 3, 4));
    }

    #[test]
    fn remove_sidecar_deletes_and_tolerates_absence() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("rose.jpg");
        let mut ann = VocAnnotation::new("rose.jpg".to_string(), 10, 10);
        ann.add_object("x".to_string(), 1, 1, 2, 2);
        ann.save(&sidecar_path(&image)).unwrap();
        assert!(sidecar_path(&image).exists());

        remove_sidecar(&image).unwrap();
        assert!(!sidecar_path(&image).exists());
        // a second removal is a no-op
        remove_sidecar(&image).unwrap();
    }
}
