use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Box colors assigned to the first few classes when a class file does not
/// pick its own. Beyond these, boxes fall back to the stock green.
pub const DEFAULT_CLASS_COLORS: [&str; 5] =
    ["#00ff00", "#ff0000", "#f915da", "#ff7f00", "#7f7f7f"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassConfig {
    pub classes: Vec<ClassDefinition>,
}

impl Default for ClassConfig {
    fn default() -> Self {
        ClassConfig {
            classes: (1..=5)
                .map(|i| ClassDefinition {
                    name: format!("Class {}", i),
                    color: Some(DEFAULT_CLASS_COLORS[i - 1].to_string()),
                })
                .collect(),
        }
    }
}

impl ClassConfig {
    /// Class bound to a digit key: '1'..'9' pick the first nine classes,
    /// '0' picks the tenth.
    pub fn class_for_digit(&self, digit: char) -> Option<&ClassDefinition> {
        let index = match digit {
            '1'..='9' => digit as usize - '1' as usize,
            '0' => 9,
            _ => return None,
        };
        self.classes.get(index)
    }

    /// Color string for a label, looked up by class name.
    pub fn color_for_label(&self, label: &str) -> Option<&str> {
        self.classes
            .iter()
            .find(|c| c.name == label)
            .and_then(|c| c.color.as_deref())
    }
}

/// Load class definitions, trying config locations in order:
/// 1. Explicitly configured path
/// 2. classes.yaml in the image library root
/// 3. ~/.config/snappy-annotator/classes.yaml
/// Falls back to the built-in palette when none parse.
pub fn load_classes(explicit_path: Option<&str>, library_root: &Path) -> ClassConfig {
    let mut candidates: Vec<String> = Vec::new();
    if let Some(path) = explicit_path {
        candidates.push(shellexpand::tilde(path).to_string());
    }
    candidates.push(library_root.join("classes.yaml").display().to_string());
    candidates.push(shellexpand::tilde("~/.config/snappy-annotator/classes.yaml").to_string());

    for candidate in &candidates {
        let path = Path::new(candidate);
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match parse_class_content(&content) {
                Ok(config) => {
                    log::info!("Loaded {} classes from {}", config.classes.len(), candidate);
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to parse class file {}: {}", candidate, e);
                }
            },
            Err(e) => {
                log::warn!("Failed to read class file {}: {}", candidate, e);
            }
        }
    }

    ClassConfig::default()
}

/// Parse class YAML, accepting three shapes: a bare list of names, a list of
/// name/color entries, or a full config with a `classes` key.
pub fn parse_class_content(content: &str) -> Result<ClassConfig> {
    if let Ok(names) = serde_yaml::from_str::<Vec<String>>(content) {
        let mut config = ClassConfig {
            classes: names
                .into_iter()
                .map(|name| ClassDefinition { name, color: None })
                .collect(),
        };
        fill_default_colors(&mut config);
        return Ok(config);
    }

    if let Ok(classes) = serde_yaml::from_str::<Vec<ClassDefinition>>(content) {
        let mut config = ClassConfig { classes };
        fill_default_colors(&mut config);
        return Ok(config);
    }

    let mut config = serde_yaml::from_str::<ClassConfig>(content)?;
    fill_default_colors(&mut config);
    Ok(config)
}

/// Classes without an explicit color take the positional default, so a plain
/// name list still renders with the stock palette.
fn fill_default_colors(config: &mut ClassConfig) {
    for (i, class) in config.classes.iter_mut().enumerate() {
        if class.color.is_none() && i < DEFAULT_CLASS_COLORS.len() {
            class.color = Some(DEFAULT_CLASS_COLORS[i].to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_palette_has_five_colored_classes() {
        let config = ClassConfig::default();
        assert_eq!(config.classes.len(), 5);
        assert_eq!(config.classes[0].name, "Class 1");
        assert_eq!(config.classes[0].color.as_deref(), Some("#00ff00"));
        assert_eq!(config.classes[4].color.as_deref(), Some("#7f7f7f"));
    }

    #[test]
    fn parses_bare_name_list() {
        let config = parse_class_content("- cat\n- dog\n- bird\n").unwrap();
        assert_eq!(config.classes.len(), 3);
        assert_eq!(config.classes[1].name, "dog");
        // Positional colors filled in.
        assert_eq!(config.classes[2].color.as_deref(), Some("#f915da"));
    }

    #[test]
    fn parses_name_color_entries() {
        let yaml = "- name: cat\n  color: \"#123456\"\n- name: dog\n";
        let config = parse_class_content(yaml).unwrap();
        assert_eq!(config.classes[0].color.as_deref(), Some("#123456"));
        // Missing color falls back to the second positional default.
        assert_eq!(config.classes[1].color.as_deref(), Some("#ff0000"));
    }

    #[test]
    fn parses_full_config_shape() {
        let yaml = "classes:\n  - name: oak\n    color: \"#332211\"\n";
        let config = parse_class_content(yaml).unwrap();
        assert_eq!(config.classes.len(), 1);
        assert_eq!(config.classes[0].name, "oak");
        assert_eq!(config.classes[0].color.as_deref(), Some("#332211"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_class_content("{{{ not yaml").is_err());
    }

    #[test]
    fn digit_keys_map_to_class_positions() {
        let mut config = ClassConfig::default();
        for i in 6..=10 {
            config.classes.push(ClassDefinition {
                name: format!("Class {}", i),
                color: None,
            });
        }
        assert_eq!(config.class_for_digit('1').unwrap().name, "Class 1");
        assert_eq!(config.class_for_digit('9').unwrap().name, "Class 9");
        assert_eq!(config.class_for_digit('0').unwrap().name, "Class 10");
        assert!(config.class_for_digit('x').is_none());
    }

    #[test]
    fn digit_beyond_class_count_is_none() {
        let config = ClassConfig::default();
        assert!(config.class_for_digit('8').is_none());
    }

    #[test]
    fn color_lookup_is_by_name() {
        let config = ClassConfig::default();
        assert_eq!(config.color_for_label("Class 2"), Some("#ff0000"));
        assert_eq!(config.color_for_label("unknown"), None);
    }

    #[test]
    fn missing_class_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_classes(None, dir.path());
        assert_eq!(config.classes.len(), 5);
    }

    #[test]
    fn explicit_class_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my_classes.yaml");
        std::fs::write(&path, "- maple\n- birch\n").unwrap();
        let config = load_classes(path.to_str(), dir.path());
        assert_eq!(config.classes.len(), 2);
        assert_eq!(config.classes[0].name, "maple");
    }

    #[test]
    fn library_root_classes_file_is_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("classes.yaml"), "- fir\n").unwrap();
        let config = load_classes(None, dir.path());
        assert_eq!(config.classes.len(), 1);
        assert_eq!(config.classes[0].name, "fir");
    }
}
