use thiserror::Error;

/// Main error type for the annotator
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML config file error: {0}")]
    TomlConfig(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Class file error: {0}")]
    ClassFile(#[from] serde_yaml::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Species cache error: {0}")]
    SpeciesCache(#[from] serde_json::Error),

    #[error("Annotation file error: {0}")]
    AnnotationFile(String),

    #[error("Image loading failed: {0}")]
    ImageLoad(String),

    #[error("Dataset error: {0}")]
    Dataset(String),
}

/// Result type with default AppError
pub type Result<T, E = AppError> = std::result::Result<T, E>;
