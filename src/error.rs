use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Cannot parse pointer {0}: {1}")]
    PointerParse(String, url::ParseError),

    #[error("Non-empty fragments must begin with a '/' character")]
    InvalidFragment,

    #[error("Fragment index {0} out of range")]
    FragmentIndex(usize),

    #[error("Cannot deserialize yaml document: {0}")]
    DeserializeYamlError(serde_yaml::Error),

    #[error("Cannot deserialize json document: {0}")]
    DeserializeJsonError(serde_json::Error),

    #[error("Cannot serialize yaml document: {0}")]
    SerializeYamlError(serde_yaml::Error),

    #[error("De/serialization error: {0}")]
    SerdeJsonError(serde_json::Error),

    #[error("Document root has to be an object: {0}")]
    DocumentNotObject(String),

    #[error("Failed to recognize extension {0} for unmarshal")]
    UnknownExtension(String),

    #[error("Read file error {path}: {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    #[error("Cannot read directory {path}: {source}")]
    ReadDir {
        path: String,
        source: std::io::Error,
    },

    #[error("Container operation on wrong node kind at {path}: expected {expected}")]
    TypeMismatch { path: String, expected: String },

    #[error("Merge collision at {at}: {destination} collided with {conflicting}")]
    MergeCollision {
        destination: String,
        conflicting: String,
        at: String,
    },

    #[error("Cannot parse tag {0}: {1}")]
    TagParse(String, String),

    #[error("Invalid openapi command: {0}")]
    InvalidCommand(String),

    #[error("Schema of pointer {0} already registered")]
    DuplicateExport(String),

    #[error("$ref at {at} has to be a string")]
    RefNotString { at: String },

    #[error("Type {0} is self referencing identical type")]
    InvalidSelfReference(String),

    #[error("Type {0} is not supported as an element for openapi")]
    UnsupportedType(String),

    #[error("Invalid schema type {0}")]
    InvalidSchemaType(String),

    #[error("Unknown scheme {0} to resolve")]
    UnknownScheme(String),

    #[error("Failed to resolve {0}")]
    NotFound(String),

    #[error("Invalid route pattern {0}: {1}")]
    InvalidRoutePattern(String, regex::Error),

    #[error("Unknown format {0}")]
    UnknownFormat(String),

    #[error("Openapi document format is invalid: {0}")]
    InvalidDocument(serde_json::Error),

    #[error("Scan cancelled")]
    Cancelled,

    #[error("Failed to scan: \n{0}")]
    ScanFailed(String),

    #[error("Cannot determine working directory: {0}")]
    WorkingDir(std::io::Error),
}
