//! Error types shared by the client, decoder and document layers.

/// Failures of one round trip to the solve endpoint.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SolveError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("solve failed with HTTP {status}: {text}")]
    Status { status: u16, text: String },

    #[error("could not decode solve response: {0}")]
    Body(String),
}

/// Why an encoded mesh string could not be turned into a mesh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeshDecodeError {
    #[error("invalid base64: {0}")]
    Base64(String),

    #[error("buffer too short: needed {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },

    #[error("bad magic {0:?}")]
    BadMagic([u8; 4]),

    #[error("bounding box is not finite")]
    NonFiniteBounds,

    #[error("unsupported encoded mesh version {0}")]
    UnsupportedVersion(u8),

    #[error("triangle index {index} out of range for {vertices} vertices")]
    IndexOutOfRange { index: u32, vertices: u32 },

    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
}

/// Errors raised by [`crate::document::GeometryDocument`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum DocumentError {
    #[error("document was already released")]
    AlreadyReleased,

    #[error("not a geometry archive")]
    NotAnArchive,

    #[error("archive version {found} is newer than supported version {supported}")]
    FutureVersion { found: u32, supported: u32 },

    #[error("object {id} is invalid: {reason}")]
    InvalidObject { id: uuid::Uuid, reason: String },

    #[error("malformed archive body: {0}")]
    Body(String),
}

/// Errors while reading a viewer configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("definition name must not be empty")]
    EmptyDefinition,

    #[error("input `{name}`: {reason}")]
    InvalidInput { name: String, reason: String },
}
