/// Errors returned by the netstart transport layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("unknown transport kind: {0}")]
    UnknownKind(String),
}
