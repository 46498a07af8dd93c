/// Errors produced by the attribute codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
  /// The value has no attribute representation.
  #[error("type mismatch: {message}")]
  TypeMismatch { message: String },

  /// A tagged attribute fragment could not be parsed.
  #[error("malformed attribute fragment: {message}")]
  MalformedFragment { message: String },
}
