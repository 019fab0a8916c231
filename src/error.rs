//! Error types returned by table operations.

use core::error::Error as StdError;
use core::fmt::Display;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;

/// A specialized [`Result`] type for table operations.
///
/// [`Result`]: core::result::Result
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// The reasons a table operation can fail.
///
/// Every variant is an ordinary, expected outcome; none of them leave the
/// table in an inconsistent state.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
  /// The bucket array could not be allocated.
  AllocationFailure,
  /// The element is already linked into a table (or a concurrent `hash` of
  /// the same element is in progress).
  AlreadyHashed,
  /// An element with an equal key is already linked into the table.
  DuplicateKey,
  /// The key passed to `hash` is not the key stored in the element.
  KeyMismatch,
  /// No element matches the key.
  NotFound,
  /// The element is not linked into this table.
  NotHashed,
}

impl Display for Error {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.write_str(match self {
      Self::AllocationFailure => "bucket array allocation failed",
      Self::AlreadyHashed => "element is already hashed",
      Self::DuplicateKey => "duplicate key",
      Self::KeyMismatch => "key does not match the element",
      Self::NotFound => "key not found",
      Self::NotHashed => "element is not hashed in this table",
    })
  }
}

impl StdError for Error {}

#[cfg(test)]
mod tests {
  use crate::error::Error;

  #[test]
  fn display_is_lowercase_without_trailing_period() {
    let errors: [Error; 6] = [
      Error::AllocationFailure,
      Error::AlreadyHashed,
      Error::DuplicateKey,
      Error::KeyMismatch,
      Error::NotFound,
      Error::NotHashed,
    ];

    for error in errors {
      let message: String = error.to_string();

      assert!(!message.ends_with('.'), "{message:?}");
      assert_eq!(message, message.to_lowercase());
    }
  }

  #[test]
  fn boxes_as_std_error() {
    let error: Box<dyn std::error::Error> = Box::new(Error::NotFound);

    assert_eq!(error.to_string(), "key not found");
  }
}
