//! The [`DcmliteError`] trait implemented by this library's error types.

/// Trait implemented by all error types in this library. It provides
/// conversion of errors into human-readable lines of text for display.
///
pub trait DcmliteError {
  /// Returns lines of text that describe the error in a human-readable
  /// format.
  ///
  fn to_lines(&self, task_description: &str) -> Vec<String>;

  /// Prints details of the error to stderr.
  ///
  fn print(&self, task_description: &str) {
    eprintln!();
    eprintln!("-----");

    for line in self.to_lines(task_description) {
      eprintln!("{line}");
    }

    eprintln!();
  }
}
