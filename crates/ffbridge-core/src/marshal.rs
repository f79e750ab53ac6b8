//! Command string to argument vector conversion.

use crate::error::{MarshalError, Result};
use libc::{c_char, c_int};
use std::ffi::CString;
use std::fmt;

/// Ordered arguments for one invocation, program name first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentVector {
    args: Vec<String>,
}

impl ArgumentVector {
    /// Number of real arguments, program name included.
    pub fn argc(&self) -> usize {
        self.args.len()
    }

    /// All arguments, program name included.
    pub fn as_slice(&self) -> &[String] {
        &self.args
    }

    /// The first token, conventionally the program name.
    pub fn program(&self) -> &str {
        // marshal() never builds an empty vector
        &self.args[0]
    }

    /// Arguments after the program name.
    pub fn options(&self) -> &[String] {
        &self.args[1..]
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.args.iter().map(String::as_str)
    }

    /// Build an owned C `argv` for a `main`-style entry point.
    ///
    /// # Errors
    ///
    /// Returns [`MarshalError::InteriorNul`] if a token contains a NUL byte.
    pub fn to_c_argv(&self) -> Result<CArgv> {
        let mut owned = Vec::with_capacity(self.args.len());
        for (index, arg) in self.args.iter().enumerate() {
            match CString::new(arg.as_str()) {
                Ok(s) => owned.push(s.into_raw()),
                Err(_) => {
                    // Reclaim what was already handed out before bailing.
                    for ptr in owned {
                        // SAFETY: every pointer came from CString::into_raw above.
                        drop(unsafe { CString::from_raw(ptr) });
                    }
                    return Err(MarshalError::InteriorNul { index });
                }
            }
        }

        let mut argv = owned.clone();
        argv.push(std::ptr::null_mut());
        Ok(CArgv { owned, argv })
    }
}

impl fmt::Display for ArgumentVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}

impl<'a> IntoIterator for &'a ArgumentVector {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.args.iter()
    }
}

/// Split a whitespace-delimited command string into an [`ArgumentVector`].
///
/// Token order is preserved and runs of separators count as one. The input
/// is only borrowed.
///
/// # Errors
///
/// - [`MarshalError::EmptyCommand`] if `command` is empty.
/// - [`MarshalError::NoArguments`] if `command` holds only whitespace.
///
/// # Example
///
/// ```
/// use ffbridge_core::marshal;
///
/// let argv = marshal("ffmpeg -i  in.mkv out.mp4")?;
/// assert_eq!(argv.argc(), 4);
/// assert_eq!(argv.program(), "ffmpeg");
/// # Ok::<(), ffbridge_core::MarshalError>(())
/// ```
pub fn marshal(command: &str) -> Result<ArgumentVector> {
    if command.is_empty() {
        return Err(MarshalError::EmptyCommand);
    }

    let args: Vec<String> = command.split_whitespace().map(str::to_owned).collect();
    if args.is_empty() {
        return Err(MarshalError::no_arguments(command));
    }

    Ok(ArgumentVector { args })
}

/// A C `argv` array terminated by a null sentinel.
///
/// Owns the strings it points to. The entry point may permute the pointer
/// array (as `getopt` does); the strings are freed from a separate list.
#[derive(Debug)]
pub struct CArgv {
    owned: Vec<*mut c_char>,
    argv: Vec<*mut c_char>,
}

impl CArgv {
    /// Count of real arguments; the sentinel is not included.
    pub fn argc(&self) -> c_int {
        (self.argv.len() - 1) as c_int
    }

    /// Pointer to the first element, suitable for `main(argc, argv)`.
    pub fn argv(&mut self) -> *mut *mut c_char {
        self.argv.as_mut_ptr()
    }
}

impl Drop for CArgv {
    fn drop(&mut self) {
        for ptr in self.owned.drain(..) {
            // SAFETY: allocated by CString::into_raw in to_c_argv and freed once.
            drop(unsafe { CString::from_raw(ptr) });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_empty_command() {
        assert_eq!(marshal(""), Err(MarshalError::EmptyCommand));
    }

    #[test]
    fn test_whitespace_only_command() {
        assert!(matches!(
            marshal("   "),
            Err(MarshalError::NoArguments { .. })
        ));
        assert!(matches!(
            marshal("\t \n"),
            Err(MarshalError::NoArguments { .. })
        ));
    }

    #[test]
    fn test_collapses_separators() {
        let argv = marshal("a b  c").unwrap();
        assert_eq!(argv.as_slice(), &["a", "b", "c"]);
        assert_eq!(argv.argc(), 3);
    }

    #[test]
    fn test_leading_and_trailing_whitespace() {
        let argv = marshal("  ffmpeg   -version  ").unwrap();
        assert_eq!(argv.program(), "ffmpeg");
        assert_eq!(argv.options(), &["-version"]);
        assert_eq!(argv.to_string(), "ffmpeg -version");
    }

    #[test]
    fn test_c_argv_sentinel_not_counted() {
        let argv = marshal("ffmpeg -i in.mkv").unwrap();
        let mut c = argv.to_c_argv().unwrap();
        assert_eq!(c.argc(), 3);

        let raw = c.argv();
        // SAFETY: raw points at argc + 1 valid slots.
        unsafe {
            assert_eq!(CStr::from_ptr(*raw.add(0)).to_str().unwrap(), "ffmpeg");
            assert_eq!(CStr::from_ptr(*raw.add(2)).to_str().unwrap(), "in.mkv");
            assert!((*raw.add(3)).is_null());
        }
    }

    #[test]
    fn test_c_argv_rejects_interior_nul() {
        let argv = marshal("ffmpeg bad\0arg").unwrap();
        assert_eq!(
            argv.to_c_argv().unwrap_err(),
            MarshalError::InteriorNul { index: 1 }
        );
    }
}
