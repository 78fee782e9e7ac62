/// Idempotent filesystem primitives shared by the materializers.
pub mod fs {
    use std::fs::{self, OpenOptions};
    use std::io::{self, ErrorKind};

    use camino::Utf8Path;

    /// Ensure a directory exists, creating it recursively if needed.
    ///
    /// Returns `true` when the directory had to be created.
    pub fn ensure_dir(path: &Utf8Path) -> io::Result<bool> {
        if path.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(path)?;
        Ok(true)
    }

    /// Ensure a regular file exists, creating it empty if absent.
    ///
    /// Existing contents are left untouched. Returns `true` when the file was created.
    pub fn touch(path: &Utf8Path) -> io::Result<bool> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                if path.is_file() {
                    Ok(false)
                } else {
                    Err(io::Error::new(
                        ErrorKind::AlreadyExists,
                        "path exists and is not a regular file",
                    ))
                }
            }
            Err(err) => Err(err),
        }
    }

}
