use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::diagnostics::{FileName, SourceFile};

/// A path to a file, or `-` for standard input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input(PathBuf);
impl From<std::ffi::OsString> for Input {
    fn from(s: std::ffi::OsString) -> Self {
        Self(PathBuf::from(s))
    }
}
impl From<&OsStr> for Input {
    fn from(s: &OsStr) -> Self {
        Self(PathBuf::from(s))
    }
}
impl From<&Path> for Input {
    fn from(path: &Path) -> Self {
        Self(path.to_path_buf())
    }
}
impl From<PathBuf> for Input {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}
impl Input {
    pub fn is_stdin(&self) -> bool {
        self.0.as_os_str() == "-"
    }

    pub fn is_directory(&self) -> bool {
        self.0.is_dir()
    }

    pub fn path(&self) -> &Path {
        self.0.as_ref()
    }

    pub fn filename(&self) -> FileName {
        FileName::from(self.0.as_path())
    }

    /// Read this input fully into a shareable [SourceFile].
    ///
    /// The underlying reader is dropped before this function returns, whether
    /// reading succeeded or not. Unless `strict` is set, CRLF line endings are
    /// normalized to LF.
    pub fn into_source(&self, strict: bool) -> std::io::Result<Arc<SourceFile>> {
        let name = self.filename();
        let content = self.read_to_string(strict)?;
        log::trace!(target: "input", "read {} bytes from '{name}'", content.len());
        Ok(Arc::new(SourceFile::new(name, content)))
    }

    /// Expand this input into the set of files it denotes.
    ///
    /// A file is returned as-is. A directory is walked recursively, keeping
    /// only files whose extension is one of `file_types`.
    pub fn get_file_types(&self, file_types: &[String]) -> Result<Vec<Input>, walkdir::Error> {
        use walkdir::WalkDir;

        if !self.is_directory() {
            return Ok(vec![self.clone()]);
        }

        let mut inputs = vec![];
        for entry in WalkDir::new(&self.0).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() && is_matching_file_type(entry.path(), file_types) {
                inputs.push(Self(entry.into_path()));
            }
        }

        Ok(inputs)
    }

    pub fn open(&self) -> std::io::Result<impl std::io::BufRead> {
        use either::Either;
        use std::fs::File;

        Ok(if self.is_stdin() {
            Either::Left(std::io::stdin().lock())
        } else {
            Either::Right(std::io::BufReader::new(File::open(&self.0)?))
        })
    }

    pub fn read_to_string(&self, strict: bool) -> std::io::Result<String> {
        use std::io::Read;

        let mut content = String::with_capacity(1024);
        self.open()?.read_to_string(&mut content)?;
        if !strict && content.contains("\r\n") {
            content = content.replace("\r\n", "\n");
        }
        Ok(content)
    }
}

fn is_matching_file_type(path: &Path, file_types: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| file_types.iter().any(|ft| ft == ext))
        .unwrap_or(false)
}
