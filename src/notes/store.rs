//! Note store
//!
//! Safe, read-only access to the notes folder. Every read goes through the
//! same chain: filename shape, extension, existence, containment, size,
//! then decode.

use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::config::{extension_of, Config};
use crate::error::NoteError;
use crate::notes::pdf;
use crate::notes::types::{NoteEntry, NoteKind};

/// Read-only view of the notes folder
#[derive(Debug, Clone)]
pub struct NoteStore {
    folder: PathBuf,
    extensions: Vec<String>,
    max_file_size: u64,
    encoding: &'static encoding_rs::Encoding,
}

impl NoteStore {
    /// Create a store over `folder`
    pub fn new(
        folder: impl Into<PathBuf>,
        extensions: Vec<String>,
        max_file_size: u64,
        encoding: &'static encoding_rs::Encoding,
    ) -> Self {
        Self {
            folder: folder.into(),
            extensions,
            max_file_size,
            encoding,
        }
    }

    /// Create a store from the server configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.notes_folder.clone(),
            config.supported_extensions.clone(),
            config.max_file_size,
            config.encoding,
        )
    }

    /// List regular files in the folder with an allowed extension, sorted by name
    pub fn list_notes(&self) -> Result<Vec<NoteEntry>, NoteError> {
        let entries = fs::read_dir(&self.folder).map_err(|e| self.folder_unavailable(e))?;
        let root = self
            .folder
            .canonicalize()
            .map_err(|e| self.folder_unavailable(e))?;

        let mut notes = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            let Some(extension) = extension_of(&path) else {
                continue;
            };
            if !self.is_allowed(&extension) {
                continue;
            }

            // Links are followed, but only to targets inside the folder.
            match path.canonicalize() {
                Ok(target) if target.starts_with(&root) => {}
                Ok(target) => {
                    tracing::debug!("Skipping {}: resolves to {}", path.display(), target.display());
                    continue;
                }
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            }

            let metadata = match fs::metadata(&path) {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64);

            notes.push(NoteEntry {
                filename,
                size: metadata.len(),
                modified,
                extension,
            });
        }

        notes.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(notes)
    }

    /// Read a note of any allowed type
    pub fn read_note(&self, name: &str) -> Result<String, NoteError> {
        self.read_validated(name, false)
    }

    /// Read a PDF note
    pub fn read_pdf(&self, name: &str) -> Result<String, NoteError> {
        self.read_validated(name, true)
    }

    fn read_validated(&self, name: &str, pdf_only: bool) -> Result<String, NoteError> {
        check_filename(name)?;

        let requested = Path::new(name);
        let extension = extension_of(requested)
            .filter(|ext| self.is_allowed(ext))
            .ok_or_else(|| NoteError::UnsupportedExtension {
                name: name.to_string(),
                allowed: self.extensions.join(", "),
            })?;

        let kind = NoteKind::from_extension(&extension);
        if pdf_only && kind != NoteKind::Pdf {
            return Err(NoteError::UnsupportedExtension {
                name: name.to_string(),
                allowed: ".pdf".to_string(),
            });
        }

        let path = self.resolve(name)?;
        let bytes = self.read_limited(name, &path)?;

        match kind {
            NoteKind::Pdf => pdf::extract_text(name, &bytes),
            NoteKind::Text => self.decode(name, &bytes),
        }
    }

    /// Join `name` to the folder and verify the real path stays inside it
    fn resolve(&self, name: &str) -> Result<PathBuf, NoteError> {
        let candidate = self.folder.join(name);

        let metadata = match fs::metadata(&candidate) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if !self.folder.is_dir() {
                    return Err(self.folder_unavailable(e));
                }
                return Err(NoteError::NotFound {
                    name: name.to_string(),
                });
            }
            Err(e) => {
                return Err(NoteError::Io {
                    name: name.to_string(),
                    source: e,
                })
            }
        };
        if !metadata.is_file() {
            return Err(NoteError::NotFound {
                name: name.to_string(),
            });
        }

        let root = self
            .folder
            .canonicalize()
            .map_err(|e| self.folder_unavailable(e))?;
        let canonical = candidate.canonicalize().map_err(|e| NoteError::Io {
            name: name.to_string(),
            source: e,
        })?;

        if !canonical.starts_with(&root) {
            tracing::warn!("Rejected '{}': resolves to {}", name, canonical.display());
            return Err(NoteError::PathTraversal {
                name: name.to_string(),
            });
        }

        Ok(canonical)
    }

    /// Read at most `max_file_size` bytes, failing if the file is larger
    fn read_limited(&self, name: &str, path: &Path) -> Result<Vec<u8>, NoteError> {
        let io_err = |source: std::io::Error| NoteError::Io {
            name: name.to_string(),
            source,
        };

        let file = fs::File::open(path).map_err(io_err)?;
        let size = file.metadata().map_err(io_err)?.len();
        if size > self.max_file_size {
            tracing::warn!("Rejected '{}': {} bytes exceeds limit", name, size);
            return Err(self.too_large(name, size));
        }

        let mut bytes = Vec::with_capacity(size as usize);
        file.take(self.max_file_size.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(io_err)?;

        // The file grew between stat and read.
        if bytes.len() as u64 > self.max_file_size {
            return Err(self.too_large(name, bytes.len() as u64));
        }

        Ok(bytes)
    }

    fn decode(&self, name: &str, bytes: &[u8]) -> Result<String, NoteError> {
        self.encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
            .ok_or_else(|| NoteError::Decode {
                name: name.to_string(),
                encoding: self.encoding.name().to_string(),
            })
    }

    fn is_allowed(&self, extension: &str) -> bool {
        self.extensions.iter().any(|e| e == extension)
    }

    fn too_large(&self, name: &str, size: u64) -> NoteError {
        NoteError::TooLarge {
            name: name.to_string(),
            size,
            max: self.max_file_size,
        }
    }

    fn folder_unavailable(&self, e: std::io::Error) -> NoteError {
        NoteError::FolderUnavailable {
            path: self.folder.display().to_string(),
            message: e.to_string(),
        }
    }
}

/// Reject anything but a single plain file name
pub fn check_filename(name: &str) -> Result<(), NoteError> {
    let invalid = |reason: &str| NoteError::InvalidFilename {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.trim().is_empty() {
        return Err(invalid("filename is empty"));
    }
    if name.contains('\0') {
        return Err(invalid("filename contains a NUL byte"));
    }

    let path = Path::new(name);
    if path.is_absolute() || name.starts_with('/') || name.starts_with('\\') {
        return Err(NoteError::PathTraversal {
            name: name.to_string(),
        });
    }

    // Catches "..", "a/../b" and Windows-style separators on every platform.
    if name.split(|c| c == '/' || c == '\\').any(|part| part == "..") {
        return Err(NoteError::PathTraversal {
            name: name.to_string(),
        });
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains('\\') => Ok(()),
        _ => Err(invalid("must be a plain file name inside the notes folder")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir, max: u64) -> NoteStore {
        NoteStore::new(
            dir.path(),
            vec![".txt".to_string(), ".pdf".to_string()],
            max,
            encoding_rs::UTF_8,
        )
    }

    #[test]
    fn test_check_filename() {
        assert!(check_filename("todo.txt").is_ok());
        assert!(check_filename("weird name (1).txt").is_ok());
        assert!(matches!(
            check_filename("../secret.txt"),
            Err(NoteError::PathTraversal { .. })
        ));
        assert!(matches!(
            check_filename("/etc/passwd"),
            Err(NoteError::PathTraversal { .. })
        ));
        assert!(matches!(
            check_filename("..\\secret.txt"),
            Err(NoteError::PathTraversal { .. })
        ));
        assert!(matches!(
            check_filename("sub/note.txt"),
            Err(NoteError::InvalidFilename { .. })
        ));
        assert!(matches!(
            check_filename("."),
            Err(NoteError::InvalidFilename { .. })
        ));
        assert!(matches!(
            check_filename(""),
            Err(NoteError::InvalidFilename { .. })
        ));
    }

    #[test]
    fn test_list_skips_directories_and_other_extensions() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.TXT"), "a").unwrap();
        fs::write(dir.path().join("image.png"), "png").unwrap();
        fs::create_dir(dir.path().join("folder.txt")).unwrap();

        let notes = store(&dir, 1024).list_notes().unwrap();
        let names: Vec<_> = notes.iter().map(|n| n.filename.as_str()).collect();
        assert_eq!(names, vec!["a.TXT", "b.txt"]);
        assert_eq!(notes[0].extension, ".txt");
        assert_eq!(notes[1].size, 1);
    }

    #[test]
    fn test_list_missing_folder_fails() {
        let dir = TempDir::new().unwrap();
        let store = NoteStore::new(
            dir.path().join("missing"),
            vec![".txt".to_string()],
            1024,
            encoding_rs::UTF_8,
        );
        assert!(matches!(
            store.list_notes(),
            Err(NoteError::FolderUnavailable { .. })
        ));
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("exact.txt"), "12345").unwrap();
        fs::write(dir.path().join("over.txt"), "123456").unwrap();

        let store = store(&dir, 5);
        assert_eq!(store.read_note("exact.txt").unwrap(), "12345");
        assert!(matches!(
            store.read_note("over.txt"),
            Err(NoteError::TooLarge { size: 6, max: 5, .. })
        ));
    }

    #[test]
    fn test_decode_with_configured_encoding() {
        let dir = TempDir::new().unwrap();
        // "café" in Latin-1
        fs::write(dir.path().join("latin.txt"), [b'c', b'a', b'f', 0xE9]).unwrap();

        let utf8 = store(&dir, 1024);
        assert!(matches!(
            utf8.read_note("latin.txt"),
            Err(NoteError::Decode { .. })
        ));

        let latin = NoteStore::new(
            dir.path(),
            vec![".txt".to_string()],
            1024,
            encoding_rs::WINDOWS_1252,
        );
        assert_eq!(latin.read_note("latin.txt").unwrap(), "café");
    }

    #[test]
    fn test_read_pdf_refuses_text_notes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("note.txt"), "text").unwrap();

        let store = store(&dir, 1024);
        assert_eq!(store.read_note("note.txt").unwrap(), "text");
        match store.read_pdf("note.txt") {
            Err(NoteError::UnsupportedExtension { allowed, .. }) => assert_eq!(allowed, ".pdf"),
            other => panic!("expected UnsupportedExtension, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_rejected() {
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.txt"), "secret").unwrap();

        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            dir.path().join("link.txt"),
        )
        .unwrap();

        assert!(matches!(
            store(&dir, 1024).read_note("link.txt"),
            Err(NoteError::PathTraversal { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_list_skips_links_leaving_the_folder() {
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.txt"), "secret content").unwrap();

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("real.txt"), "real").unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            dir.path().join("link.txt"),
        )
        .unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("alias.txt"))
            .unwrap();

        let store = store(&dir, 1024);
        let names: Vec<_> = store
            .list_notes()
            .unwrap()
            .into_iter()
            .map(|n| n.filename)
            .collect();
        assert_eq!(names, vec!["alias.txt", "real.txt"]);
        for name in &names {
            assert!(store.read_note(name).is_ok(), "{} listed but unreadable", name);
        }
    }
}
