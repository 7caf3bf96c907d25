use crate::config::AppConfig;
use crate::error::AppError;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;
use walkdir::WalkDir;

/// Flat directory of uploaded images keyed by sanitized file name.
///
/// Nothing is cached in memory; every call looks at the directory again.
/// Writers are not serialized, so the last upload of a name wins.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    allowed_extensions: HashSet<String>,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>, allowed_extensions: &HashSet<String>) -> Self {
        Self {
            root: root.into(),
            allowed_extensions: allowed_extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.upload_directory, &config.allowed_extensions)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_allowed(&self, filename: &str) -> bool {
        match filename.rsplit_once('.') {
            Some((_, ext)) => self.allowed_extensions.contains(&ext.to_lowercase()),
            None => false,
        }
    }

    /// Validates a client-supplied name and returns the name it will be stored under.
    pub fn check_upload_name(&self, filename: &str) -> Result<String, AppError> {
        if filename.is_empty() {
            return Err(AppError::Validation("No selected file".into()));
        }
        if !self.is_allowed(filename) {
            log::debug!("Rejecting upload with unsupported extension: {}", filename);
            return Err(AppError::Validation("Invalid file type".into()));
        }

        let sanitized = sanitize_filename(filename);
        if sanitized.is_empty() || !self.is_allowed(&sanitized) {
            log::debug!("Upload name {:?} sanitized to unusable {:?}", filename, sanitized);
            return Err(AppError::Validation("Invalid file name".into()));
        }
        Ok(sanitized)
    }

    /// Writes `contents` under an already sanitized name, replacing any existing file.
    pub async fn save(&self, filename: &str, contents: &[u8]) -> Result<(), AppError> {
        let path = self.root.join(filename);
        tokio::fs::create_dir_all(&self.root).await?;

        log::debug!("Saving {} bytes to {:?}", contents.len(), path);
        tokio::fs::write(&path, contents).await?;

        if !tokio::fs::try_exists(&path).await? {
            log::error!("Upload vanished after write: {:?}", path);
            return Err(AppError::Storage("File was not saved successfully".into()));
        }
        log::info!("Stored upload {}", filename);
        Ok(())
    }

    /// Maps a stored name to its path, failing when no such file exists.
    pub async fn resolve(&self, filename: &str) -> Result<PathBuf, AppError> {
        let path = self.path_for(filename)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(not_found(filename)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found(filename)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn read(&self, filename: &str) -> Result<Vec<u8>, AppError> {
        let path = self.path_for(filename)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => not_found(filename),
            _ => AppError::Io(e),
        })
    }

    /// Names of all stored images, in directory order.
    pub async fn list(&self) -> Result<Vec<String>, AppError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.list_blocking()).await?
    }

    fn list_blocking(&self) -> Result<Vec<String>, AppError> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root)?;
            log::debug!("Created upload directory: {:?}", self.root);
            return Ok(Vec::new());
        }

        let mut images = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                log::trace!("Skipping non-file entry: {:?}", entry.path());
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if self.is_allowed(name) {
                    images.push(name.to_string());
                } else {
                    log::trace!("Skipping file due to unsupported extension: {}", name);
                }
            }
        }
        Ok(images)
    }

    pub async fn delete(&self, filename: &str) -> Result<(), AppError> {
        let path = self.resolve(filename).await?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                log::info!("Deleted upload {}", filename);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found(filename)),
            Err(e) => Err(e.into()),
        }
    }

    fn path_for(&self, filename: &str) -> Result<PathBuf, AppError> {
        // Stored names are single path components; anything else cannot exist here.
        if filename.is_empty()
            || filename == "."
            || filename == ".."
            || filename.contains(['/', '\\'])
        {
            return Err(not_found(filename));
        }
        Ok(self.root.join(filename))
    }
}

fn not_found(filename: &str) -> AppError {
    AppError::NotFound(format!("File {} not found", filename))
}

/// Reduces a client-supplied file name to a safe single path component:
/// NFKD-folded to ASCII so accents fall back to base letters, separators
/// become whitespace, whitespace runs become `_`, characters outside
/// `[A-Za-z0-9_.-]` are dropped and leading or trailing `.`/`_` are stripped.
pub fn sanitize_filename(filename: &str) -> String {
    let ascii: String = filename
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    ascii
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> ImageStore {
        let allowed: HashSet<String> =
            ["png", "jpg", "jpeg", "gif"].iter().map(|s| s.to_string()).collect();
        ImageStore::new(dir.join("uploads"), &allowed)
    }

    #[test]
    fn sanitize_strips_traversal_and_unsafe_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd.png"), "etc_passwd.png");
        assert_eq!(sanitize_filename("my photo (1).jpg"), "my_photo_1.jpg");
        assert_eq!(sanitize_filename("C:\\Users\\me\\face.gif"), "C_Users_me_face.gif");
        assert_eq!(sanitize_filename("  .hidden.png  "), "hidden.png");
        assert_eq!(sanitize_filename("café.jpeg"), "cafe.jpeg");
        assert_eq!(sanitize_filename("naïve résumé.png"), "naive_resume.png");
        assert_eq!(sanitize_filename("ﬁle.gif"), "file.gif");
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.is_allowed("face.PNG"));
        assert!(store.is_allowed("face.JpEg"));
        assert!(!store.is_allowed("face.bmp"));
        assert!(!store.is_allowed("png"));
    }

    #[test]
    fn upload_names_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        assert!(matches!(store.check_upload_name(""), Err(AppError::Validation(m)) if m == "No selected file"));
        assert!(matches!(store.check_upload_name("notes.txt"), Err(AppError::Validation(m)) if m == "Invalid file type"));
        assert!(matches!(store.check_upload_name("照片.png"), Err(AppError::Validation(m)) if m == "Invalid file name"));
        assert_eq!(store.check_upload_name("é.png").unwrap(), "e.png");
        assert_eq!(store.check_upload_name("../a b.png").unwrap(), "a_b.png");
    }

    #[tokio::test]
    async fn saved_bytes_round_trip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        store.save("a.png", b"first").await.unwrap();
        store.save("a.png", b"second").await.unwrap();

        assert_eq!(store.read("a.png").await.unwrap(), b"second");
        assert_eq!(store.list().await.unwrap(), vec!["a.png".to_string()]);
    }

    #[tokio::test]
    async fn list_creates_missing_directory_and_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        assert!(store.list().await.unwrap().is_empty());
        assert!(store.root().is_dir());

        std::fs::write(store.root().join("b.jpg"), b"x").unwrap();
        std::fs::write(store.root().join("readme.txt"), b"x").unwrap();
        std::fs::create_dir(store.root().join("nested.png")).unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["b.jpg".to_string()]);
    }

    #[tokio::test]
    async fn delete_removes_file_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.save("a.png", b"x").await.unwrap();

        store.delete("a.png").await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert!(matches!(store.delete("a.png").await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn names_outside_the_directory_are_never_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        std::fs::write(dir.path().join("secret.png"), b"x").unwrap();

        assert!(matches!(store.resolve("../secret.png").await, Err(AppError::NotFound(_))));
        assert!(matches!(store.read("..").await, Err(AppError::NotFound(_))));
    }
}
