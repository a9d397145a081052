//! Local staging area for media files pending upload to WeChat.
//!
//! Files live under `<root>/<app_id>/<type>/<file_name>` with the type
//! restricted to image/video/voice. Staged files have no expiry; they are
//! removed only by an explicit delete.

use crate::errors::StewardError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

/// Media kind accepted by the staging area and the temporary-media API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Image,
    Video,
    Voice,
}

impl MediaType {
    pub const ALL: [MediaType; 3] = [MediaType::Image, MediaType::Video, MediaType::Voice];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Voice => "voice",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = StewardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            "voice" => Ok(MediaType::Voice),
            other => Err(StewardError::InvalidParameter(format!(
                "unsupported media type: {other}"
            ))),
        }
    }
}

/// Path components must not escape the staging directory.
fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains('/')
        && !segment.contains('\\')
}

/// Content type guess for serving staged files, keyed by extension.
pub fn guess_mime(file_name: &str) -> &'static str {
    let ext = file_name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "mp4" => "video/mp4",
        "amr" => "audio/amr",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        _ => "application/octet-stream",
    }
}

#[derive(Clone, Debug)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn type_dir(&self, app_id: &str, media_type: MediaType) -> PathBuf {
        self.root.join(app_id).join(media_type.as_str())
    }

    /// Store one file. Returns whether the file landed on disk; a rejected
    /// name or an I/O failure yields `false` so a batch can carry on with
    /// its remaining items.
    pub async fn store(
        &self,
        app_id: &str,
        media_type: MediaType,
        file_name: &str,
        bytes: &[u8],
    ) -> bool {
        if !valid_segment(app_id) || !valid_segment(file_name) {
            warn!(app_id, file_name, "rejecting media file with unsafe name");
            return false;
        }
        let dir = self.type_dir(app_id, media_type);
        if let Err(err) = tokio::fs::create_dir_all(&dir).await {
            warn!(?err, dir = %dir.display(), "failed to create media directory");
            return false;
        }
        let path = dir.join(file_name);
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => true,
            Err(err) => {
                warn!(?err, path = %path.display(), "failed to write media file");
                false
            }
        }
    }

    /// Delete a batch of files. Returns aggregate success: `true` only if
    /// every named file was removed. One item's failure does not stop the
    /// rest of the batch.
    pub async fn delete(&self, app_id: &str, media_type: MediaType, file_names: &[String]) -> bool {
        let mut all_removed = true;
        for name in file_names {
            if !valid_segment(app_id) || !valid_segment(name) {
                all_removed = false;
                continue;
            }
            let path = self.type_dir(app_id, media_type).join(name);
            if let Err(err) = tokio::fs::remove_file(&path).await {
                warn!(?err, path = %path.display(), "failed to delete media file");
                all_removed = false;
            }
        }
        all_removed
    }

    /// List staged files for an app, optionally restricted to one type.
    /// Each returned path ends in `<type>/<file_name>`.
    pub async fn list(
        &self,
        app_id: &str,
        filter: Option<MediaType>,
    ) -> Result<Vec<PathBuf>, StewardError> {
        if !valid_segment(app_id) {
            return Err(StewardError::InvalidParameter(
                "unsafe app id".to_string(),
            ));
        }
        let types: &[MediaType] = match filter {
            Some(ref t) => std::slice::from_ref(t),
            None => &MediaType::ALL,
        };

        let mut files = Vec::new();
        for media_type in types {
            let dir = self.type_dir(app_id, *media_type);
            if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
                continue;
            }
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_file() {
                    files.push(entry.path());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Resolve the on-disk path of a staged file, for forwarding it to the
    /// temporary-media API or serving it over HTTP.
    pub async fn path_of(
        &self,
        app_id: &str,
        media_type: MediaType,
        file_name: &str,
    ) -> Result<PathBuf, StewardError> {
        if !valid_segment(app_id) || !valid_segment(file_name) {
            return Err(StewardError::InvalidParameter(
                "unsafe file name".to_string(),
            ));
        }
        let path = self.type_dir(app_id, media_type).join(file_name);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StewardError::NotFound(format!(
                "no staged {media_type} file named {file_name}"
            )));
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_media_type_parse() {
        assert_eq!("image".parse::<MediaType>().unwrap(), MediaType::Image);
        assert_eq!("video".parse::<MediaType>().unwrap(), MediaType::Video);
        assert_eq!("voice".parse::<MediaType>().unwrap(), MediaType::Voice);
    }

    #[test]
    fn test_media_type_rejects_unknown() {
        for bad in ["file", "IMAGE", "", "audio"] {
            let err = bad.parse::<MediaType>().unwrap_err();
            assert!(
                matches!(err, StewardError::InvalidParameter(_)),
                "{bad} should be an invalid parameter"
            );
        }
    }

    #[tokio::test]
    async fn test_store_list_delete_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path());

        assert!(store.store("wx-app", MediaType::Image, "x.png", b"png").await);
        assert!(store.store("wx-app", MediaType::Video, "y.mp4", b"mp4").await);

        let all = store.list("wx-app", None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|p| p.ends_with("image/x.png")));
        assert!(all.iter().any(|p| p.ends_with("video/y.mp4")));

        let images = store.list("wx-app", Some(MediaType::Image)).await.unwrap();
        assert_eq!(images.len(), 1);

        assert!(store.delete("wx-app", MediaType::Image, &["x.png".to_string()]).await);
        let images = store.list("wx-app", Some(MediaType::Image)).await.unwrap();
        assert!(images.is_empty());
    }

    #[tokio::test]
    async fn test_store_rejects_unsafe_names() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path());

        assert!(!store.store("wx-app", MediaType::Image, "../escape.png", b"x").await);
        assert!(!store.store("wx-app", MediaType::Image, "", b"x").await);
        assert!(!store.store("../escape", MediaType::Image, "x.png", b"x").await);

        // Nothing landed outside or inside the staging area
        assert!(store.list("wx-app", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path());

        assert!(store.store("wx-app", MediaType::Image, "x.png", b"png").await);
        let names = vec!["x.png".to_string(), "missing.png".to_string()];
        assert!(!store.delete("wx-app", MediaType::Image, &names).await);
        // The existing file was still removed
        assert!(store.list("wx-app", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_path_of_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path());

        let err = store
            .path_of("wx-app", MediaType::Voice, "gone.amr")
            .await
            .unwrap_err();
        assert!(matches!(err, StewardError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_unknown_app_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path());
        assert!(store.list("wx-nobody", None).await.unwrap().is_empty());
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime("a.PNG"), "image/png");
        assert_eq!(guess_mime("b.mp4"), "video/mp4");
        assert_eq!(guess_mime("c.amr"), "audio/amr");
        assert_eq!(guess_mime("noext"), "application/octet-stream");
    }
}
