//! Directory enumeration and playlist building

use std::cmp::Ordering;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::roots::RootSet;
use crate::storage::{bounded, StorageError};
use crate::token::PathToken;

/// File extension treated as playable video, compared case-insensitively
pub const VIDEO_EXTENSION: &str = "mp4";

/// Errors raised while listing a directory
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    /// Directory does not exist
    #[error("directory not found: {0}")]
    NotFound(PathBuf),
    /// Directory exists but cannot be read
    #[error("directory not accessible: {path}: {source}")]
    Inaccessible {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Storage did not answer in time
    #[error("storage unavailable while listing {0}")]
    StorageUnavailable(PathBuf),
}

impl ListingError {
    fn from_storage(path: &Path, err: StorageError) -> Self {
        match err {
            StorageError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ListingError::NotFound(path.to_path_buf())
            }
            StorageError::Io(source) => ListingError::Inaccessible {
                path: path.to_path_buf(),
                source,
            },
            StorageError::TimedOut(_) => ListingError::StorageUnavailable(path.to_path_buf()),
        }
    }
}

/// One directory or video file in a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Display name
    pub name: String,
    /// Absolute path on disk
    pub full_path: PathBuf,
}

impl Entry {
    /// Token for linking to this entry
    pub fn token(&self) -> PathToken {
        PathToken::encode(&self.full_path)
    }
}

/// Contents of one browsed directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub directories: Vec<Entry>,
    pub files: Vec<Entry>,
    /// Token of the parent directory, absent at a root
    pub parent: Option<PathToken>,
}

/// One item of a playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub name: String,
    pub token: PathToken,
}

/// Sorted sibling videos of the file being played
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub entries: Vec<PlaylistEntry>,
    /// Position of the requested file, `None` if it vanished
    pub index: Option<usize>,
    /// Token of the containing directory
    pub directory: PathToken,
}

impl Playlist {
    /// The entry being played
    pub fn current(&self) -> Option<&PlaylistEntry> {
        self.index.and_then(|i| self.entries.get(i))
    }

    pub fn previous(&self) -> Option<&PlaylistEntry> {
        self.index
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.entries.get(i))
    }

    pub fn next(&self) -> Option<&PlaylistEntry> {
        self.index.and_then(|i| self.entries.get(i + 1))
    }
}

/// Whether a file name carries the video extension
pub fn is_video(name: &OsStr) -> bool {
    Path::new(name)
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(VIDEO_EXTENSION))
}

/// Collation class of a character: punctuation and symbols sort before
/// digits, digits before letters
fn char_class(c: char) -> u8 {
    if c.is_alphabetic() {
        2
    } else if c.is_numeric() {
        1
    } else {
        0
    }
}

/// Primary sort key: accents stripped, case folded, classed per character
fn primary_key(name: &str) -> Vec<(u8, char)> {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| (char_class(c), c))
        .collect()
}

/// Locale-style ordering for names
///
/// Compares base letters first, ignoring accents and case, so `Élan` sorts
/// between `apple` and `Zorro`. Ties fall back to accents, then case, then
/// exact code points.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    primary_key(a)
        .cmp(&primary_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

/// List a directory, or the roots when `dir` is `None`
///
/// Children that cannot be stat'd are skipped. Only directories and video
/// files are kept; ordering follows the filesystem.
pub async fn list(
    roots: &RootSet,
    dir: Option<&Path>,
    limit: Duration,
) -> Result<Listing, ListingError> {
    let Some(dir) = dir else {
        return Ok(list_roots(roots, limit).await);
    };

    let mut listing = Listing {
        parent: parent_token(roots, dir),
        ..Listing::default()
    };

    for child in read_children(dir, limit).await? {
        if child.is_dir {
            listing.directories.push(child.into_entry());
        } else if child.is_video() {
            listing.files.push(child.into_entry());
        }
    }

    Ok(listing)
}

/// Build the playlist for a video file from its sibling videos
pub async fn build_playlist(file: &Path, limit: Duration) -> Result<Playlist, ListingError> {
    let folder = file.parent().unwrap_or_else(|| Path::new("/"));

    let mut videos: Vec<Child> = read_children(folder, limit)
        .await?
        .into_iter()
        .filter(|child| !child.is_dir && child.is_video())
        .collect();
    // Names that only differ in undecodable bytes still order deterministically
    videos.sort_by(|a, b| {
        compare_names(&a.name, &b.name).then_with(|| a.file_name.cmp(&b.file_name))
    });

    let index = file
        .file_name()
        .and_then(|current| videos.iter().position(|v| v.file_name == current));

    let entries = videos
        .into_iter()
        .map(|video| PlaylistEntry {
            token: PathToken::encode(&video.full_path),
            name: video.name,
        })
        .collect();

    Ok(Playlist {
        entries,
        index,
        directory: PathToken::encode(folder),
    })
}

async fn list_roots(roots: &RootSet, limit: Duration) -> Listing {
    let mut listing = Listing::default();
    for root in roots.iter() {
        match bounded(limit, tokio::fs::try_exists(root)).await {
            Ok(true) => listing.directories.push(Entry {
                name: root.display().to_string(),
                full_path: root.to_path_buf(),
            }),
            Ok(false) => tracing::debug!("Root {} does not exist, omitting", root.display()),
            Err(e) => tracing::debug!("Root {} unavailable, omitting: {}", root.display(), e),
        }
    }
    listing
}

fn parent_token(roots: &RootSet, dir: &Path) -> Option<PathToken> {
    if roots.is_root(dir) {
        return None;
    }
    dir.parent().map(PathToken::encode)
}

/// One stat'd directory child
struct Child {
    /// Display name, lossily decoded
    name: String,
    /// Name as stored on disk
    file_name: OsString,
    full_path: PathBuf,
    is_dir: bool,
}

impl Child {
    fn is_video(&self) -> bool {
        is_video(&self.file_name)
    }

    fn into_entry(self) -> Entry {
        Entry {
            name: self.name,
            full_path: self.full_path,
        }
    }
}

/// Read and stat the immediate children of `dir`
///
/// Failing to open or iterate the directory fails the whole call; failing to
/// stat one child only drops that child.
async fn read_children(dir: &Path, limit: Duration) -> Result<Vec<Child>, ListingError> {
    let mut entries = bounded(limit, tokio::fs::read_dir(dir))
        .await
        .map_err(|e| ListingError::from_storage(dir, e))?;

    let mut children = Vec::new();
    while let Some(entry) = bounded(limit, entries.next_entry())
        .await
        .map_err(|e| ListingError::from_storage(dir, e))?
    {
        let full_path = entry.path();
        // Follows symlinks, so a link to a directory lists as a directory
        match bounded(limit, tokio::fs::metadata(&full_path)).await {
            Ok(meta) => {
                let file_name = entry.file_name();
                children.push(Child {
                    name: file_name.to_string_lossy().into_owned(),
                    file_name,
                    full_path,
                    is_dir: meta.is_dir(),
                });
            }
            Err(e) => {
                tracing::debug!("Skipping {}: {}", full_path.display(), e);
            }
        }
    }

    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const LIMIT: Duration = Duration::from_secs(5);

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"data").unwrap();
    }

    fn names(entries: &[Entry]) -> Vec<String> {
        let mut names: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_is_video_case_insensitive() {
        assert!(is_video(OsStr::new("a.mp4")));
        assert!(is_video(OsStr::new("B.MP4")));
        assert!(is_video(OsStr::new("c.Mp4")));
        assert!(!is_video(OsStr::new("notes.txt")));
        assert!(!is_video(OsStr::new("mp4")));
        assert!(!is_video(OsStr::new("movie.mp4.part")));
    }

    #[test]
    fn test_compare_names() {
        let mut names = vec!["c.mp4", "a.mp4", "B.mp4"];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(names, vec!["a.mp4", "B.mp4", "c.mp4"]);

        assert_eq!(compare_names("A.mp4", "a.mp4"), Ordering::Less);
        assert_eq!(compare_names("a.mp4", "a.mp4"), Ordering::Equal);
    }

    #[test]
    fn test_compare_names_ignores_accents_at_first_level() {
        let mut names = vec!["Zorro.mp4", "Élan.mp4", "apple.mp4"];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(names, vec!["apple.mp4", "Élan.mp4", "Zorro.mp4"]);

        // Accent only breaks a tie between otherwise equal names
        assert_eq!(compare_names("elan.mp4", "élan.mp4"), Ordering::Less);
        assert_eq!(compare_names("élan.mp4", "elbow.mp4"), Ordering::Less);
    }

    #[test]
    fn test_compare_names_punctuation_before_digits_before_letters() {
        let mut names = vec!["a.mp4", "2 Fast.mp4", "_extras.mp4", "10 Things.mp4"];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(names, vec!["_extras.mp4", "10 Things.mp4", "2 Fast.mp4", "a.mp4"]);
    }

    #[tokio::test]
    async fn test_listing_filters_videos_and_directories() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.mp4");
        touch(dir.path(), "B.MP4");
        touch(dir.path(), "notes.txt");
        fs::create_dir(dir.path().join("x")).unwrap();

        let roots = RootSet::new([dir.path()]);
        let listing = list(&roots, Some(dir.path()), LIMIT).await.unwrap();

        assert_eq!(names(&listing.files), vec!["B.MP4", "a.mp4"]);
        assert_eq!(names(&listing.directories), vec!["x"]);
        let x = &listing.directories[0];
        assert_eq!(x.full_path, dir.path().join("x"));
        assert_eq!(x.token().decode().unwrap(), dir.path().join("x"));
    }

    #[tokio::test]
    async fn test_root_has_no_parent() {
        let dir = TempDir::new().unwrap();
        let roots = RootSet::new([dir.path()]);

        let listing = list(&roots, Some(dir.path()), LIMIT).await.unwrap();
        assert_eq!(listing.parent, None);
    }

    #[tokio::test]
    async fn test_non_root_parent_is_filesystem_parent() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("season 1");
        fs::create_dir(&nested).unwrap();
        let roots = RootSet::new([dir.path()]);

        let listing = list(&roots, Some(&nested), LIMIT).await.unwrap();
        assert_eq!(listing.parent, Some(PathToken::encode(dir.path())));
    }

    #[tokio::test]
    async fn test_root_listing_omits_missing_roots() {
        let present = TempDir::new().unwrap();
        let missing = present.path().join("unplugged-drive");
        let roots = RootSet::new([present.path().to_path_buf(), missing]);

        let listing = list(&roots, None, LIMIT).await.unwrap();
        assert_eq!(listing.directories.len(), 1);
        assert_eq!(listing.directories[0].full_path, present.path());
        assert_eq!(
            listing.directories[0].name,
            present.path().display().to_string()
        );
        assert!(listing.files.is_empty());
        assert_eq!(listing.parent, None);
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_found() {
        let dir = TempDir::new().unwrap();
        let roots = RootSet::new([dir.path()]);

        let result = list(&roots, Some(&dir.path().join("gone")), LIMIT).await;
        assert!(matches!(result, Err(ListingError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_file_is_inaccessible_not_empty() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.mp4");
        let roots = RootSet::new([dir.path()]);

        let result = list(&roots, Some(&dir.path().join("a.mp4")), LIMIT).await;
        assert!(matches!(result, Err(ListingError::Inaccessible { .. })));
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let roots = RootSet::new([dir.path()]);

        let listing = list(&roots, Some(dir.path()), LIMIT).await.unwrap();
        assert!(listing.directories.is_empty());
        assert!(listing.files.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_broken_symlink_is_skipped() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.mp4");
        std::os::unix::fs::symlink(
            dir.path().join("nowhere.mp4"),
            dir.path().join("dangling.mp4"),
        )
        .unwrap();
        let roots = RootSet::new([dir.path()]);

        let listing = list(&roots, Some(dir.path()), LIMIT).await.unwrap();
        assert_eq!(names(&listing.files), vec!["a.mp4"]);
    }

    #[tokio::test]
    async fn test_playlist_ordering_and_index() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "c.mp4");
        touch(dir.path(), "a.mp4");
        touch(dir.path(), "B.mp4");
        touch(dir.path(), "cover.jpg");
        fs::create_dir(dir.path().join("extras.mp4")).unwrap();

        let playlist = build_playlist(&dir.path().join("B.mp4"), LIMIT)
            .await
            .unwrap();

        let ordered: Vec<&str> = playlist.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(ordered, vec!["a.mp4", "B.mp4", "c.mp4"]);
        assert_eq!(playlist.index, Some(1));
        assert_eq!(playlist.current().unwrap().name, "B.mp4");
        assert_eq!(playlist.previous().unwrap().name, "a.mp4");
        assert_eq!(playlist.next().unwrap().name, "c.mp4");
        assert_eq!(
            playlist.entries[2].token.decode().unwrap(),
            dir.path().join("c.mp4")
        );
        assert_eq!(playlist.directory.decode().unwrap(), dir.path());
    }

    #[tokio::test]
    async fn test_playlist_edges() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.mp4");
        touch(dir.path(), "b.mp4");

        let first = build_playlist(&dir.path().join("a.mp4"), LIMIT).await.unwrap();
        assert_eq!(first.index, Some(0));
        assert!(first.previous().is_none());

        let last = build_playlist(&dir.path().join("b.mp4"), LIMIT).await.unwrap();
        assert_eq!(last.index, Some(1));
        assert!(last.next().is_none());
    }

    #[tokio::test]
    async fn test_playlist_missing_file_has_no_index() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.mp4");

        let playlist = build_playlist(&dir.path().join("removed.mp4"), LIMIT)
            .await
            .unwrap();
        assert_eq!(playlist.entries.len(), 1);
        assert_eq!(playlist.index, None);
        assert!(playlist.current().is_none());
        assert!(playlist.next().is_none());
    }

    #[tokio::test]
    async fn test_playlist_sorts_accented_names() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Zorro.mp4");
        touch(dir.path(), "Élan.mp4");
        touch(dir.path(), "apple.mp4");

        let playlist = build_playlist(&dir.path().join("Élan.mp4"), LIMIT)
            .await
            .unwrap();
        let ordered: Vec<&str> = playlist.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(ordered, vec!["apple.mp4", "Élan.mp4", "Zorro.mp4"]);
        assert_eq!(playlist.index, Some(1));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_playlist_tokens_keep_non_utf8_names() {
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let raw = dir.path().join(OsStr::from_bytes(b"\xffclip.mp4"));
        let other = dir.path().join(OsStr::from_bytes(b"\xfeclip.mp4"));
        fs::write(&raw, b"data").unwrap();
        fs::write(&other, b"data").unwrap();

        let playlist = build_playlist(&raw, LIMIT).await.unwrap();
        assert_eq!(playlist.entries.len(), 2);

        let current = playlist.current().unwrap();
        let decoded = current.token.decode().unwrap();
        assert_eq!(decoded, raw);
        assert!(decoded.exists());

        for entry in &playlist.entries {
            assert!(entry.token.decode().unwrap().exists());
        }
        assert_ne!(playlist.entries[0].token, playlist.entries[1].token);
    }

    #[tokio::test]
    async fn test_playlist_in_missing_directory() {
        let dir = TempDir::new().unwrap();
        let result = build_playlist(&dir.path().join("gone").join("a.mp4"), LIMIT).await;
        assert!(matches!(result, Err(ListingError::NotFound(_))));
    }
}
