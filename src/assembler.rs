//! Rebuilding the cleaned playlist and replacing the destination atomically.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::ProbeResult;

/// Serialize the working links of `results` as an extended M3U playlist
///
/// Results may arrive in any order; survivors are emitted by ascending
/// `original_index`, each as its EXTINF line (if any) followed by its URL.
/// `header` (the input's `#EXTM3U` line, attributes included) comes first
/// when present. Every line, including the last, ends with `\n`.
///
/// # Examples
///
/// ```
/// use m3u_sweep::assembler::assemble;
/// use m3u_sweep::types::{LinkRecord, ProbeResult, ProbeStatus};
///
/// let result = ProbeResult {
///     record: LinkRecord {
///         url: "http://a.example/live".into(),
///         extinf: Some("#EXTINF:-1,News".into()),
///         original_index: 0,
///     },
///     is_working: true,
///     status: ProbeStatus::Http(200),
///     error: None,
/// };
///
/// assert_eq!(
///     assemble(&[result], Some("#EXTM3U")),
///     "#EXTM3U\n#EXTINF:-1,News\nhttp://a.example/live\n"
/// );
/// ```
pub fn assemble(results: &[ProbeResult], header: Option<&str>) -> String {
    let mut survivors: Vec<&ProbeResult> = results.iter().filter(|r| r.is_working).collect();
    survivors.sort_by_key(|r| r.record.original_index);

    let mut out = String::new();
    if let Some(header) = header {
        out.push_str(header);
        out.push('\n');
    }
    for result in survivors {
        if let Some(extinf) = &result.record.extinf {
            out.push_str(extinf);
            out.push('\n');
        }
        out.push_str(&result.record.url);
        out.push('\n');
    }
    out
}

/// Replace `dest` with `contents` without ever exposing a partial file
///
/// The data goes to a temporary file in the same directory (same filesystem,
/// so the final rename is atomic), is synced, then renamed over `dest`. If
/// anything fails before the rename the temporary file is removed and `dest`
/// is left untouched. Existing permissions on `dest` are carried over.
///
/// If `dest` is a symlink, the file it points to is replaced and the link is
/// kept.
///
/// # Errors
///
/// Returns [`Error::OutputWrite`] for any failure.
pub fn write_atomic(dest: &Path, contents: &[u8]) -> Result<()> {
    let dest = &resolve_symlink(dest);
    let dir = parent_dir(dest);
    let fail = |reason: &dyn std::fmt::Display| Error::output_write(dest, reason);

    let mut tmp = tempfile::Builder::new()
        .prefix(".m3u-sweep-")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(|e| fail(&e))?;

    tmp.write_all(contents).map_err(|e| fail(&e))?;
    tmp.as_file().sync_all().map_err(|e| fail(&e))?;

    if let Ok(metadata) = std::fs::metadata(dest)
        && metadata.is_file()
        && let Err(e) = std::fs::set_permissions(tmp.path(), metadata.permissions())
    {
        tracing::debug!(path = %dest.display(), error = %e, "could not copy permissions");
    }

    // On failure `persist` hands the temp file back; dropping it deletes it.
    tmp.persist(dest).map_err(|e| fail(&e.error))?;

    tracing::debug!(path = %dest.display(), bytes = contents.len(), "output replaced");
    Ok(())
}

/// Async wrapper running [`write_atomic`] on the blocking pool
pub async fn write_atomic_async(dest: PathBuf, contents: Vec<u8>) -> Result<()> {
    let target = dest.clone();
    tokio::task::spawn_blocking(move || write_atomic(&dest, &contents))
        .await
        .map_err(|e| Error::output_write(target, e))?
}

/// Follow `path` to its final target when it is a symlink
fn resolve_symlink(path: &Path) -> PathBuf {
    let is_link = std::fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink());
    if !is_link {
        return path.to_path_buf();
    }
    match std::fs::canonicalize(path) {
        Ok(target) => target,
        Err(e) => {
            // Dangling link: replace the link itself.
            tracing::debug!(path = %path.display(), error = %e, "cannot resolve symlink");
            path.to_path_buf()
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LinkRecord, ProbeStatus};
    use std::fs;
    use tempfile::TempDir;

    fn result(index: usize, url: &str, extinf: Option<&str>, working: bool) -> ProbeResult {
        ProbeResult {
            record: LinkRecord {
                url: url.to_string(),
                extinf: extinf.map(str::to_string),
                original_index: index,
            },
            is_working: working,
            status: ProbeStatus::Http(if working { 200 } else { 404 }),
            error: None,
        }
    }

    #[test]
    fn restores_original_order_and_drops_non_working() {
        let results = vec![
            result(2, "http://c/", Some("#EXTINF:-1,C"), true),
            result(0, "http://a/", Some("#EXTINF:-1,A"), true),
            result(3, "http://d/", None, true),
            result(1, "http://b/", Some("#EXTINF:-1,B"), false),
        ];

        assert_eq!(
            assemble(&results, None),
            "#EXTINF:-1,A\nhttp://a/\n#EXTINF:-1,C\nhttp://c/\nhttp://d/\n"
        );
    }

    #[test]
    fn header_only_when_flagged() {
        let results = vec![result(0, "http://a/", None, true)];
        assert_eq!(assemble(&results, Some("#EXTM3U")), "#EXTM3U\nhttp://a/\n");
        assert_eq!(assemble(&results, None), "http://a/\n");
    }

    #[test]
    fn header_attributes_survive() {
        let results = vec![result(0, "http://a.example/live", Some("#EXTINF:-1,News"), true)];
        let header = "#EXTM3U x-tvg-url=\"http://epg.example/guide.xml\"";
        assert_eq!(
            assemble(&results, Some(header)),
            format!("{header}\n#EXTINF:-1,News\nhttp://a.example/live\n")
        );
    }

    #[test]
    fn nothing_working_yields_header_or_empty() {
        let results = vec![result(0, "http://a/", None, false)];
        assert_eq!(assemble(&results, Some("#EXTM3U")), "#EXTM3U\n");
        assert_eq!(assemble(&results, None), "");
        assert_eq!(assemble(&[], None), "");
    }

    #[test]
    fn write_atomic_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.m3u");

        write_atomic(&dest, b"first\n").unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "first\n");

        write_atomic(&dest, b"second\n").unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "second\n");

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|n| n.to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    }

    #[test]
    fn write_atomic_into_missing_directory_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("no-such-dir").join("out.m3u");

        let err = write_atomic(&dest, b"data").unwrap_err();
        assert!(matches!(err, Error::OutputWrite { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn failed_rename_leaves_destination_and_no_temp_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file rename.
        let dest = dir.path().join("occupied");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("keep.txt"), "keep").unwrap();

        let err = write_atomic(&dest, b"data").unwrap_err();
        assert!(matches!(err, Error::OutputWrite { .. }));
        assert_eq!(fs::read_to_string(dest.join("keep.txt")).unwrap(), "keep");

        let temp_files = fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .starts_with(".m3u-sweep-")
            })
            .count();
        assert_eq!(temp_files, 0);
    }

    #[cfg(unix)]
    #[test]
    fn write_atomic_preserves_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("list.m3u");
        fs::write(&dest, "old").unwrap();
        fs::set_permissions(&dest, fs::Permissions::from_mode(0o640)).unwrap();

        write_atomic(&dest, b"new").unwrap();

        let mode = fs::metadata(&dest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[cfg(unix)]
    #[test]
    fn write_atomic_through_symlink_replaces_target() {
        let dir = TempDir::new().unwrap();
        let target_dir = dir.path().join("store");
        fs::create_dir(&target_dir).unwrap();
        let target = target_dir.join("real.m3u");
        fs::write(&target, "old\n").unwrap();
        let link = dir.path().join("list.m3u");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        write_atomic(&link, b"new\n").unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&target).unwrap(), "new\n");
        assert_eq!(fs::read_to_string(&link).unwrap(), "new\n");
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_replaced_by_file() {
        let dir = TempDir::new().unwrap();
        let link = dir.path().join("list.m3u");
        std::os::unix::fs::symlink(dir.path().join("gone.m3u"), &link).unwrap();

        write_atomic(&link, b"data\n").unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().is_file());
        assert_eq!(fs::read_to_string(&link).unwrap(), "data\n");
    }

    #[tokio::test]
    async fn async_wrapper_writes_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a.m3u");
        write_atomic_async(dest.clone(), b"#EXTM3U\n".to_vec())
            .await
            .unwrap();
        assert_eq!(fs::read_to_string(dest).unwrap(), "#EXTM3U\n");
    }

    #[test]
    fn bare_file_name_uses_current_directory() {
        assert_eq!(parent_dir(Path::new("list.m3u")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("/a/b.m3u")), PathBuf::from("/a"));
    }
}
