//! Reproducible ZIP packing of a rendered package directory.

use std::fs::File;
use std::io::{self, Seek, Write};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use walkdir::WalkDir;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::{CompressionMethod, DateTime};

use crate::TemplateError;

/// Seconds since the Unix epoch of the modification time stamped on every
/// member of every rendered archive (2010-01-01T00:00:00Z).
pub const FIXED_TIMESTAMP_SECS: u64 = 1_262_304_000;

/// [`FIXED_TIMESTAMP_SECS`] as a [`SystemTime`].
#[must_use]
pub fn fixed_timestamp() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(FIXED_TIMESTAMP_SECS)
}

/// ODF requires this member first and uncompressed.
const MIMETYPE: &str = "mimetype";

/// Pack every regular file under `root` into a ZIP archive written to `writer`.
///
/// Member names are paths relative to `root` with `/` separators. Members are
/// added in file-name order (with `mimetype` first) and each file's mtime is
/// forced to [`fixed_timestamp`] before it is added, so identical trees always
/// produce identical archives.
pub(crate) fn write_package<W: Write + Seek>(root: &Path, writer: W) -> Result<W, TemplateError> {
    let zip_time = DateTime::from_date_and_time(2010, 1, 1, 0, 0, 0)
        .map_err(|e| io::Error::other(e.to_string()))?;

    let mtime = fixed_timestamp();
    let mut members = collect_members(root)?;
    members.sort_by_key(|(name, _)| name != MIMETYPE);

    let mut zip = ZipWriter::new(writer);
    for (name, path) in members {
        // Setting times needs ownership only, so read-only members work too.
        File::open(&path)?.set_modified(mtime)?;

        let method = if name == MIMETYPE {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        let options = SimpleFileOptions::default()
            .compression_method(method)
            .last_modified_time(zip_time)
            .unix_permissions(0o644);

        tracing::trace!(member = %name, "adding archive member");
        zip.start_file(name, options)?;
        io::copy(&mut File::open(&path)?, &mut zip)?;
    }
    Ok(zip.finish()?)
}

/// Regular files under `root` as `(member name, path)`, in walk order.
fn collect_members(root: &Path) -> Result<Vec<(String, PathBuf)>, TemplateError> {
    let mut members = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        members.push((member_name(relative), entry.into_path()));
    }
    Ok(members)
}

fn member_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
