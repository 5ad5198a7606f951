//! `compress` — pack a directory tree into a reproducible archive.
//!
//! Every entry lands under one top-level directory. Entries are sorted by
//! path with normalized modes and a fixed timestamp (tar mtime 0, zip
//! 1980-01-01), so the same tree always yields the same bytes.

use std::fs::File;
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, EntryType, Header};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use kiln_core::CompressTarget;

use crate::context::StepContext;
use crate::error::{io_err, SyncError};
use crate::writer::{ensure_parent, finish_tmp, tmp_path, FileChange};

/// Archive container chosen from the destination's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    Tar,
}

impl ArchiveFormat {
    pub fn from_path(path: &Path) -> Option<ArchiveFormat> {
        let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
        if name.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if name.ends_with(".tar") {
            Some(ArchiveFormat::Tar)
        } else {
            None
        }
    }
}

pub fn run(target: &CompressTarget, ctx: &StepContext<'_>) -> Result<Vec<FileChange>, SyncError> {
    let archive = ctx.path(&target.archive)?;
    let source = ctx.path(&target.cwd)?;
    let prefix = ctx.resolve(&target.dest)?;
    Ok(vec![pack(&source, &archive, prefix.trim_matches('/'))?])
}

/// Pack `source` into `archive`, nesting every entry under `prefix`.
pub fn pack(source: &Path, archive: &Path, prefix: &str) -> Result<FileChange, SyncError> {
    if !source.is_dir() {
        return Err(SyncError::MissingSource {
            path: source.to_path_buf(),
        });
    }
    let format = ArchiveFormat::from_path(archive).ok_or_else(|| SyncError::UnsupportedArchive {
        path: archive.to_path_buf(),
    })?;
    let entries = collect_entries(source, archive)?;

    ensure_parent(archive)?;
    let tmp = tmp_path(archive);
    let file = File::create(&tmp).map_err(|e| io_err(&tmp, e))?;
    let written = match format {
        ArchiveFormat::Zip => write_zip(file, prefix, &entries).and_then(|f| f.sync_all()),
        ArchiveFormat::TarGz => {
            let gz = GzEncoder::new(file, Compression::default());
            write_tar(gz, prefix, &entries)
                .and_then(|gz| gz.finish())
                .and_then(|f| f.sync_all())
        }
        ArchiveFormat::Tar => write_tar(file, prefix, &entries).and_then(|f| f.sync_all()),
    };
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(archive, e));
    }
    finish_tmp(&tmp, archive)?;

    tracing::debug!("packed {} entries into {}", entries.len(), archive.display());
    Ok(FileChange::Written {
        path: archive.to_path_buf(),
    })
}

struct ArchiveEntry {
    /// `/`-separated path relative to the source directory.
    name: String,
    path: PathBuf,
    is_dir: bool,
}

fn collect_entries(source: &Path, archive: &Path) -> Result<Vec<ArchiveEntry>, SyncError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| io_err(source, e.into()))?;
        let path = entry.path();
        if path == archive {
            continue;
        }
        let Ok(rel) = path.strip_prefix(source) else {
            continue;
        };
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        entries.push(ArchiveEntry {
            name,
            path: path.to_path_buf(),
            is_dir: path.is_dir(),
        });
    }
    Ok(entries)
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}/{name}")
    }
}

fn write_zip<W: Write + Seek>(out: W, prefix: &str, entries: &[ArchiveEntry]) -> io::Result<W> {
    let mut zip = ZipWriter::new(out);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    if !prefix.is_empty() {
        zip.add_directory(format!("{prefix}/"), options.unix_permissions(0o755))?;
    }
    for entry in entries {
        let name = join(prefix, &entry.name);
        if entry.is_dir {
            zip.add_directory(format!("{name}/"), options.unix_permissions(0o755))?;
        } else {
            let data = std::fs::read(&entry.path)?;
            zip.start_file(name, options.unix_permissions(file_mode(&entry.path)?))?;
            zip.write_all(&data)?;
        }
    }
    Ok(zip.finish()?)
}

fn write_tar<W: Write>(out: W, prefix: &str, entries: &[ArchiveEntry]) -> io::Result<W> {
    let mut builder = Builder::new(out);

    if !prefix.is_empty() {
        append_dir(&mut builder, &format!("{prefix}/"))?;
    }
    for entry in entries {
        let name = join(prefix, &entry.name);
        if entry.is_dir {
            append_dir(&mut builder, &format!("{name}/"))?;
        } else {
            let data = std::fs::read(&entry.path)?;
            let mut header = base_header(EntryType::Regular, file_mode(&entry.path)?);
            header.set_size(data.len() as u64);
            builder.append_data(&mut header, name, data.as_slice())?;
        }
    }
    builder.into_inner()
}

fn append_dir<W: Write>(builder: &mut Builder<W>, name: &str) -> io::Result<()> {
    let mut header = base_header(EntryType::Directory, 0o755);
    header.set_size(0);
    builder.append_data(&mut header, name, io::empty())
}

fn base_header(kind: EntryType, mode: u32) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(kind);
    header.set_mode(mode);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header
}

#[cfg(unix)]
fn file_mode(path: &Path) -> io::Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(path)?.permissions().mode();
    Ok(if mode & 0o111 != 0 { 0o755 } else { 0o644 })
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> io::Result<u32> {
    Ok(0o644)
}
