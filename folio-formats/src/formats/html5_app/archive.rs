//! Zip inspection and assembly for packaged apps

use crate::error::FormatError;
use serde::Deserialize;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const INDEX_FILE: &str = "index.html";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Largest manifest we are willing to read into memory
const MANIFEST_LIMIT: u64 = 64 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub entry_point: Option<String>,
}

impl Manifest {
    pub fn display_name(&self) -> Option<&str> {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
    /// Name escapes the archive root (absolute, `..`, drive prefix)
    pub unsafe_path: bool,
}

/// What an archive contains, read without extracting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppArchive {
    pub entries: Vec<ArchiveEntry>,
    pub manifest: Option<Manifest>,
    /// Manifest present but unreadable
    pub manifest_error: Option<String>,
    pub entry_point: Option<String>,
    /// Declared `entryPoint` missing from the archive
    pub dangling_entry_point: Option<String>,
}

impl AppArchive {
    pub fn files(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries.iter().filter(|entry| !entry.name.ends_with('/'))
    }

    pub fn total_size(&self) -> u64 {
        self.files().map(|entry| entry.size).sum()
    }

    pub fn unsafe_entries(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries.iter().filter(|entry| entry.unsafe_path)
    }

    fn has_file(&self, name: &str) -> bool {
        self.files().any(|entry| entry.name == name)
    }

    /// The one directory every file lives under, if there is exactly one
    fn single_root(&self) -> Option<&str> {
        let mut roots = self.files().map(|entry| entry.name.split_once('/').map(|(root, _)| root));
        let first = roots.next()??;
        roots.all(|root| root == Some(first)).then_some(first)
    }
}

pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(b"PK\x05\x06")
}

/// List entries, read the manifest and resolve the entry point.
pub fn inspect(bytes: &[u8]) -> Result<AppArchive, FormatError> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| FormatError::ParseError(format!("not a zip archive: {err}")))?;

    let mut app = AppArchive::default();
    let mut manifest_index = None;
    for idx in 0..zip.len() {
        let file = zip
            .by_index_raw(idx)
            .map_err(|err| FormatError::ParseError(format!("corrupt zip entry {idx}: {err}")))?;
        let name = file.name().to_string();
        if name == MANIFEST_FILE || name.split_once('/').map(|(_, rest)| rest) == Some(MANIFEST_FILE) {
            manifest_index.get_or_insert(idx);
        }
        app.entries.push(ArchiveEntry {
            unsafe_path: file.enclosed_name().is_none(),
            size: file.size(),
            name,
        });
    }

    if let Some(idx) = manifest_index {
        match read_manifest(&mut zip, idx) {
            Ok(manifest) => app.manifest = Some(manifest),
            Err(err) => app.manifest_error = Some(err),
        }
    }

    app.entry_point = resolve_entry_point(&mut app);
    Ok(app)
}

fn read_manifest(zip: &mut ZipArchive<Cursor<&[u8]>>, idx: usize) -> Result<Manifest, String> {
    let file = zip.by_index(idx).map_err(|err| err.to_string())?;
    if file.size() > MANIFEST_LIMIT {
        return Err(format!("manifest is larger than {MANIFEST_LIMIT} bytes"));
    }
    let mut text = String::new();
    file.take(MANIFEST_LIMIT)
        .read_to_string(&mut text)
        .map_err(|err| err.to_string())?;
    serde_json::from_str(&text).map_err(|err| err.to_string())
}

fn resolve_entry_point(app: &mut AppArchive) -> Option<String> {
    let root = app.single_root().map(str::to_string);
    let prefixed = |name: &str| match &root {
        Some(root) => format!("{root}/{name}"),
        None => name.to_string(),
    };

    if let Some(declared) = app.manifest.as_ref().and_then(|m| m.entry_point.clone()) {
        let declared = declared.trim_start_matches("./").to_string();
        for candidate in [declared.clone(), prefixed(&declared)] {
            if app.has_file(&candidate) {
                return Some(candidate);
            }
        }
        app.dangling_entry_point = Some(declared);
    }

    [INDEX_FILE.to_string(), prefixed(INDEX_FILE)]
        .into_iter()
        .find(|candidate| app.has_file(candidate))
}

/// Build a deflated archive from `(name, bytes)` pairs, in the given order.
pub fn build<'a, I>(files: I) -> Result<Vec<u8>, FormatError>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in files {
        writer
            .start_file(name, options)
            .map_err(|err| FormatError::SerializationError(format!("{name}: {err}")))?;
        writer
            .write_all(bytes)
            .map_err(|err| FormatError::SerializationError(format!("{name}: {err}")))?;
    }
    let cursor = writer
        .finish()
        .map_err(|err| FormatError::SerializationError(err.to_string()))?;
    Ok(cursor.into_inner())
}
