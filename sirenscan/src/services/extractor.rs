//! Siren setting extractor
//!
//! Walks an unpacked content tree, parses every `carvariations.meta` file and
//! pulls out `(modelName, sirenSettings value)` pairs.
//!
//! Every element of a document is treated as a candidate block: its whole
//! subtree (itself included) is searched for the two fields, and the last
//! occurrence of each wins. A pair nested under several ancestors is therefore
//! reported once per ancestor.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};
use roxmltree::{Document, Node, NodeId, ParsingOptions};
use serde::Serialize;
use sirenscan_common::ScanLimits;
use thiserror::Error;
use walkdir::WalkDir;

/// File name matched during the walk (compared lower-cased)
pub const TARGET_FILE_NAME: &str = "carvariations.meta";

const MODEL_NAME_TAG: &str = "modelName";
const SIREN_SETTINGS_TAG: &str = "sirenSettings";
const SIREN_VALUE_ATTR: &str = "value";

/// Extractor errors that abort a scan
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Scan root does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Scan root exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Matched metadata file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One siren assignment found in a metadata file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Trimmed `modelName` text
    pub model: String,
    /// Raw `sirenSettings` value attribute
    pub siren_id: String,
    /// Top-level folder under the scan root ("" for root-level files)
    pub group: String,
}

impl Record {
    pub fn new(model: impl Into<String>, siren_id: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            siren_id: siren_id.into(),
            group: group.into(),
        }
    }
}

/// Why a metadata file contributed nothing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("undecodable text: {0}")]
    Undecodable(String),

    #[error("malformed markup: {0}")]
    Malformed(String),
}

/// Result of processing one metadata file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Parsed; may hold zero records
    Parsed(Vec<Record>),
    /// Not usable; the scan carries on without it
    Skipped(SkipReason),
}

/// A metadata file left out of the results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Everything one directory scan produced
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Records in traversal order
    pub records: Vec<Record>,
    /// Number of files whose name matched
    pub files_matched: usize,
    /// Matched files that could not be used
    pub skipped: Vec<SkippedFile>,
}

/// Metadata file extractor
pub struct SirenExtractor {
    max_file_bytes: u64,
    max_xml_nodes: u32,
}

impl SirenExtractor {
    pub fn new(limits: &ScanLimits) -> Self {
        Self {
            max_file_bytes: limits.max_meta_file_bytes,
            max_xml_nodes: limits.max_xml_nodes,
        }
    }

    /// Scan a directory tree for siren records
    ///
    /// Entries are visited sorted by file name so that a fixed snapshot
    /// always yields the same record order. Unreadable directory entries are
    /// logged and skipped; an unreadable metadata file aborts the scan.
    pub fn extract(&self, root: &Path) -> Result<Extraction, ExtractError> {
        if !root.exists() {
            return Err(ExtractError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ExtractError::NotADirectory(root.to_path_buf()));
        }

        let mut extraction = Extraction::default();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !is_target_file(entry.file_name()) {
                continue;
            }

            extraction.files_matched += 1;
            let path = entry.path();

            match self.extract_file(root, path)? {
                FileOutcome::Parsed(records) => {
                    tracing::debug!("{}: {} records", path.display(), records.len());
                    extraction.records.extend(records);
                }
                FileOutcome::Skipped(reason) => {
                    tracing::warn!("Skipping {}: {}", path.display(), reason);
                    extraction.skipped.push(SkippedFile {
                        path: path.to_path_buf(),
                        reason,
                    });
                }
            }
        }

        tracing::info!(
            "Extraction complete: {} files matched, {} skipped, {} records",
            extraction.files_matched,
            extraction.skipped.len(),
            extraction.records.len()
        );

        Ok(extraction)
    }

    /// Process one metadata file located somewhere under `root`
    pub fn extract_file(&self, root: &Path, path: &Path) -> Result<FileOutcome, ExtractError> {
        let read_err = |source| ExtractError::Read {
            path: path.to_path_buf(),
            source,
        };

        let size = fs::metadata(path).map_err(read_err)?.len();
        if size > self.max_file_bytes {
            return Ok(FileOutcome::Skipped(SkipReason::TooLarge {
                size,
                limit: self.max_file_bytes,
            }));
        }

        let bytes = fs::read(path).map_err(read_err)?;
        let text = match decode_text(&bytes) {
            Ok(text) => text,
            Err(reason) => return Ok(FileOutcome::Skipped(reason)),
        };

        let group = top_level_group(root, path);
        match parse_records(&text, &group, self.max_xml_nodes) {
            Ok(records) => Ok(FileOutcome::Parsed(records)),
            Err(e) => Ok(FileOutcome::Skipped(SkipReason::Malformed(e.to_string()))),
        }
    }
}

impl Default for SirenExtractor {
    fn default() -> Self {
        Self::new(&ScanLimits::default())
    }
}

/// Scan a directory with default limits
pub fn extract_records(root: &Path) -> Result<Vec<Record>, ExtractError> {
    SirenExtractor::default().extract(root).map(|e| e.records)
}

/// Case-insensitive match against [`TARGET_FILE_NAME`]
pub fn is_target_file(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().to_lowercase() == TARGET_FILE_NAME
}

/// First path component of `file` relative to `root`
///
/// Files directly under the root have no group and yield "".
pub fn top_level_group(root: &Path, file: &Path) -> String {
    let Ok(relative) = file.strip_prefix(root) else {
        return String::new();
    };

    let mut components = relative.components();
    match (components.next(), components.next()) {
        (Some(first), Some(_)) => first.as_os_str().to_string_lossy().into_owned(),
        _ => String::new(),
    }
}

/// Whether a siren value names an actual siren ("0" means none)
pub fn is_active_siren(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed != "0"
}

/// Decode file bytes
///
/// A byte order mark takes precedence. Without one the bytes must be UTF-8,
/// unless the XML declaration names another encoding.
fn decode_text(bytes: &[u8]) -> Result<String, SkipReason> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return decode_with(encoding, &bytes[bom_len..]);
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_owned()),
        Err(utf8_err) => match declared_encoding(bytes) {
            Some(encoding) if encoding != UTF_8 => decode_with(encoding, bytes),
            _ => Err(SkipReason::Undecodable(utf8_err.to_string())),
        },
    }
}

fn decode_with(encoding: &'static Encoding, bytes: &[u8]) -> Result<String, SkipReason> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned)
        .ok_or_else(|| SkipReason::Undecodable(format!("invalid {} sequence", encoding.name())))
}

/// Encoding named by a leading `<?xml ... encoding="..."?>` declaration
fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let decl = bytes.strip_prefix(b"<?xml")?;
    let end = decl.windows(2).position(|w| w == b"?>")?;
    let decl = &decl[..end];

    let key = decl.windows(8).position(|w| w == b"encoding")?;
    let rest = skip_whitespace(skip_whitespace(&decl[key + 8..]).strip_prefix(b"=")?);

    let (&quote, rest) = rest.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let len = rest.iter().position(|&b| b == quote)?;

    Encoding::for_label(&rest[..len])
}

fn skip_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    &bytes[start..]
}

/// Last-seen field values within one element's subtree
#[derive(Clone, Default)]
struct Found<'a> {
    model: Option<Cow<'a, str>>,
    siren: Option<&'a str>,
}

/// Parse one metadata document and emit its records in document order
///
/// For each element the subtree is searched in document order, so the value
/// that counts is the last one. That is computed bottom-up in a single pass:
/// a node inherits from its last child that found something, and only falls
/// back to itself when no descendant matched.
pub fn parse_records(xml: &str, group: &str, max_nodes: u32) -> Result<Vec<Record>, roxmltree::Error> {
    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    options.nodes_limit = max_nodes;

    let doc = Document::parse_with_options(xml, options)?;

    let elements: Vec<Node> = doc
        .root_element()
        .descendants()
        .filter(Node::is_element)
        .collect();

    let mut found: HashMap<NodeId, Found> = HashMap::with_capacity(elements.len());

    // Reverse document order visits every child before its parent
    for node in elements.iter().rev() {
        let mut here = Found::default();

        for child in node.children().filter(Node::is_element) {
            if let Some(child_found) = found.get(&child.id()) {
                if child_found.model.is_some() {
                    here.model = child_found.model.clone();
                }
                if child_found.siren.is_some() {
                    here.siren = child_found.siren;
                }
            }
        }

        if here.model.is_none() && is_tag(node, MODEL_NAME_TAG) {
            here.model = Some(model_text(node));
        }
        if here.siren.is_none() && is_tag(node, SIREN_SETTINGS_TAG) {
            here.siren = node.attribute(SIREN_VALUE_ATTR);
        }

        found.insert(node.id(), here);
    }

    let records = elements
        .iter()
        .filter_map(|node| found.get(&node.id()))
        .filter_map(|f| match (&f.model, f.siren) {
            (Some(model), Some(siren)) if !model.is_empty() && is_active_siren(siren) => {
                Some(Record::new(model.to_string(), siren, group))
            }
            _ => None,
        })
        .collect();

    Ok(records)
}

fn is_tag(node: &Node, name: &str) -> bool {
    node.tag_name().namespace().is_none() && node.tag_name().name() == name
}

/// Trimmed text before the first child element
///
/// Comments and processing instructions are dropped, so text on either side
/// of a comment is joined.
fn model_text<'a>(node: &Node<'a, '_>) -> Cow<'a, str> {
    let mut texts = node
        .children()
        .take_while(|child| !child.is_element())
        .filter(Node::is_text)
        .filter_map(|child| child.text());

    let Some(first) = texts.next() else {
        return Cow::Borrowed("");
    };

    match texts.next() {
        None => Cow::Borrowed(first.trim()),
        Some(second) => {
            let mut joined = String::from(first);
            joined.push_str(second);
            joined.extend(texts);
            Cow::Owned(joined.trim().to_owned())
        }
    }
}
