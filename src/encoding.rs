//! BOM-safe, multi-encoding file read/write.
//!
//! Mirrors `_read_file_bom_safe`/`_write_file_bom_safe` and `patch_edit`'s
//! encoding ladder in the original Python implementation: try a fixed list
//! of encodings in order, remember which one worked, and write back in the
//! same encoding. A missing file reads as empty content under UTF-8.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8 { bom: bool },
    Utf16Be,
    Utf16Le,
    Ascii,
    Cp1252,
    Iso8859_1,
}

impl Encoding {
    fn label(self) -> &'static str {
        match self {
            Encoding::Utf8 { .. } => "utf-8",
            Encoding::Utf16Be => "utf-16",
            Encoding::Utf16Le => "utf-16le",
            Encoding::Ascii => "ascii",
            Encoding::Cp1252 => "cp1252",
            Encoding::Iso8859_1 => "iso-8859-1",
        }
    }
}

pub struct DecodedFile {
    pub content: String,
    pub encoding: Encoding,
}

/// Read `path`, trying encodings in the order the specification lists. A
/// nonexistent path decodes as empty UTF-8 content, matching `patch`'s
/// new-file-creation path.
pub fn read_file(path: &Path) -> Result<DecodedFile> {
    if !path.exists() {
        return Ok(DecodedFile {
            content: String::new(),
            encoding: Encoding::Utf8 { bom: false },
        });
    }
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    decode(&bytes).with_context(|| {
        format!(
            "Unable to read existing file with any of the attempted encodings: {}",
            ["utf-8", "utf-16", "utf-16le", "ascii", "cp1252", "iso-8859-1"].join(", ")
        )
    })
}

pub fn decode(bytes: &[u8]) -> Result<DecodedFile> {
    if let Some(rest) = bytes.strip_prefix(b"\xef\xbb\xbf") {
        if let Ok(s) = std::str::from_utf8(rest) {
            return Ok(DecodedFile {
                content: s.to_string(),
                encoding: Encoding::Utf8 { bom: true },
            });
        }
    }
    if let Ok(s) = std::str::from_utf8(bytes) {
        return Ok(DecodedFile {
            content: s.to_string(),
            encoding: Encoding::Utf8 { bom: false },
        });
    }
    if bytes.starts_with(&[0xFE, 0xFF]) || (bytes.len() % 2 == 0 && looks_like_utf16be(bytes)) {
        let (cow, _, had_errors) = encoding_rs::UTF_16BE.decode(bytes);
        if !had_errors {
            return Ok(DecodedFile {
                content: cow.into_owned(),
                encoding: Encoding::Utf16Be,
            });
        }
    }
    if bytes.starts_with(&[0xFF, 0xFE]) || bytes.len() % 2 == 0 {
        let (cow, _, had_errors) = encoding_rs::UTF_16LE.decode(bytes);
        if !had_errors {
            return Ok(DecodedFile {
                content: cow.into_owned(),
                encoding: Encoding::Utf16Le,
            });
        }
    }
    if bytes.is_ascii() {
        return Ok(DecodedFile {
            content: String::from_utf8_lossy(bytes).into_owned(),
            encoding: Encoding::Ascii,
        });
    }
    let (cow, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
    if !had_errors {
        return Ok(DecodedFile {
            content: cow.into_owned(),
            encoding: Encoding::Cp1252,
        });
    }
    // ISO-8859-1 (Latin-1) maps every byte to a codepoint, so it never errors;
    // it is deliberately the last resort.
    let content: String = bytes.iter().map(|&b| b as char).collect();
    Ok(DecodedFile {
        content,
        encoding: Encoding::Iso8859_1,
    })
}

fn looks_like_utf16be(bytes: &[u8]) -> bool {
    // Heuristic: in ASCII-range UTF-16BE text every even byte is zero.
    bytes.len() >= 4 && bytes.chunks_exact(2).take(8).all(|pair| pair[0] == 0)
}

/// Write `content` back to `path` in `encoding`, creating parent directories
/// as needed.
pub fn write_file(path: &Path, content: &str, encoding: Encoding) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    let bytes: Vec<u8> = match encoding {
        Encoding::Utf8 { bom: true } => {
            let mut v = b"\xef\xbb\xbf".to_vec();
            v.extend_from_slice(content.as_bytes());
            v
        }
        Encoding::Utf8 { bom: false } | Encoding::Ascii => content.as_bytes().to_vec(),
        Encoding::Utf16Be => encoding_rs::UTF_16BE.encode(content).0.into_owned(),
        Encoding::Utf16Le => encoding_rs::UTF_16LE.encode(content).0.into_owned(),
        Encoding::Cp1252 => encoding_rs::WINDOWS_1252.encode(content).0.into_owned(),
        Encoding::Iso8859_1 => content.chars().map(|c| c as u8).collect(),
    };
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_utf8() {
        let d = decode("x = 1\n".as_bytes()).unwrap();
        assert_eq!(d.content, "x = 1\n");
        assert_eq!(d.encoding, Encoding::Utf8 { bom: false });
    }

    #[test]
    fn decodes_utf8_bom() {
        let mut bytes = b"\xef\xbb\xbf".to_vec();
        bytes.extend_from_slice(b"x = 1\n");
        let d = decode(&bytes).unwrap();
        assert_eq!(d.content, "x = 1\n");
        assert_eq!(d.encoding, Encoding::Utf8 { bom: true });
    }

    #[test]
    fn round_trips_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.py");
        write_file(&path, "x = 1\n", Encoding::Utf8 { bom: true }).unwrap();
        let d = read_file(&path).unwrap();
        assert_eq!(d.content, "x = 1\n");
        assert_eq!(d.encoding, Encoding::Utf8 { bom: true });
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.py");
        let d = read_file(&path).unwrap();
        assert_eq!(d.content, "");
        assert_eq!(d.encoding, Encoding::Utf8 { bom: false });
    }
}
