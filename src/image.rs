//! Program image files for LEAP16.
//!
//! Two on-disk formats carry the same thing, an ordered list of words
//! loaded verbatim at address 0x0000:
//! - Binary: two bytes per word, big-endian unless told otherwise
//! - Hex text: one word per line as up to four hex digits, optional `0x`
//!   prefix; `;` starts a comment and blank lines are ignored

use serde::{Serialize, Deserialize};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// On-disk image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Binary,
    Hex,
}

impl ImageFormat {
    /// Guess the format from a file extension: `.hex` and `.txt` are text,
    /// anything else is binary.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("hex") || ext.eq_ignore_ascii_case("txt") => {
                ImageFormat::Hex
            }
            _ => ImageFormat::Binary,
        }
    }
}

/// Byte order of words in a binary image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

/// Split a byte stream into words.
pub fn words_from_bytes(bytes: &[u8], order: ByteOrder) -> Result<Vec<u16>, ImageError> {
    if bytes.len() % 2 != 0 {
        return Err(ImageError::OddLength(bytes.len()));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| {
            let pair = [pair[0], pair[1]];
            match order {
                ByteOrder::Big => u16::from_be_bytes(pair),
                ByteOrder::Little => u16::from_le_bytes(pair),
            }
        })
        .collect())
}

/// Flatten words into a byte stream.
pub fn words_to_bytes(words: &[u16], order: ByteOrder) -> Vec<u8> {
    words
        .iter()
        .flat_map(|w| match order {
            ByteOrder::Big => w.to_be_bytes(),
            ByteOrder::Little => w.to_le_bytes(),
        })
        .collect()
}

/// Parse hex text into words.
pub fn parse_hex(source: &str) -> Result<Vec<u16>, ImageError> {
    let mut words = Vec::new();

    for (line_num, line) in source.lines().enumerate() {
        let code = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let trimmed = code.trim();

        // Skip empty lines and comments
        if trimmed.is_empty() {
            continue;
        }

        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.is_empty() || digits.len() > 4 {
            return Err(ImageError::Parse {
                line: line_num + 1,
                message: format!("expected 1 to 4 hex digits, found {:?}", trimmed),
            });
        }

        let word = u16::from_str_radix(digits, 16).map_err(|e| ImageError::Parse {
            line: line_num + 1,
            message: format!("{:?}: {}", trimmed, e),
        })?;

        words.push(word);
    }

    Ok(words)
}

/// Render words as hex text, one per line, with the address as a comment.
pub fn format_hex(words: &[u16]) -> String {
    let mut out = String::new();
    out.push_str("; LEAP16 program image\n");
    out.push_str(&format!("; {} words\n\n", words.len()));

    for (addr, word) in words.iter().enumerate() {
        out.push_str(&format!("{:04X} ; {:04X}\n", word, addr));
    }

    out
}

/// Load an image from disk.
pub fn load_image<P: AsRef<Path>>(
    path: P,
    format: ImageFormat,
    order: ByteOrder,
) -> Result<Vec<u16>, ImageError> {
    match format {
        ImageFormat::Binary => {
            let bytes = std::fs::read(path.as_ref())?;
            words_from_bytes(&bytes, order)
        }
        ImageFormat::Hex => {
            let source = std::fs::read_to_string(path.as_ref())?;
            parse_hex(&source)
        }
    }
}

/// Save an image to disk.
pub fn save_image<P: AsRef<Path>>(
    path: P,
    words: &[u16],
    format: ImageFormat,
    order: ByteOrder,
) -> Result<(), ImageError> {
    let mut file = std::fs::File::create(path.as_ref())?;

    match format {
        ImageFormat::Binary => file.write_all(&words_to_bytes(words, order))?,
        ImageFormat::Hex => file.write_all(format_hex(words).as_bytes())?,
    }

    Ok(())
}

/// Errors that can occur while reading or writing images.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("binary image has odd length {0}; words are two bytes")]
    OddLength(usize),
}
