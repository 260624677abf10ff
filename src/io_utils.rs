//! I/O utilities for table reading, writing, encoding, and delimiter resolution.
//!
//! All file I/O in geoname-match flows through this module:
//!
//! - **Input validation**: paths must name an existing `.csv` or `.tsv` file.
//! - **Delimiter resolution**: extension-based detection (`.csv` → comma,
//!   `.tsv` → tab) with manual override support.
//! - **Encoding**: input decoding and output transcoding via `encoding_rs`,
//!   defaulting to UTF-8.
//! - **Output**: whole tables are rendered to memory and transcoded once,
//!   since the pipeline never streams.

use std::{
    fs::{self, File},
    io::{BufReader, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, bail};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use sha2::{Digest, Sha256};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

const ACCEPTED_EXTENSIONS: &[&str] = &["csv", "tsv"];

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn resolve_output_delimiter(provided: Option<u8>, fallback: u8) -> u8 {
    provided.unwrap_or(fallback)
}

/// Rejects paths that do not name an existing table file with a supported extension.
pub fn validate_input_path(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!("Not a valid filename: {path:?}");
    }
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension {
        Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(anyhow!(
            "Filename {path:?} does not end in one of: {}",
            ACCEPTED_EXTENSIONS
                .iter()
                .map(|ext| format!(".{ext}"))
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path, delimiter: u8) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    Ok(open_csv_reader(BufReader::new(file), delimiter))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    decode_record(&headers, encoding)
}

/// Serializes `headers` and `rows` as delimited text in the requested encoding.
pub fn render_csv(
    headers: &[String],
    rows: &[Vec<String>],
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Vec<u8>> {
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    let mut writer = builder.from_writer(Vec::new());
    writer
        .write_record(headers)
        .context("Writing output headers")?;
    for row in rows {
        writer.write_record(row).context("Writing output row")?;
    }
    let buffer = writer
        .into_inner()
        .map_err(|err| anyhow!("Flushing output buffer: {}", err.error()))?;
    if encoding == UTF_8 {
        return Ok(buffer);
    }
    let text = String::from_utf8(buffer).context("Output buffer is not valid UTF-8")?;
    encode_text(&text, encoding)
}

pub fn encode_text(text: &str, encoding: &'static Encoding) -> Result<Vec<u8>> {
    let (encoded, _, had_errors) = encoding.encode(text);
    if had_errors {
        bail!("Failed to encode text using {}", encoding.name());
    }
    Ok(encoded.into_owned())
}

pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
    file.write_all(bytes)
        .with_context(|| format!("Writing output file {path:?}"))?;
    file.flush()?;
    Ok(())
}

/// Appends `extension` to an extensionless output stem.
pub fn with_suffix(stem: &Path, extension: &str) -> PathBuf {
    let mut raw = stem.as_os_str().to_os_string();
    raw.push(".");
    raw.push(extension);
    PathBuf::from(raw)
}

/// Hex SHA-256 of a file's bytes, used to identify inputs in the summary.
pub fn file_digest(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Reading {path:?} for digest"))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

pub fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
