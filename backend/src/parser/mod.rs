//! CSV reader for the JHU time-series layout, with encoding and delimiter
//! auto-detection.
//!
//! Produces a [`ParseResult`]: header names plus string cells. Rows whose field
//! count does not match the header are skipped and reported, never fatal.
//! Typing the cells is left to the fetch and county-map layers.

use std::path::Path;

use crate::error::{FetchError, FetchResult};

/// A data line dropped while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number in the source (header is line 1)
    pub line: u64,
    pub reason: String,
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Column headers
    pub headers: Vec<String>,
    /// Data rows, each exactly `headers.len()` cells
    pub rows: Vec<Vec<String>>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Malformed lines that were dropped
    pub skipped: Vec<SkippedLine>,
}

impl ParseResult {
    /// Position of a header, exact match.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Position of a header, or [`FetchError::MissingColumn`].
    pub fn require_column(&self, name: &str) -> FetchResult<usize> {
        self.column_index(name)
            .ok_or_else(|| FetchError::MissingColumn(name.to_string()))
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the given encoding.
///
/// Labels `encoding_rs` does not know are read as UTF-8. Bytes that are not
/// valid in the chosen encoding fail with [`FetchError::Decode`].
pub fn decode_content(bytes: &[u8], encoding: &str) -> FetchResult<String> {
    let label = encoding.to_lowercase();
    let decoder = match label.as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15,
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252,
        other => encoding_rs::Encoding::for_label(other.as_bytes()).unwrap_or(encoding_rs::UTF_8),
    };

    let (text, _, had_errors) = decoder.decode(bytes);
    if had_errors {
        return Err(FetchError::Decode(format!(
            "{} bytes are not valid {}",
            bytes.len(),
            decoder.name()
        )));
    }
    Ok(text.into_owned())
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text with an explicit delimiter.
///
/// Quoted fields (`"Korea, South"`) are kept whole. Blank lines are ignored.
pub fn parse_str(content: &str, delimiter: char, encoding: String) -> FetchResult<ParseResult> {
    if content.trim().is_empty() {
        return Err(FetchError::EmptyCsv);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| FetchError::Header(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(FetchError::EmptyCsv);
    }

    let mut rows = Vec::new();
    let mut skipped = Vec::new();

    for result in reader.records() {
        match result {
            Ok(record) if record.len() == headers.len() => {
                rows.push(record.iter().map(|c| c.to_string()).collect());
            }
            Ok(record) => skipped.push(SkippedLine {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                reason: format!("expected {} fields, found {}", headers.len(), record.len()),
            }),
            Err(e) => skipped.push(SkippedLine {
                line: e.position().map(|p| p.line()).unwrap_or(0),
                reason: e.to_string(),
            }),
        }
    }

    Ok(ParseResult {
        headers,
        rows,
        encoding,
        delimiter,
        skipped,
    })
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> FetchResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    parse_str(&content, delimiter, encoding)
}

/// Parse a local CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> FetchResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_quoted_entity_keeps_comma() {
        let csv = "Province/State,Country/Region,Lat,Long,1/22/20\n,\"Korea, South\",35.9,127.7,0\n";
        let result = parse_bytes_auto(csv.as_bytes()).unwrap();

        assert_eq!(result.delimiter, ',');
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0][1], "Korea, South");
        assert_eq!(result.rows[0][4], "0");
    }

    #[test]
    fn test_malformed_row_skipped() {
        let csv = "a,b,c\n1,2,3\n4,5\n6,7,8,9\n10,11,12\n";
        let result = parse_str(csv, ',', "utf-8".into()).unwrap();

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[1], vec!["10", "11", "12"]);
        assert_eq!(result.skipped.len(), 2);
        assert_eq!(result.skipped[0].line, 3);
        assert!(result.skipped[0].reason.contains("expected 3"));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let csv = "a;b\n1;2\n\n3;4\n";
        let result = parse_str(csv, ';', "utf-8".into()).unwrap();

        assert_eq!(result.rows.len(), 2);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_empty_csv_error() {
        let err = parse_bytes_auto(b"").unwrap_err();
        assert!(matches!(err, FetchError::EmptyCsv));
    }

    #[test]
    fn test_require_column() {
        let result = parse_str("Lat,Long_\n1,2\n", ',', "utf-8".into()).unwrap();
        assert_eq!(result.require_column("Long_").unwrap(), 1);
        assert!(matches!(
            result.require_column("Admin2"),
            Err(FetchError::MissingColumn(c)) if c == "Admin2"
        ));
    }

    #[test]
    fn test_detect_delimiter_comma() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
    }

    #[test]
    fn test_detect_delimiter_semicolon() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
    }

    #[test]
    fn test_detect_delimiter_tab() {
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Curaçao" in ISO-8859-1
        let bytes: &[u8] = &[0x43, 0x75, 0x72, 0x61, 0xE7, 0x61, 0x6F];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Curaçao");
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let bytes: &[u8] = &[0x61, 0x2C, 0x62, 0x0A, 0xFF, 0xFE, 0x2C, 0x31];
        let err = decode_content(bytes, "utf-8").unwrap_err();
        assert!(matches!(err, FetchError::Decode(ref m) if m.contains("UTF-8")));
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Country/Region,1/22/20,1/23/20\nItaly,0,1\n").unwrap();

        let result = parse_csv_file_auto(file.path()).unwrap();
        assert_eq!(result.headers, vec!["Country/Region", "1/22/20", "1/23/20"]);
        assert_eq!(result.rows, vec![vec!["Italy", "0", "1"]]);
    }
}
