//! Row encodings for export files

use eyre::{Context, Result, eyre};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// On-disk format of an export partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Header line, then one CSV line per row
    #[default]
    Csv,
    /// One JSON object per line, keyed by column name, no header
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    /// Bytes written at the top of every chunk
    pub fn encode_header(&self, headers: &[String]) -> Result<Vec<u8>> {
        match self {
            ExportFormat::Csv => encode_csv_row(headers),
            ExportFormat::Json => Ok(Vec::new()),
        }
    }

    /// One serialized row including its trailing newline
    pub fn encode_row(&self, headers: &[String], values: &[String]) -> Result<Vec<u8>> {
        match self {
            ExportFormat::Csv => encode_csv_row(values),
            ExportFormat::Json => encode_json_row(headers, values),
        }
    }
}

/// Encode one CSV line terminated by `\n`
///
/// Fields containing the delimiter, a quote, CR or LF are quoted with inner
/// quotes doubled; everything else is written verbatim.
///
/// # Example
/// ```
/// use crm_migrator::export::encode_csv_row;
///
/// let line = encode_csv_row(&["a".to_string(), "b,c".to_string(), "say \"hi\"".to_string()]).unwrap();
/// assert_eq!(line, b"a,\"b,c\",\"say \"\"hi\"\"\"\n");
/// ```
pub fn encode_csv_row<S: AsRef<[u8]>>(fields: &[S]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());
    writer
        .write_record(fields)
        .context("Failed to encode CSV row")?;
    writer
        .into_inner()
        .map_err(|e| eyre!("Failed to flush CSV row: {}", e.error()))
}

struct JsonRow<'a> {
    headers: &'a [String],
    values: &'a [String],
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.headers.len()))?;
        for (i, header) in self.headers.iter().enumerate() {
            let value = self.values.get(i).map(String::as_str).unwrap_or_default();
            map.serialize_entry(header, value)?;
        }
        map.end()
    }
}

/// Encode one JSON object line, keys in header order
pub fn encode_json_row(headers: &[String], values: &[String]) -> Result<Vec<u8>> {
    let mut line =
        serde_json::to_vec(&JsonRow { headers, values }).context("Failed to encode JSON row")?;
    line.push(b'\n');
    Ok(line)
}
