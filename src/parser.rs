//! Line-oriented tokenizer for exported analytics files.
//!
//! Blank lines are dropped, the first remaining line is the
//! header row and every other line is split on the same delimiter and zipped
//! against the headers by position. Embedded delimiters inside quoted cells
//! are **not** supported; a cell such as `"Harare, Zimbabwe"` is split in two.

use std::collections::HashMap;

use crate::error::StructuralError;

/// A parsed document: ordered headers plus rows padded or truncated to the
/// header width.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    lookup: HashMap<String, usize>,
}

/// Borrowed view of one data row, addressable by header name.
#[derive(Debug, Clone, Copy)]
pub struct RawRow<'a> {
    doc: &'a RawDocument,
    values: &'a [String],
}

impl RawDocument {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        let mut lookup = HashMap::with_capacity(width);
        for (idx, header) in headers.iter().enumerate() {
            lookup.entry(header.to_lowercase()).or_insert(idx);
        }
        Self {
            headers,
            rows,
            lookup,
        }
    }

    /// A document that has headers but no data rows.
    pub fn header_only(headers: Vec<String>) -> Self {
        Self::new(headers, Vec::new())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = RawRow<'_>> {
        self.rows.iter().map(move |values| RawRow { doc: self, values })
    }

    fn column(&self, header: &str) -> Option<usize> {
        self.lookup.get(&header.to_lowercase()).copied()
    }
}

impl<'a> RawRow<'a> {
    /// Cell under `header` (case-insensitive); `None` when the column is absent.
    pub fn get(&self, header: &str) -> Option<&'a str> {
        self.doc
            .column(header)
            .and_then(|idx| self.values.get(idx))
            .map(String::as_str)
    }

    pub fn values(&self) -> &'a [String] {
        self.values
    }

    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|v| v.is_empty())
    }
}

/// Splits `text` into a [`RawDocument`].
///
/// Fails with [`StructuralError::Empty`] when there is no non-blank line, and
/// with [`StructuralError::HeaderOnly`] when only the header row is present.
/// The latter carries the headers so a caller can still classify the file.
pub fn parse_document(text: &str, delimiter: u8) -> Result<RawDocument, StructuralError> {
    let delimiter = delimiter as char;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let header_line = lines.next().ok_or(StructuralError::Empty)?;
    let headers = split_line(header_line, delimiter);
    let rows = lines
        .map(|line| split_line(line, delimiter))
        .collect::<Vec<_>>();

    if rows.is_empty() {
        return Err(StructuralError::HeaderOnly { headers });
    }
    Ok(RawDocument::new(headers, rows))
}

fn split_line(line: &str, delimiter: char) -> Vec<String> {
    line.split(delimiter).map(clean_token).collect()
}

fn clean_token(token: &str) -> String {
    let mut current = token.trim();
    loop {
        let stripped = ['"', '\''].iter().find_map(|quote| {
            current
                .strip_prefix(*quote)
                .and_then(|rest| rest.strip_suffix(*quote))
        });
        match stripped {
            Some(inner) => current = inner.trim(),
            None => break,
        }
    }
    current.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_document_trims_and_strips_quotes() {
        let doc = parse_document("\"Date\", 'Likes' \n\"October 14\" , 80\n", b',').unwrap();
        assert_eq!(doc.headers(), &["Date".to_string(), "Likes".to_string()]);
        let row = doc.rows().next().unwrap();
        assert_eq!(row.get("date"), Some("October 14"));
        assert_eq!(row.get("LIKES"), Some("80"));
    }

    #[test]
    fn parse_document_pads_short_rows_and_drops_extra_cells() {
        let doc = parse_document("a,b,c\n1\n1,2,3,4\n", b',').unwrap();
        let rows = doc.rows().map(|r| r.values().to_vec()).collect::<Vec<_>>();
        assert_eq!(rows[0], vec!["1", "", ""]);
        assert_eq!(rows[1], vec!["1", "2", "3"]);
    }

    #[test]
    fn parse_document_skips_blank_lines() {
        let doc = parse_document("\n\nGender,Distribution\n\n  \nFemale,55\r\n", b',').unwrap();
        assert_eq!(doc.row_count(), 1);
        assert_eq!(doc.rows().next().unwrap().get("gender"), Some("Female"));
    }

    #[test]
    fn parse_document_reports_structural_errors() {
        assert_eq!(parse_document("   \n\n", b','), Err(StructuralError::Empty));
        assert_eq!(
            parse_document("Gender,Distribution\n", b','),
            Err(StructuralError::HeaderOnly {
                headers: vec!["Gender".into(), "Distribution".into()]
            })
        );
    }

    #[test]
    fn parse_document_does_not_honour_quoted_delimiters() {
        let doc = parse_document("Top territories,Distribution\n\"Harare, Zimbabwe\",3\n", b',')
            .unwrap();
        let row = doc.rows().next().unwrap();
        assert_eq!(row.get("top territories"), Some("\"Harare"));
    }

    #[test]
    fn parse_document_honours_custom_delimiter_and_bom() {
        let doc = parse_document("\u{feff}Hour\tActive followers\n3\t120\n", b'\t').unwrap();
        assert_eq!(doc.headers(), &["Hour".to_string(), "Active followers".to_string()]);
    }
}
