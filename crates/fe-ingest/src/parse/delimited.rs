//! Header-plus-rows listings with comma separated, space padded fields.

use super::Artifact;
use crate::error::IngestResult;
use fe_core::EngineId;

#[derive(Debug)]
pub struct DelimitedTable<'a> {
    header_line: usize,
    headers: Vec<&'a str>,
    rows: Vec<Row<'a>>,
}

#[derive(Debug)]
pub struct Row<'a> {
    pub line: usize,
    fields: Vec<&'a str>,
}

impl<'a> DelimitedTable<'a> {
    /// The first non-blank line is the header; every later non-blank line
    /// must have at least as many fields.
    pub fn parse(artifact: &Artifact<'a>) -> IngestResult<Self> {
        let mut lines = artifact.lines().filter(|(_, l)| !l.trim().is_empty());

        let Some((header_line, header)) = lines.next() else {
            return Err(artifact.error(1, "listing is empty; expected a header row"));
        };
        let headers: Vec<&str> = split(header);

        let mut rows = Vec::new();
        for (line, text) in lines {
            let fields = split(text);
            if fields.len() < headers.len() {
                return Err(artifact.error(
                    line,
                    format!(
                        "expected {} fields, found {}: {:?}",
                        headers.len(),
                        fields.len(),
                        text.trim()
                    ),
                ));
            }
            rows.push(Row { line, fields });
        }

        Ok(Self {
            header_line,
            headers,
            rows,
        })
    }

    pub fn column(&self, artifact: &Artifact<'_>, name: &str) -> IngestResult<usize> {
        self.optional_column(name).ok_or_else(|| {
            artifact.error(
                self.header_line,
                format!("missing column {name} in header {:?}", self.headers.join(",")),
            )
        })
    }

    pub fn optional_column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    pub fn rows(&self) -> &[Row<'a>] {
        &self.rows
    }
}

impl<'a> Row<'a> {
    pub fn text(&self, column: usize) -> &'a str {
        self.fields.get(column).copied().unwrap_or("")
    }

    pub fn number(&self, artifact: &Artifact<'_>, column: usize, name: &str) -> IngestResult<f64> {
        artifact.number(self.line, self.text(column), name)
    }

    pub fn id(&self, artifact: &Artifact<'_>, column: usize, name: &str) -> IngestResult<EngineId> {
        artifact.id(self.line, self.text(column), name)
    }
}

fn split(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use std::path::Path;

    #[test]
    fn reads_padded_rows() {
        let text = "NODE , UX , UY\n\n  3 , 0.1 , -2.5E-02\n  4,1,2\n";
        let artifact = Artifact::new("d.txt", Path::new("d.txt"), text);
        let table = DelimitedTable::parse(&artifact).unwrap();

        let node = table.column(&artifact, "NODE").unwrap();
        let uy = table.column(&artifact, "uy").unwrap();
        assert_eq!(table.rows().len(), 2);

        let first = &table.rows()[0];
        assert_eq!(first.line, 3);
        assert_eq!(first.id(&artifact, node, "NODE").unwrap().get(), 3);
        assert_eq!(first.number(&artifact, uy, "UY").unwrap(), -0.025);
    }

    #[test]
    fn missing_column_points_at_header() {
        let artifact = Artifact::new("d.txt", Path::new("/w/d.txt"), "A,B\n1,2\n");
        let table = DelimitedTable::parse(&artifact).unwrap();
        match table.column(&artifact, "C") {
            Err(IngestError::Parse { file, line, .. }) => {
                assert_eq!(file, "d.txt");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn short_row_is_rejected() {
        let artifact = Artifact::new("d.txt", Path::new("d.txt"), "A,B,C\n1,2\n");
        assert!(matches!(
            DelimitedTable::parse(&artifact),
            Err(IngestError::Parse { line: 2, .. })
        ));
    }
}
