use std::io::Write;

use crate::errors::Result;
use crate::model::ClassifiedReading;

/// An encoded tabular file ready to stream to the client.
pub struct Sheet {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub extension: &'static str,
}

/// Turns history rows into a downloadable tabular file. The route only
/// cares about bytes and content type, so encoders are swappable.
pub trait SheetEncoder: Send + Sync {
    fn encode(&self, rows: &[ClassifiedReading]) -> Result<Sheet>;
}

/// CSV encoder, one header row plus one row per sample. Spreadsheet
/// applications open it directly.
pub struct CsvEncoder;

impl SheetEncoder for CsvEncoder {
    fn encode(&self, rows: &[ClassifiedReading]) -> Result<Sheet> {
        let mut out = Vec::new();
        writeln!(out, "timestamp,smoke,temperature,humidity,status,level")?;
        for row in rows {
            writeln!(
                out,
                "{},{},{:.1},{:.1},{},{}",
                row.reading.timestamp,
                row.reading.smoke,
                row.reading.temperature,
                row.reading.humidity,
                row.status.as_str(),
                row.status.level(),
            )?;
        }
        Ok(Sheet {
            bytes: out,
            content_type: "text/csv",
            extension: "csv",
        })
    }
}
