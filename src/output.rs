use std::io::{self, Write};

use serde::Serialize;

use crate::content::FastaEntry;
use crate::download::DownloadReport;
use crate::record::Record;
use crate::search::SearchHits;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_hits(hits: &SearchHits) -> io::Result<()> {
        Self::print_json(hits)
    }

    pub fn print_records(records: &[Record]) -> io::Result<()> {
        Self::print_json(&records)
    }

    pub fn print_record(record: &Record) -> io::Result<()> {
        Self::print_json(record)
    }

    pub fn print_report(report: &DownloadReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_sequences(entries: &[FastaEntry]) -> io::Result<()> {
        Self::print_json(&entries)
    }

    pub fn print_value<T: Serialize>(value: &T) -> io::Result<()> {
        Self::print_json(value)
    }

    pub fn print_text(text: &str) -> io::Result<()> {
        let mut stdout = io::stdout();
        stdout.write_all(text.as_bytes())?;
        if !text.ends_with('\n') {
            stdout.write_all(b"\n")?;
        }
        Ok(())
    }

    fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
