//! Report file parsing
//!
//! **Purpose:** Turn the tab-separated report exports of the eye tracker into
//! typed records.
//!
//! All three report kinds share the same layout: one header line, one tab-separated
//! record per line, a trailing blank line. Decimal columns may use a comma as the
//! fractional separator.

use crate::error::{Error, Result};
use csv::StringRecord;
use std::path::Path;

/// One line of a fixation report
#[derive(Debug, Clone, PartialEq)]
pub struct FixationRecord {
    pub session_label: String,
    pub raw_time: i64,
    pub current_tag: String,
    pub previous_tag: String,
    pub next_tag: String,
    pub duration: i64,
    pub x: f64,
    pub y: f64,
}

/// One line of a message report
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub session_label: String,
    pub raw_time: i64,
    pub message: String,
}

/// One line of a saccade report
#[derive(Debug, Clone, PartialEq)]
pub struct SaccadeRecord {
    pub session_label: String,
    pub raw_time: i64,
    pub start_area: String,
    pub end_area: String,
    pub duration: i64,
    pub amplitude: f64,
    pub angle: f64,
    pub velocity_avg: f64,
    pub velocity_peak: f64,
    pub contains_blink: bool,
}

const FIXATION_FIELDS: usize = 8;
const MESSAGE_FIELDS: usize = 3;
const SACCADE_FIELDS: usize = 10;

/// One data line of a report with its 1-based line number
#[derive(Debug, Clone)]
pub struct ReportLine {
    pub line: usize,
    pub record: StringRecord,
}

/// Tab-separated reader over report content
///
/// The first line is the header. Quotes carry no meaning in the exports and
/// lines may carry more fields than the header names. Blank lines, including
/// the trailing one, are skipped.
pub fn reader(content: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(content.as_bytes())
}

/// Data lines of a report in file order
pub fn read_lines<'a>(content: &'a str, file: &'a Path) -> impl Iterator<Item = Result<ReportLine>> + 'a {
    reader(content).into_records().map(move |result| {
        let record = result.map_err(|err| Error::MalformedRecord {
            file: file.to_path_buf(),
            line: err.position().map_or(0, |p| p.line() as usize),
            reason: err.to_string(),
        })?;
        let line = record.position().map_or(0, |p| p.line() as usize);
        Ok(ReportLine { line, record })
    })
}

/// Parse a decimal that may use a comma as fractional separator
pub fn parse_decimal(field: &str) -> Option<f64> {
    field.trim().replace(',', ".").parse::<f64>().ok()
}

/// Fields of one line together with its error context
struct LineFields<'a> {
    record: &'a StringRecord,
    file: &'a Path,
    line: usize,
}

impl<'a> LineFields<'a> {
    fn new(line: &'a ReportLine, expected: usize, file: &'a Path) -> Result<Self> {
        let found = line.record.len();
        if found < expected {
            return Err(Error::MalformedRecord {
                file: file.to_path_buf(),
                line: line.line,
                reason: format!("expected {} fields, found {}", expected, found),
            });
        }
        Ok(Self {
            record: &line.record,
            file,
            line: line.line,
        })
    }

    fn malformed(&self, reason: String) -> Error {
        Error::MalformedRecord {
            file: self.file.to_path_buf(),
            line: self.line,
            reason,
        }
    }

    fn field(&self, index: usize) -> &'a str {
        &self.record[index]
    }

    fn text(&self, index: usize) -> String {
        self.field(index).to_string()
    }

    fn integer(&self, index: usize, name: &str) -> Result<i64> {
        let raw = self.field(index).trim();
        raw.parse::<i64>()
            .map_err(|_| self.malformed(format!("{} {:?} not recognized as number", name, raw)))
    }

    fn decimal(&self, index: usize, name: &str) -> Result<f64> {
        let raw = self.field(index);
        parse_decimal(raw)
            .ok_or_else(|| self.malformed(format!("{} {:?} not recognized as number", name, raw)))
    }

    /// Decimal where "." marks a missing value, read as 0.0
    fn decimal_or_dot(&self, index: usize, name: &str) -> Result<f64> {
        if self.field(index).trim() == "." {
            Ok(0.0)
        } else {
            self.decimal(index, name)
        }
    }
}

/// Parse one fixation report line
///
/// Fields: label, time, current area, previous area, next area, duration, x, y
pub fn parse_fixation(line: &ReportLine, file: &Path) -> Result<FixationRecord> {
    let fields = LineFields::new(line, FIXATION_FIELDS, file)?;
    Ok(FixationRecord {
        session_label: fields.text(0),
        raw_time: fields.integer(1, "time")?,
        current_tag: fields.text(2),
        previous_tag: fields.text(3),
        next_tag: fields.text(4),
        duration: fields.integer(5, "duration")?,
        x: fields.decimal(6, "x coordinate")?,
        y: fields.decimal(7, "y coordinate")?,
    })
}

/// Parse one message report line
///
/// Fields: label, time, message text
pub fn parse_message(line: &ReportLine, file: &Path) -> Result<MessageRecord> {
    let fields = LineFields::new(line, MESSAGE_FIELDS, file)?;
    Ok(MessageRecord {
        session_label: fields.text(0),
        raw_time: fields.integer(1, "time")?,
        message: fields.text(2),
    })
}

/// Parse one saccade report line
///
/// Fields: label, time, start area, end area, duration, amplitude, angle,
/// average velocity, peak velocity, contains blink
pub fn parse_saccade(line: &ReportLine, file: &Path) -> Result<SaccadeRecord> {
    let fields = LineFields::new(line, SACCADE_FIELDS, file)?;

    let blink_field = fields.field(9);
    let contains_blink = if blink_field.contains("true") {
        true
    } else if blink_field.contains("false") {
        false
    } else {
        return Err(fields.malformed(format!("{:?} not recognized as boolean", blink_field)));
    };

    Ok(SaccadeRecord {
        session_label: fields.text(0),
        raw_time: fields.integer(1, "time")?,
        start_area: fields.text(2),
        end_area: fields.text(3),
        duration: fields.integer(4, "duration")?,
        amplitude: fields.decimal_or_dot(5, "amplitude")?,
        angle: fields.decimal_or_dot(6, "angle")?,
        velocity_avg: fields.decimal_or_dot(7, "average velocity")?,
        velocity_peak: fields.decimal_or_dot(8, "peak velocity")?,
        contains_blink,
    })
}
