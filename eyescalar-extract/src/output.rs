//! Result tables and JSON export
//!
//! **Purpose:** Write the finished session records as tab-separated tables
//! readable by spreadsheet tools, plus a JSON dump of the complete records.
//!
//! **Design:**
//! - Every table is a list of [`Column`]s (header + value extractor), so a
//!   header row and its data rows cannot drift apart
//! - Absent values are written as `.`
//! - Rows follow [`SessionResults::ordered`]

use crate::error::{Error, Result};
use crate::processor::SessionResults;
use crate::record::{
    EpochCounts, EpochExtendedCounts, EpochRegionCounts, EstimatedSummary, ExtendedRates, Rate, RegionTallies, SessionRecord,
    SideRates, Tally,
};
use eyescalar_common::config::ExtractionConfig;
use eyescalar_common::metadata::{Group, SessionType};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SCALARS_FILE: &str = "scalars.tsv";
pub const SCALARS_SMALL_FILE: &str = "scalars_small.tsv";
pub const INTERVALS_FILE: &str = "inter_trigger_intervals.tsv";

/// Placeholder for values that could not be computed
pub const ABSENT: &str = ".";

type Extract = Box<dyn Fn(&SessionRecord) -> String>;

/// One table column
pub struct Column {
    pub header: String,
    value: Extract,
}

impl Column {
    fn new(header: impl Into<String>, value: impl Fn(&SessionRecord) -> String + 'static) -> Self {
        Self {
            header: header.into(),
            value: Box::new(value),
        }
    }

    pub fn value(&self, record: &SessionRecord) -> String {
        (self.value)(record)
    }
}

fn count(value: Option<usize>) -> String {
    value.map_or_else(|| ABSENT.to_string(), |v| v.to_string())
}

fn float(value: Option<f64>) -> String {
    value.map_or_else(|| ABSENT.to_string(), |v| format!("{:?}", v))
}

type TallySelect = fn(&RegionTallies) -> Tally;
type RateSelect<T> = fn(&T) -> Rate;
type EpochSelect<T> = fn(&T) -> usize;

const TALLY_SLOTS: [(&str, TallySelect); 7] = [
    ("", |t| t.all),
    ("image ", |t| t.image),
    ("right ", |t| t.right),
    ("left ", |t| t.left),
    ("white ", |t| t.background),
    ("functioning side ", |t| t.functioning),
    ("nonfunctioning side ", |t| t.nonfunctioning),
];

const ESTIMATED_SLOTS: [(&str, RateSelect<EstimatedSummary>); 5] = [
    ("right ", |e| e.right),
    ("left ", |e| e.left),
    ("white ", |e| e.background),
    ("functioning side ", |e| e.functioning),
    ("nonfunctioning side ", |e| e.nonfunctioning),
];

const IMMEDIATE_SLOTS: [(&str, RateSelect<SideRates>); 4] = [
    ("right ", |s| s.right),
    ("left ", |s| s.left),
    ("functioning side ", |s| s.functioning),
    ("nonfunctioning side ", |s| s.nonfunctioning),
];

const EXTENDED_SLOTS: [(&str, RateSelect<ExtendedRates>); 6] = [
    ("right ", |e| e.right),
    ("left ", |e| e.left),
    ("left-right ", |e| e.both),
    ("total ", |e| e.total),
    ("functioning side ", |e| e.functioning),
    ("nonfunctioning side ", |e| e.nonfunctioning),
];

const EPOCH_REGION_SLOTS: [(&str, EpochSelect<EpochRegionCounts>); 7] = [
    ("", |c| c.all),
    ("image ", |c| c.image),
    ("left ", |c| c.left),
    ("right ", |c| c.right),
    ("white ", |c| c.background),
    ("functioning side ", |c| c.functioning),
    ("nonfunctioning side ", |c| c.nonfunctioning),
];

const EPOCH_EXTENDED_SLOTS: [(&str, EpochSelect<EpochExtendedCounts>); 4] = [
    ("left ", |c| c.left),
    ("right ", |c| c.right),
    ("functioning side ", |c| c.functioning),
    ("nonfunctioning side ", |c| c.nonfunctioning),
];

fn identity_columns() -> Vec<Column> {
    vec![
        Column::new("subject name", |r| r.params.subject_name.clone()),
        Column::new("session number", |r| r.params.session_number.clone()),
        Column::new("age (months)", |r| r.params.age.clone()),
        Column::new("subject group", |r| r.params.group.to_string()),
        Column::new("session type", |r| r.params.session_type.to_string()),
        Column::new("gender", |r| r.params.gender.to_string()),
        Column::new("latency", |r| r.params.latency.to_string()),
        Column::new("functioning side", |r| r.params.functioning_side.to_string()),
        Column::new("lab setup", |r| r.params.lab_setup.to_string()),
    ]
}

fn failure_rate(record: &SessionRecord) -> Option<f64> {
    record.estimated.as_ref().and_then(|e| e.failure_rate)
}

fn tally_columns(columns: &mut Vec<Column>, noun: &'static str, group: fn(&SessionRecord) -> &RegionTallies) {
    for (label, select) in TALLY_SLOTS {
        columns.push(Column::new(format!("{}{} count", label, noun), move |r| {
            select(group(r)).count.to_string()
        }));
        columns.push(Column::new(format!("mean {}{} rate", label, noun), move |r| {
            float(select(group(r)).rate)
        }));
        columns.push(Column::new(format!("mean {}{} duration", label, noun), move |r| {
            float(Some(select(group(r)).mean_duration))
        }));
    }
}

/// Count and rate columns of an optional rate source
fn rate_columns<T: 'static>(
    columns: &mut Vec<Column>,
    headers: (String, String),
    source: fn(&SessionRecord) -> Option<&T>,
    select: RateSelect<T>,
) {
    columns.push(Column::new(headers.0, move |r| count(source(r).map(|s| select(s).count))));
    columns.push(Column::new(headers.1, move |r| float(source(r).and_then(|s| select(s).rate))));
}

fn epoch_columns(columns: &mut Vec<Column>, index: usize) {
    columns.push(Column::new(format!("{} minute", ordinal(index + 1)), |_| String::new()));

    for (label, select) in EPOCH_REGION_SLOTS {
        columns.push(Column::new(format!("{}fixation count", label), move |r| {
            count(epoch(r, index).map(|e| select(&e.fixations)))
        }));
    }
    for (label, select) in EPOCH_EXTENDED_SLOTS {
        columns.push(Column::new(format!("{}extended gaze pattern count", label), move |r| {
            count(epoch(r, index).map(|e| select(&e.extended)))
        }));
    }
    for (label, select) in EPOCH_REGION_SLOTS {
        columns.push(Column::new(format!("{}gaze event count", label), move |r| {
            count(epoch(r, index).map(|e| select(&e.gaze_events)))
        }));
    }
}

fn epoch(record: &SessionRecord, index: usize) -> Option<EpochCounts> {
    record.epochs.get(index).copied().flatten()
}

/// English ordinal of a positive number
pub fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// Columns of the full scalar table
pub fn scalar_columns(epoch_count: usize) -> Vec<Column> {
    let mut columns = identity_columns();

    columns.push(Column::new("saccade cutoff duration (ms)", |r| r.dt_cutoff_ms.to_string()));
    columns.push(Column::new("first fixation side", |r| {
        r.first_side.map_or_else(|| ABSENT.to_string(), |s| s.code().to_string())
    }));
    columns.push(Column::new("failure rate", |r| float(failure_rate(r))));
    columns.push(Column::new("total time (ms)", |r| r.total_time.to_string()));
    columns.push(Column::new("trigger count", |r| count(r.triggers.as_ref().map(|t| t.triggers.count))));
    columns.push(Column::new("mean trigger rate", |r| {
        float(r.triggers.as_ref().and_then(|t| t.triggers.rate))
    }));

    tally_columns(&mut columns, "fixation", |r| &r.fixations);

    for (label, select) in ESTIMATED_SLOTS {
        rate_columns(
            &mut columns,
            (
                format!("estimated {}fixation count", label),
                format!("estimated mean {}fixation rate", label),
            ),
            |r| r.estimated.as_ref(),
            select,
        );
    }

    for (label, select) in IMMEDIATE_SLOTS {
        rate_columns(
            &mut columns,
            (
                format!("{}immediate gaze pattern count", label),
                format!("mean {}immediate gaze pattern rate", label),
            ),
            |r| Some(&r.immediate_patterns),
            select,
        );
    }

    for (label, select) in EXTENDED_SLOTS {
        rate_columns(
            &mut columns,
            (
                format!("{}extended gaze pattern count", label),
                format!("mean {}extended gaze pattern rate", label),
            ),
            |r| Some(&r.extended_patterns),
            select,
        );
    }

    for (label, select) in EXTENDED_SLOTS {
        rate_columns(
            &mut columns,
            (
                format!("estimated {}extended gaze pattern count", label),
                format!("estimated mean {}extended gaze pattern rate", label),
            ),
            |r| r.estimated.as_ref().map(|e| &e.extended),
            select,
        );
    }

    tally_columns(&mut columns, "gaze event", |r| &r.gaze_events);

    columns.push(Column::new("left full gaze pattern count", |r| r.full_patterns.left.to_string()));
    columns.push(Column::new("right full gaze pattern count", |r| r.full_patterns.right.to_string()));
    columns.push(Column::new("functioning side full gaze pattern count", |r| {
        r.full_patterns.functioning.to_string()
    }));
    columns.push(Column::new("nonfunctioning side full gaze pattern count", |r| {
        r.full_patterns.nonfunctioning.to_string()
    }));

    columns.push(Column::new("number of saccades", |r| count(r.saccades.as_ref().map(|s| s.saccades.count))));
    columns.push(Column::new("mean saccade rate", |r| {
        float(r.saccades.as_ref().and_then(|s| s.saccades.rate))
    }));
    columns.push(Column::new("number of blinks", |r| count(r.saccades.as_ref().map(|s| s.blinks))));
    columns.push(Column::new("blink ratio", |r| float(r.saccades.as_ref().map(|s| s.blink_ratio))));

    columns.push(Column::new("number of full minutes", |r| r.sealed_epochs.to_string()));
    for index in 0..epoch_count {
        epoch_columns(&mut columns, index);
    }

    columns
}

/// Columns of the reduced scalar table
pub fn small_columns() -> Vec<Column> {
    let mut columns = identity_columns();
    columns.push(Column::new("failure rate", |r| float(failure_rate(r))));
    columns.push(Column::new("total time (ms)", |r| r.total_time.to_string()));
    columns.push(Column::new("mean functioning side extended gaze pattern rate", |r| {
        float(r.extended_patterns.functioning.rate)
    }));
    columns.push(Column::new("mean nonfunctioning side extended gaze pattern rate", |r| {
        float(r.extended_patterns.nonfunctioning.rate)
    }));
    columns
}

/// Tab-separated table writer; rows may differ in length
pub fn table_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_writer(writer)
}

/// Write a header row and one row per record
pub fn write_table<W: Write>(table: &mut csv::Writer<W>, columns: &[Column], records: &[&SessionRecord]) -> csv::Result<()> {
    table.write_record(columns.iter().map(|c| c.header.as_str()))?;
    for record in records {
        table.write_record(columns.iter().map(|c| c.value(record)))?;
    }
    Ok(())
}

/// Sessions whose group/session pairing is an active one
pub fn has_intervals(record: &SessionRecord) -> bool {
    record.params.group != Group::YY && record.params.session_type == SessionType::Active
}

/// Write the inter-trigger intervals of active sessions
pub fn write_intervals<W: Write>(table: &mut csv::Writer<W>, records: &[&SessionRecord]) -> csv::Result<()> {
    table.write_record(["subject name", "session number", "inter trigger intervals"])?;
    for record in records.iter().filter(|r| has_intervals(r)) {
        let mut row = vec![
            record.params.subject_name.clone(),
            record.params.session_number.clone(),
        ];
        if let Some(triggers) = &record.triggers {
            row.extend(triggers.intervals.iter().map(|interval| interval.to_string()));
        }
        table.write_record(&row)?;
    }
    Ok(())
}

fn write_file(path: &Path, write: impl FnOnce(&mut csv::Writer<File>) -> csv::Result<()>) -> Result<()> {
    let file = File::create(path).map_err(|source| Error::file(path, source))?;
    let mut table = table_writer(file);
    write(&mut table)
        .and_then(|_| table.flush().map_err(csv::Error::from))
        .map_err(|source| Error::Table {
            file: path.to_path_buf(),
            source,
        })
}

/// Export the complete result map to a JSON file
pub fn export_json<P: AsRef<Path>>(results: &SessionResults, path: P) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(results)?;
    let mut file = File::create(path).map_err(|source| Error::file(path, source))?;
    file.write_all(json.as_bytes())
        .map_err(|source| Error::file(path, source))?;
    Ok(())
}

/// File name of the JSON export for a cutoff threshold
pub fn json_file_name(dt_cutoff_ms: i64) -> String {
    format!("extracted_data_{}.json", dt_cutoff_ms)
}

/// Write all result files into `dir`, creating it if needed
///
/// # Returns
/// Paths of the written files
pub fn write_all(results: &SessionResults, dir: &Path, config: &ExtractionConfig) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|source| Error::file(dir, source))?;
    let records = results.ordered();

    let scalars = dir.join(SCALARS_FILE);
    let columns = scalar_columns(config.epoch_count);
    write_file(&scalars, |w| write_table(w, &columns, &records))?;

    let small = dir.join(SCALARS_SMALL_FILE);
    let columns = small_columns();
    write_file(&small, |w| write_table(w, &columns, &records))?;

    let intervals = dir.join(INTERVALS_FILE);
    write_file(&intervals, |w| write_intervals(w, &records))?;

    let json = dir.join(json_file_name(config.dt_cutoff_ms));
    export_json(results, &json)?;

    let written = vec![scalars, small, intervals, json];
    for path in &written {
        info!("Wrote {}", path.display());
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_table_header_row() {
        let mut buffer = Vec::new();
        {
            let mut table = table_writer(&mut buffer);
            write_table(&mut table, &small_columns(), &[]).unwrap();
            table.flush().unwrap();
        }
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("subject name\t"));
        assert_eq!(text.trim_end().split('\t').count(), 13);
    }

    #[test]
    fn test_ordinal() {
        let labels: Vec<String> = [1, 2, 3, 4, 5, 11, 12, 21, 22].iter().map(|n| ordinal(*n)).collect();
        assert_eq!(labels, vec!["1st", "2nd", "3rd", "4th", "5th", "11th", "12th", "21st", "22nd"]);
    }

    #[test]
    fn test_float_formatting() {
        assert_eq!(float(Some(1.0)), "1.0");
        assert_eq!(float(Some(0.25)), "0.25");
        assert_eq!(float(None), ".");
        assert_eq!(count(None), ".");
        assert_eq!(count(Some(3)), "3");
    }

    #[test]
    fn test_scalar_header_layout() {
        let columns = scalar_columns(5);
        let headers: Vec<&str> = columns.iter().map(|c| c.header.as_str()).collect();

        assert_eq!(headers[0], "subject name");
        assert_eq!(headers[8], "lab setup");
        assert_eq!(headers[9], "saccade cutoff duration (ms)");
        assert!(headers.contains(&"mean functioning side fixation duration"));
        assert!(headers.contains(&"estimated mean left-right extended gaze pattern rate"));
        assert!(headers.contains(&"mean nonfunctioning side gaze event duration"));

        let minutes = headers.iter().position(|h| *h == "number of full minutes").unwrap();
        // Label column plus 18 counts per epoch
        assert_eq!(headers.len(), minutes + 1 + 5 * 19);
        assert_eq!(headers[minutes + 1], "1st minute");
        assert_eq!(headers[minutes + 20], "2nd minute");
        assert_eq!(headers[minutes + 2], "fixation count");
        assert_eq!(headers[minutes + 19], "nonfunctioning side gaze event count");
    }

    #[test]
    fn test_small_header() {
        let headers: Vec<String> = small_columns().into_iter().map(|c| c.header).collect();
        assert_eq!(headers.len(), 13);
        assert_eq!(headers[9], "failure rate");
        assert_eq!(headers[12], "mean nonfunctioning side extended gaze pattern rate");
    }

    #[test]
    fn test_json_file_name() {
        assert_eq!(json_file_name(200), "extracted_data_200.json");
    }
}
