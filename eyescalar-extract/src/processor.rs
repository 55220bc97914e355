//! Report processing pipeline
//!
//! **Purpose:** Stream fixation reports session by session into
//! [`SessionRecord`]s, then merge the trigger and saccade tallies of the
//! ancillary reports into the records they belong to.
//!
//! **Order:** All fixation reports must be processed before any message or
//! saccade report, since ancillary times are corrected with the cutoff table
//! each session's fixation stream produced.

use crate::error::{Error, Result};
use crate::record::SessionRecord;
use crate::reducer;
use crate::region::RegionClassifier;
use crate::report::{self, MessageRecord, SaccadeRecord};
use crate::saccades;
use crate::session::SessionAccumulator;
use crate::triggers;
use eyescalar_common::config::ExtractionConfig;
use eyescalar_common::metadata::session_id_from_label;
use eyescalar_common::Overview;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const FIXATION_SUFFIX: &str = "_fix.xls";
pub const MESSAGE_SUFFIX: &str = "_msg.xls";
pub const SACCADE_SUFFIX: &str = "_sac.xls";

/// Finished session records keyed by session id
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct SessionResults {
    sessions: BTreeMap<String, SessionRecord>,
}

impl SessionResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a finished record; a session seen before is replaced
    pub fn insert(&mut self, record: SessionRecord) {
        let id = record.session_id.clone();
        if self.sessions.insert(id.clone(), record).is_some() {
            warn!(session = %id, "Session appeared twice, earlier results replaced");
        }
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionRecord> {
        self.sessions.get(session_id)
    }

    pub fn get_mut(&mut self, session_id: &str) -> Option<&mut SessionRecord> {
        self.sessions.get_mut(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Records in session id order
    pub fn iter(&self) -> impl Iterator<Item = &SessionRecord> {
        self.sessions.values()
    }

    /// Drop excluded sessions
    ///
    /// # Returns
    /// Number of sessions removed
    pub fn remove_excluded(&mut self, excluded: &[String]) -> usize {
        let mut removed = 0;
        for id in excluded {
            if self.sessions.remove(id).is_some() {
                info!(session = %id, "Excluded session removed");
                removed += 1;
            }
        }
        removed
    }

    /// Records sorted by age, group, subject and session number
    pub fn ordered(&self) -> Vec<&SessionRecord> {
        let mut records: Vec<&SessionRecord> = self.sessions.values().collect();
        records.sort_by(|a, b| {
            let (a, b) = (&a.params, &b.params);
            compare_field(&a.age, &b.age)
                .then_with(|| a.group.to_string().cmp(&b.group.to_string()))
                .then_with(|| compare_field(&a.subject_name, &b.subject_name))
                .then_with(|| compare_field(&a.session_number, &b.session_number))
        });
        records
    }
}

/// Numeric comparison where both fields are numbers, text otherwise
///
/// Numbers sort before text.
fn compare_field(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Report files of one recording folder, each list in file name order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFiles {
    pub fixations: Vec<PathBuf>,
    pub messages: Vec<PathBuf>,
    pub saccades: Vec<PathBuf>,
}

impl ReportFiles {
    /// Collect report files from a folder (not recursive)
    pub fn scan(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::file(
                dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "report folder not found"),
            ));
        }

        let mut files = Self::default();
        let walker = WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error accessing entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            let path = entry.path().to_path_buf();
            if name.ends_with(FIXATION_SUFFIX) {
                files.fixations.push(path);
            } else if name.ends_with(MESSAGE_SUFFIX) {
                files.messages.push(path);
            } else if name.ends_with(SACCADE_SUFFIX) {
                files.saccades.push(path);
            } else {
                debug!("Skipping {}", path.display());
            }
        }

        info!(
            "Found {} fixation, {} message and {} saccade reports in {}",
            files.fixations.len(),
            files.messages.len(),
            files.saccades.len(),
            dir.display()
        );
        Ok(files)
    }

    pub fn is_empty(&self) -> bool {
        self.fixations.is_empty() && self.messages.is_empty() && self.saccades.is_empty()
    }
}

/// Group records into runs of consecutive records of the same session
fn session_runs<T>(records: Vec<T>, label: impl Fn(&T) -> &str) -> Vec<(String, Vec<T>)> {
    let mut runs: Vec<(String, Vec<T>)> = Vec::new();
    for record in records {
        let id = session_id_from_label(label(&record));
        if let Some((current, run)) = runs.last_mut() {
            if current.as_str() == id {
                run.push(record);
                continue;
            }
        }
        runs.push((id.to_string(), vec![record]));
    }
    runs
}

/// Runs the extraction over report files
pub struct Extractor {
    config: ExtractionConfig,
    overview: Overview,
    classifier: RegionClassifier,
}

impl Extractor {
    /// Create an extractor; rejects parameters the stream processor cannot work with
    pub fn new(config: ExtractionConfig, overview: Overview) -> Result<Self> {
        config.validate()?;
        let classifier = RegionClassifier::new(&config.markers);
        Ok(Self {
            config,
            overview,
            classifier,
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Process every report of a folder scan and drop excluded sessions
    pub fn run(&self, files: &ReportFiles) -> Result<SessionResults> {
        let mut results = SessionResults::new();

        for path in &files.fixations {
            self.process_fixation_report(path, &mut results)?;
        }
        for path in &files.messages {
            self.process_message_report(path, &mut results)?;
        }
        for path in &files.saccades {
            self.process_saccade_report(path, &mut results)?;
        }

        results.remove_excluded(&self.config.excluded_sessions);
        Ok(results)
    }

    /// Stream one fixation report into session records
    ///
    /// # Returns
    /// Number of sessions finished from this report
    pub fn process_fixation_report(&self, path: &Path, results: &mut SessionResults) -> Result<usize> {
        info!("Processing fixation report {}", path.display());
        let content = read_report(path)?;
        self.process_fixation_str(&content, path, results)
    }

    /// Stream fixation report content into session records
    ///
    /// Sessions finished before a malformed line stay in `results`.
    pub fn process_fixation_str(&self, content: &str, path: &Path, results: &mut SessionResults) -> Result<usize> {
        let mut current: Option<SessionAccumulator> = None;
        let mut finished = 0;

        for line in report::read_lines(content, path) {
            let record = report::parse_fixation(&line?, path)?;
            let id = session_id_from_label(&record.session_label);

            let accumulator = match current.take() {
                Some(accumulator) if accumulator.session_id() == id => accumulator,
                previous => {
                    if let Some(previous) = previous {
                        self.finish_session(previous, results)?;
                        finished += 1;
                    }
                    debug!(session = %id, "Session started");
                    SessionAccumulator::new(id, &self.config)
                }
            };
            let accumulator = current.insert(accumulator);
            accumulator.push(&record, &self.classifier);
        }

        if let Some(last) = current {
            self.finish_session(last, results)?;
            finished += 1;
        }
        Ok(finished)
    }

    fn finish_session(&self, accumulator: SessionAccumulator, results: &mut SessionResults) -> Result<()> {
        let id = accumulator.session_id().to_string();
        let fixations = accumulator.len();
        let params = self
            .overview
            .session_params(&id, &self.config.single_session_affixes)?;
        let record = reducer::reduce(accumulator.finish(), params, &self.config)?;

        info!(
            session = %id,
            fixations,
            total_time = record.total_time,
            cutoffs = record.cutoff.segments.len(),
            "Session finished"
        );
        results.insert(record);
        Ok(())
    }

    /// Merge the image triggers of one message report
    pub fn process_message_report(&self, path: &Path, results: &mut SessionResults) -> Result<usize> {
        info!("Processing message report {}", path.display());
        let content = read_report(path)?;
        self.process_message_str(&content, path, results)
    }

    pub fn process_message_str(&self, content: &str, path: &Path, results: &mut SessionResults) -> Result<usize> {
        let messages = report::read_lines(content, path)
            .map(|line| report::parse_message(&line?, path))
            .collect::<Result<Vec<MessageRecord>>>()?;

        let runs = session_runs(messages, |m| m.session_label.as_str());
        let count = runs.len();
        for (id, run) in runs {
            let record = lookup(results, &id, path)?;
            if record.triggers.is_some() {
                warn!(session = %id, "Triggers of session already extracted, replaced");
            }
            let summary = triggers::summarize(&run, &record.cutoff, record.total_time);
            debug!(session = %id, triggers = summary.triggers.count, "Triggers extracted");
            record.triggers = Some(summary);
        }
        Ok(count)
    }

    /// Merge the saccade tallies of one saccade report
    pub fn process_saccade_report(&self, path: &Path, results: &mut SessionResults) -> Result<usize> {
        info!("Processing saccade report {}", path.display());
        let content = read_report(path)?;
        self.process_saccade_str(&content, path, results)
    }

    pub fn process_saccade_str(&self, content: &str, path: &Path, results: &mut SessionResults) -> Result<usize> {
        let saccades = report::read_lines(content, path)
            .map(|line| report::parse_saccade(&line?, path))
            .collect::<Result<Vec<SaccadeRecord>>>()?;

        let runs = session_runs(saccades, |s| s.session_label.as_str());
        let count = runs.len();
        for (id, run) in runs {
            let record = lookup(results, &id, path)?;
            if record.saccades.is_some() {
                warn!(session = %id, "Saccades of session already extracted, replaced");
            }
            let summary = saccades::summarize(&run, &record.cutoff, record.total_time);
            debug!(session = %id, saccades = summary.saccades.count, blinks = summary.blinks, "Saccades extracted");
            record.saccades = Some(summary);
        }
        Ok(count)
    }
}

fn read_report(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::file(path, source))
}

fn lookup<'a>(results: &'a mut SessionResults, id: &str, path: &Path) -> Result<&'a mut SessionRecord> {
    results.get_mut(id).ok_or_else(|| Error::InconsistentCutoff {
        session: id.to_string(),
        file: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_field_numeric_then_text() {
        assert_eq!(compare_field("9", "10"), Ordering::Less);
        assert_eq!(compare_field("10", "9"), Ordering::Greater);
        assert_eq!(compare_field("7.5", "7.5"), Ordering::Equal);
        assert_eq!(compare_field("9", "pilot"), Ordering::Less);
        assert_eq!(compare_field("a", "b"), Ordering::Less);
    }

    #[test]
    fn test_session_runs_group_consecutive_labels() {
        let labels = vec!["vp1.1", "vp1.1", "vp1.2", "vp1.1"];
        let runs = session_runs(labels, |l| *l);
        let shape: Vec<(&str, usize)> = runs.iter().map(|(id, run)| (id.as_str(), run.len())).collect();
        assert_eq!(shape, vec![("1.1", 2), ("1.2", 1), ("1.1", 1)]);
    }

    #[test]
    fn test_scan_classifies_report_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b_fix.xls", "a_fix.xls", "a_msg.xls", "a_sac.xls", "notes.txt"] {
            std::fs::write(dir.path().join(name), "header\n").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested_fix.xls")).unwrap();

        let files = ReportFiles::scan(dir.path()).unwrap();
        let names: Vec<String> = files
            .fixations
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a_fix.xls", "b_fix.xls"]);
        assert_eq!(files.messages.len(), 1);
        assert_eq!(files.saccades.len(), 1);
    }

    #[test]
    fn test_zero_epoch_length_rejected() {
        let mut config = ExtractionConfig::default();
        config.epoch_ms = 0;
        let result = Extractor::new(config, Overview::default());
        assert!(matches!(
            result,
            Err(Error::Common(eyescalar_common::Error::Config(_)))
        ));
    }

    #[test]
    fn test_unreadable_report_names_file() {
        let extractor = Extractor::new(ExtractionConfig::default(), Overview::default()).unwrap();
        let mut results = SessionResults::new();
        let err = extractor
            .process_fixation_report(Path::new("/nonexistent/vp35_fix.xls"), &mut results)
            .unwrap_err();

        assert!(matches!(err, Error::File { .. }));
        assert!(err.to_string().contains("vp35_fix.xls"));
        assert!(results.is_empty());
    }

    #[test]
    fn test_scan_missing_folder() {
        let result = ReportFiles::scan(Path::new("/nonexistent/reports"));
        assert!(matches!(result, Err(Error::File { .. })));
    }
}
