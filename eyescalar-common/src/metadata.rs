//! Subject metadata (overview) lookup and session name parsing
//!
//! The overview is a TOML document with one table per subject:
//!
//! ```toml
//! [subjects.35]
//! age = 8
//! group = "AA"
//! gender = "m"
//! latency = 1
//! functioning_side = "R"
//! lab_setup = 0
//! ```
//!
//! Coded cells accept both the spreadsheet codes (`m`/`f`, `1`/`2`, `0`/`1`)
//! and the spelled-out values (`male`, `short`, `old`, ...).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::warn;

/// Experimental condition group; first letter is session 1, second is session 2
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Group {
    AA,
    AY,
    YA,
    YY,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    NotRecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Latency {
    Short,
    Long,
    NotRecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabSetup {
    Old,
    New,
    NotRecognized,
}

/// Side of the disc that was operative for a subject
///
/// An unrecognized value is kept so the failure can be reported with the
/// session that needs it; relabeling refuses to proceed on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctioningSide {
    Right,
    Left,
    NotRecognized(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Active,
    Yoked,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Group::AA => "AA",
            Group::AY => "AY",
            Group::YA => "YA",
            Group::YY => "YY",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::NotRecognized => "not recognized",
        })
    }
}

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Latency::Short => "short",
            Latency::Long => "long",
            Latency::NotRecognized => "not recognized",
        })
    }
}

impl fmt::Display for LabSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LabSetup::Old => "old",
            LabSetup::New => "new",
            LabSetup::NotRecognized => "not recognized",
        })
    }
}

impl fmt::Display for FunctioningSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctioningSide::Right => f.write_str("R"),
            FunctioningSide::Left => f.write_str("L"),
            FunctioningSide::NotRecognized(raw) => write!(f, "not recognized ({})", raw),
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionType::Active => "active",
            SessionType::Yoked => "yoked",
        })
    }
}

impl Group {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "AA" => Some(Group::AA),
            "AY" => Some(Group::AY),
            "YA" => Some(Group::YA),
            "YY" => Some(Group::YY),
            _ => None,
        }
    }

    /// Session type of the given session number under this group
    pub fn session_type(&self, session_number: &str) -> SessionType {
        let label = self.to_string();
        let mut chars = label.chars();
        let first = chars.next();
        let second = chars.next();
        if (first == Some('Y') && session_number == "1")
            || (second == Some('Y') && session_number == "2")
        {
            SessionType::Yoked
        } else {
            SessionType::Active
        }
    }
}

/// One overview cell: spreadsheets mix numeric and text codes
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Cell {
    Int(i64),
    Text(String),
}

impl Cell {
    fn as_code(&self) -> String {
        match self {
            Cell::Int(v) => v.to_string(),
            Cell::Text(s) => s.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSubject {
    age: Cell,
    group: String,
    gender: Cell,
    latency: Cell,
    functioning_side: Cell,
    lab_setup: Cell,
}

#[derive(Debug, Deserialize)]
struct OverviewFile {
    #[serde(default)]
    subjects: HashMap<String, RawSubject>,
}

/// Everything the overview knows about one subject
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectInfo {
    pub age: String,
    pub group: Group,
    pub gender: Gender,
    pub latency: Latency,
    pub functioning_side: FunctioningSide,
    pub lab_setup: LabSetup,
}

/// Experiment parameters of one recorded session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionParams {
    pub subject_name: String,
    pub session_number: String,
    pub age: String,
    pub group: Group,
    pub session_type: SessionType,
    pub gender: Gender,
    pub latency: Latency,
    pub functioning_side: FunctioningSide,
    pub lab_setup: LabSetup,
}

/// Subject overview keyed by subject name
#[derive(Debug, Clone, Default)]
pub struct Overview {
    subjects: HashMap<String, SubjectInfo>,
}

impl Overview {
    /// Load the overview from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
        Self::from_toml_str(&content, path)
    }

    /// Parse an overview document
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self> {
        let file: OverviewFile = toml::from_str(content).map_err(|source| Error::Toml {
            path: origin.to_path_buf(),
            source,
        })?;

        let mut subjects = HashMap::with_capacity(file.subjects.len());
        for (name, raw) in file.subjects {
            let info = SubjectInfo::from_raw(&name, raw)?;
            subjects.insert(name, info);
        }
        Ok(Self { subjects })
    }

    pub fn get(&self, subject_name: &str) -> Option<&SubjectInfo> {
        self.subjects.get(subject_name)
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Resolve the experiment parameters of a session id
    pub fn session_params(&self, session_id: &str, single_session_affixes: &[String]) -> Result<SessionParams> {
        let (subject_name, session_number) = split_session_name(session_id, single_session_affixes);

        let info = self.subjects.get(&subject_name).ok_or_else(|| Error::MissingMetadata {
            session: session_id.to_string(),
            subject: subject_name.clone(),
        })?;

        Ok(SessionParams {
            session_type: info.group.session_type(&session_number),
            subject_name,
            session_number,
            age: info.age.clone(),
            group: info.group,
            gender: info.gender,
            latency: info.latency,
            functioning_side: info.functioning_side.clone(),
            lab_setup: info.lab_setup,
        })
    }
}

impl SubjectInfo {
    fn from_raw(name: &str, raw: RawSubject) -> Result<Self> {
        let group = Group::parse(&raw.group).ok_or_else(|| {
            Error::Config(format!("Group {} of subject {} not recognized", raw.group, name))
        })?;

        let gender = match raw.gender.as_code().to_ascii_lowercase().as_str() {
            "m" | "male" => Gender::Male,
            "f" | "female" => Gender::Female,
            other => {
                warn!("Gender of subject {} not recognized ({})", name, other);
                Gender::NotRecognized
            }
        };

        let latency = match raw.latency.as_code().to_ascii_lowercase().as_str() {
            "1" | "short" => Latency::Short,
            "2" | "long" => Latency::Long,
            other => {
                warn!("Latency of subject {} not recognized ({})", name, other);
                Latency::NotRecognized
            }
        };

        let functioning_side = match raw.functioning_side.as_code().as_str() {
            "R" => FunctioningSide::Right,
            "L" => FunctioningSide::Left,
            other => {
                warn!("Functioning side of subject {} not recognized ({})", name, other);
                FunctioningSide::NotRecognized(other.to_string())
            }
        };

        let lab_setup = match raw.lab_setup.as_code().to_ascii_lowercase().as_str() {
            "0" | "old" => LabSetup::Old,
            "1" | "new" => LabSetup::New,
            other => {
                warn!("Lab setup of subject {} not recognized ({})", name, other);
                LabSetup::NotRecognized
            }
        };

        Ok(Self {
            age: raw.age.as_code(),
            group,
            gender,
            latency,
            functioning_side,
            lab_setup,
        })
    }
}

/// Session id from a recording session label
///
/// Labels of the form `vp35.2` carry a two-character prefix that is not part
/// of the session id.
pub fn session_id_from_label(label: &str) -> &str {
    if label.contains("vp") {
        label.get(2..).unwrap_or(label)
    } else {
        label
    }
}

/// Rewrite the experiment-name variants of recording labels
///
/// - `6m_12.1` → `6m12.1` (underscore after `m` collapsed)
/// - `m10_12.1` → `10m12.1`, `m6_12.1` → `6m12.1`
/// - the first `Y` is lowercased: `Y12.1` → `y12.1`
///
/// Each rewrite keeps only the text up to a second occurrence of its pattern.
pub fn normalize_session_name(session_id: &str) -> String {
    let mut name = session_id.to_string();
    if name.contains("m_") {
        name = name.split('_').take(2).collect();
    }
    for (pattern, prefix) in [("m10_", "10m"), ("m6_", "6m")] {
        let rewritten = name.split(pattern).nth(1).map(|rest| format!("{}{}", prefix, rest));
        if let Some(rewritten) = rewritten {
            name = rewritten;
        }
    }
    if name.contains('Y') {
        let parts: Vec<&str> = name.splitn(3, 'Y').collect();
        name = format!("{}y{}", parts[0], parts[1]);
    }
    name
}

/// Split a session id into subject name and session number
///
/// `35.2` → (`35`, `2`). The id is normalized first (see
/// [`normalize_session_name`]), then separators are tried in the order `.`,
/// `-`, `_`. A name without separator is the first session of that subject.
/// Ids containing a single-session affix are kept whole.
pub fn split_session_name(session_id: &str, single_session_affixes: &[String]) -> (String, String) {
    if single_session_affixes
        .iter()
        .any(|affix| !affix.is_empty() && session_id.contains(affix.as_str()))
    {
        return (session_id.to_string(), "1".to_string());
    }

    let name = normalize_session_name(session_id);
    for separator in ['.', '-', '_'] {
        if let Some((subject, session)) = name.split_once(separator) {
            if session.contains(separator) {
                // More than one separator: not a subject/session pair
                return (name.clone(), "1".to_string());
            }
            return (subject.to_string(), session.to_string());
        }
    }

    (name, "1".to_string())
}
