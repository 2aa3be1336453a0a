use crate::catalog::SubjectDef;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// Singleton round/mode flags, stored as JSON under system_config(key='config').
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemConfig {
    pub current_round: i64,
    pub exam_closed: bool,
    pub term_end_mode: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            current_round: 1,
            exam_closed: false,
            term_end_mode: false,
        }
    }
}

/// Per-grade values for the three published cut grades. The stored JSON keeps
/// the string keys "1".."3" so admin exports stay readable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CutMap {
    #[serde(rename = "1")]
    pub g1: f64,
    #[serde(rename = "2")]
    pub g2: f64,
    #[serde(rename = "3")]
    pub g3: f64,
}

impl CutMap {
    pub fn new(g1: f64, g2: f64, g3: f64) -> Self {
        Self { g1, g2, g3 }
    }

    pub fn zip(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self {
        Self {
            g1: f(self.g1, other.g1),
            g2: f(self.g2, other.g2),
            g3: f(self.g3, other.g3),
        }
    }
}

/// Assumed average total per prior-grade bucket, used when a bucket has no
/// live submissions yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BucketAverages {
    #[serde(rename = "1")]
    pub b1: f64,
    #[serde(rename = "2")]
    pub b2: f64,
    #[serde(rename = "3")]
    pub b3: f64,
    #[serde(rename = "4")]
    pub b4: f64,
    #[serde(rename = "5")]
    pub b5: f64,
}

impl BucketAverages {
    pub fn get(&self, bucket: i64) -> f64 {
        match bucket {
            1 => self.b1,
            2 => self.b2,
            3 => self.b3,
            4 => self.b4,
            _ => self.b5,
        }
    }
}

fn default_prev_avg() -> f64 {
    60.0
}

fn default_cuts() -> CutMap {
    CutMap::new(90.0, 80.0, 70.0)
}

fn default_cut_weights() -> CutMap {
    CutMap::new(1.0, 1.2, 1.5)
}

fn default_adjustment() -> CutMap {
    CutMap::new(0.0, 0.0, 0.0)
}

fn default_bucket_averages() -> BucketAverages {
    BucketAverages {
        b1: 95.0,
        b2: 85.0,
        b3: 75.0,
        b4: 65.0,
        b5: 55.0,
    }
}

fn default_rubric_label() -> String {
    "Rubric".to_string()
}

/// Per (subject, round) scoring and calibration parameters.
///
/// Every field defaults at deserialization, so blobs written by older builds
/// (missing term fields, shorter vectors) load cleanly. Vector lengths are
/// normalized against the subject catalog in `normalized`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SubjectSettings {
    pub active: bool,
    pub answer_key: Vec<i64>,
    pub answer_scores: Vec<f64>,
    pub sub_criteria: Vec<String>,
    pub sub_max_scores: Vec<f64>,
    pub prev_avg: f64,
    pub prev_cuts: CutMap,
    pub cut_weights: CutMap,
    pub bucket_avg_prediction: BucketAverages,
    pub homer_mode: bool,
    pub homer_adj: CutMap,
    pub term_mid_cuts: CutMap,
    pub term_adj: CutMap,
}

impl Default for SubjectSettings {
    fn default() -> Self {
        Self {
            active: false,
            answer_key: Vec::new(),
            answer_scores: Vec::new(),
            sub_criteria: Vec::new(),
            sub_max_scores: Vec::new(),
            prev_avg: default_prev_avg(),
            prev_cuts: default_cuts(),
            cut_weights: default_cut_weights(),
            bucket_avg_prediction: default_bucket_averages(),
            homer_mode: false,
            homer_adj: default_adjustment(),
            term_mid_cuts: default_cuts(),
            term_adj: default_adjustment(),
        }
    }
}

impl SubjectSettings {
    pub fn defaults_for(def: SubjectDef) -> Self {
        Self::default().normalized(def)
    }

    /// Resize the per-question vectors to the catalog shape. Extra entries are
    /// dropped, missing entries get the admin-form defaults.
    pub fn normalized(mut self, def: SubjectDef) -> Self {
        self.answer_key.resize(def.objective, 1);
        self.answer_scores.resize(def.objective, 3.0);
        self.sub_criteria
            .resize_with(def.subjective, default_rubric_label);
        self.sub_max_scores.resize(def.subjective, 5.0);
        self
    }
}

pub fn load_system_config(conn: &Connection) -> SystemConfig {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM system_config WHERE key = 'config'",
            [],
            |r| r.get(0),
        )
        .optional()
        .ok()
        .flatten();
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn save_system_config(conn: &Connection, cfg: &SystemConfig) -> anyhow::Result<()> {
    let value = serde_json::to_string(cfg)?;
    conn.execute(
        "INSERT INTO system_config(key, value) VALUES('config', ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [&value],
    )?;
    Ok(())
}

pub fn load_subject_settings(
    conn: &Connection,
    def: SubjectDef,
    subject: &str,
    round: i64,
) -> SubjectSettings {
    let raw: Option<String> = conn
        .query_row(
            "SELECT settings FROM subject_settings WHERE subject = ? AND round = ?",
            (subject, round),
            |r| r.get(0),
        )
        .optional()
        .ok()
        .flatten();
    raw.and_then(|s| serde_json::from_str::<SubjectSettings>(&s).ok())
        .map(|s| s.normalized(def))
        .unwrap_or_else(|| SubjectSettings::defaults_for(def))
}

pub fn save_subject_settings(
    conn: &Connection,
    subject: &str,
    round: i64,
    settings: &SubjectSettings,
) -> anyhow::Result<()> {
    let blob = serde_json::to_string(settings)?;
    conn.execute(
        "INSERT INTO subject_settings(subject, round, settings) VALUES(?, ?, ?)
         ON CONFLICT(subject, round) DO UPDATE SET settings = excluded.settings",
        (subject, round, &blob),
    )?;
    Ok(())
}
