use crate::settings::{CutMap, SubjectSettings};
use rusqlite::Connection;
use serde::Serialize;

/// Cohort weighting per prior-grade bucket 1..=5, approximating the school's
/// grade distribution. Calibration values carried from production; no
/// derivation exists.
pub const COHORT_WEIGHTS: [f64; 5] = [0.10, 0.24, 0.32, 0.24, 0.10];

/// End-of-term blend: final exam and mid-term each weigh 0.3, performance
/// assessment is added raw on top of a fixed participation baseline.
pub const EXAM_WEIGHT: f64 = 0.3;
pub const MID_WEIGHT: f64 = 0.3;
pub const TERM_BASE_POINTS: f64 = 40.0;

pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictError {
    pub code: String,
    pub message: String,
}

impl PredictError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub cuts: CutMap,
    pub homer_cuts: CutMap,
    pub submission_count: usize,
    pub homer_active: bool,
}

impl Prediction {
    /// The cut set that is authoritative for display and grade
    /// classification: homer cuts when the adjustment is switched on.
    pub fn display_cuts(&self) -> CutMap {
        if self.homer_active {
            self.homer_cuts
        } else {
            self.cuts
        }
    }
}

/// Predicted cuts from live samples `(total, prev_grade_bucket)`.
///
/// Buckets without samples fall back to the admin's assumed averages; with no
/// samples at all the prior cuts pass through unchanged.
pub fn cuts_from_samples(settings: &SubjectSettings, samples: &[(f64, i64)]) -> CutMap {
    if samples.is_empty() {
        return settings.prev_cuts;
    }

    let mut cur_avg = 0.0;
    for (i, weight) in COHORT_WEIGHTS.iter().enumerate() {
        let bucket = (i + 1) as i64;
        let mut sum = 0.0;
        let mut count = 0usize;
        for (total, g) in samples {
            if *g == bucket {
                sum += total;
                count += 1;
            }
        }
        let bucket_avg = if count > 0 {
            sum / count as f64
        } else {
            settings.bucket_avg_prediction.get(bucket)
        };
        cur_avg += bucket_avg * weight;
    }

    let delta = cur_avg - settings.prev_avg;
    settings
        .prev_cuts
        .zip(settings.cut_weights, |cut, w| round1(cut + delta * w))
}

fn apply_homer(settings: &SubjectSettings, cuts: CutMap) -> (CutMap, bool) {
    if settings.homer_mode {
        (cuts.zip(settings.homer_adj, |c, a| c + a), true)
    } else {
        (cuts, false)
    }
}

/// Live prediction for (subject, round). Pure read; reflects whatever is
/// committed at call time. Grade-only placeholder rows (NULL total) are not
/// samples and do not count toward the submission total.
pub fn predict_cuts(
    conn: &Connection,
    settings: &SubjectSettings,
    subject: &str,
    round: i64,
) -> Result<Prediction, PredictError> {
    let mut stmt = conn
        .prepare(
            "SELECT total, prev_grade FROM submissions
             WHERE subject = ? AND round = ? AND total IS NOT NULL",
        )
        .map_err(|e| PredictError::new("db_query_failed", e.to_string()))?;
    let samples: Vec<(f64, i64)> = stmt
        .query_map((subject, round), |r| {
            let total: f64 = r.get(0)?;
            let prev_grade: Option<i64> = r.get(1)?;
            Ok((total, prev_grade.unwrap_or(5)))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(|e| PredictError::new("db_query_failed", e.to_string()))?;

    let cuts = cuts_from_samples(settings, &samples);
    let (homer_cuts, homer_active) = apply_homer(settings, cuts);
    Ok(Prediction {
        cuts,
        homer_cuts,
        submission_count: samples.len(),
        homer_active,
    })
}

/// Blended end-of-term cut per grade, from whichever exam cut set is
/// authoritative for display.
pub fn term_cuts(settings: &SubjectSettings, exam_cuts: CutMap) -> CutMap {
    let blend = |exam: f64, mid: f64, adj: f64| {
        round2(exam * EXAM_WEIGHT + mid * MID_WEIGHT + TERM_BASE_POINTS + adj)
    };
    CutMap::new(
        blend(exam_cuts.g1, settings.term_mid_cuts.g1, settings.term_adj.g1),
        blend(exam_cuts.g2, settings.term_mid_cuts.g2, settings.term_adj.g2),
        blend(exam_cuts.g3, settings.term_mid_cuts.g3, settings.term_adj.g3),
    )
}

/// A student's composite end-of-term score.
pub fn term_score(total: f64, mid_score: f64, perf_score: f64) -> f64 {
    round2(total * EXAM_WEIGHT + mid_score * MID_WEIGHT + perf_score)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictedGrade {
    G1,
    G2,
    G3,
    Below,
}

impl PredictedGrade {
    pub fn label(self) -> &'static str {
        match self {
            Self::G1 => "1",
            Self::G2 => "2",
            Self::G3 => "3",
            Self::Below => "4-",
        }
    }
}

/// Classify a score against a descending cut ladder.
pub fn classify(score: f64, cuts: &CutMap) -> PredictedGrade {
    if score >= cuts.g1 {
        PredictedGrade::G1
    } else if score >= cuts.g2 {
        PredictedGrade::G2
    } else if score >= cuts.g3 {
        PredictedGrade::G3
    } else {
        PredictedGrade::Below
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SubjectDef;

    const DEF: SubjectDef = SubjectDef {
        objective: 2,
        subjective: 0,
    };

    fn calibrated() -> SubjectSettings {
        let mut s = SubjectSettings::defaults_for(DEF);
        s.prev_avg = 60.0;
        s.prev_cuts = CutMap::new(90.0, 80.0, 70.0);
        s.cut_weights = CutMap::new(1.0, 1.2, 1.5);
        s
    }

    /// One sample per bucket pins every bucket average, so cur_avg is the
    /// weighted sum of the sample totals directly.
    fn samples_with_cur_avg(avg: f64) -> Vec<(f64, i64)> {
        (1..=5).map(|g| (avg, g)).collect()
    }

    #[test]
    fn no_samples_returns_prior_cuts_unchanged() {
        let mut s = calibrated();
        s.cut_weights = CutMap::new(9.0, 9.0, 9.0);
        s.prev_avg = -100.0;
        let cuts = cuts_from_samples(&s, &[]);
        assert_eq!(cuts, s.prev_cuts);
    }

    #[test]
    fn delta_of_five_shifts_cuts_by_weights() {
        let s = calibrated();
        let cuts = cuts_from_samples(&s, &samples_with_cur_avg(65.0));
        assert_eq!(cuts, CutMap::new(95.0, 86.0, 77.5));
    }

    #[test]
    fn empty_bucket_falls_back_to_assumed_average() {
        let mut s = calibrated();
        s.bucket_avg_prediction.b1 = 95.0;
        s.bucket_avg_prediction.b2 = 85.0;
        s.bucket_avg_prediction.b3 = 75.0;
        s.bucket_avg_prediction.b4 = 65.0;
        s.bucket_avg_prediction.b5 = 55.0;
        // Single bucket-3 sample; all other buckets use the assumed averages.
        let cuts = cuts_from_samples(&s, &[(75.0, 3)]);
        // cur_avg = 95*.1 + 85*.24 + 75*.32 + 65*.24 + 55*.1 = 75.0
        let delta = 75.0 - 60.0;
        assert_eq!(cuts.g1, round1(90.0 + delta));
        assert_eq!(cuts.g2, round1(80.0 + delta * 1.2));
        assert_eq!(cuts.g3, round1(70.0 + delta * 1.5));
    }

    #[test]
    fn cuts_are_monotonic_in_cohort_average() {
        let s = calibrated();
        let lo = cuts_from_samples(&s, &samples_with_cur_avg(62.0));
        let hi = cuts_from_samples(&s, &samples_with_cur_avg(68.0));
        assert!(hi.g1 > lo.g1);
        assert!(hi.g2 > lo.g2);
        assert!(hi.g3 > lo.g3);
    }

    #[test]
    fn homer_cuts_equal_real_cuts_when_disabled() {
        let mut s = calibrated();
        s.homer_adj = CutMap::new(3.0, 2.0, 1.0);
        s.homer_mode = false;
        let cuts = cuts_from_samples(&s, &samples_with_cur_avg(65.0));
        let (homer, active) = super::apply_homer(&s, cuts);
        assert!(!active);
        assert_eq!(homer, cuts);

        s.homer_mode = true;
        let (homer, active) = super::apply_homer(&s, cuts);
        assert!(active);
        assert_eq!(homer, CutMap::new(98.0, 88.0, 78.5));
    }

    #[test]
    fn term_cut_blends_exam_and_mid_with_baseline() {
        let mut s = calibrated();
        s.term_mid_cuts = CutMap::new(90.0, 80.0, 70.0);
        let cuts = term_cuts(&s, CutMap::new(95.0, 86.0, 77.5));
        assert_eq!(cuts.g1, 95.5);
        assert_eq!(cuts.g2, round2(86.0 * 0.3 + 80.0 * 0.3 + 40.0));
        assert_eq!(cuts.g3, round2(77.5 * 0.3 + 70.0 * 0.3 + 40.0));

        s.term_adj = CutMap::new(-1.0, 0.5, 0.0);
        let adjusted = term_cuts(&s, CutMap::new(95.0, 86.0, 77.5));
        assert_eq!(adjusted.g1, 94.5);
        assert_eq!(adjusted.g2, round2(cuts.g2 + 0.5));
        assert_eq!(adjusted.g3, cuts.g3);
    }

    #[test]
    fn term_score_rounds_to_two_decimals() {
        assert_eq!(term_score(77.5, 81.0, 36.5), round2(77.5 * 0.3 + 81.0 * 0.3 + 36.5));
        assert_eq!(term_score(100.0, 100.0, 40.0), 100.0);
    }

    #[test]
    fn classification_walks_cuts_descending() {
        let cuts = CutMap::new(95.5, 89.3, 82.25);
        assert_eq!(classify(97.0, &cuts), PredictedGrade::G1);
        assert_eq!(classify(95.5, &cuts), PredictedGrade::G1);
        assert_eq!(classify(90.0, &cuts), PredictedGrade::G2);
        assert_eq!(classify(82.25, &cuts), PredictedGrade::G3);
        assert_eq!(classify(82.24, &cuts), PredictedGrade::Below);
        assert_eq!(PredictedGrade::Below.label(), "4-");
    }
}
