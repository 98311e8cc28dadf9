//! Target discovery and composite scoring (spec §4.5 steps 1-3).

use crate::error::RepurposeError;
use crate::sources::opentargets::{AssociatedTargetRow, OpenTargetsClient};

pub const PAGE_SIZE: u32 = 100;
pub const HARD_SAFETY_CAP: usize = 50_000;
pub const DEFAULT_MIN_TARGETS: usize = 20;
pub const DEFAULT_MAX_TARGETS: usize = 50;
pub const DEFAULT_TOP_PERCENT: f64 = 0.10;

/// Small-molecule modality tractability mapping (spec §4.5 step 2).
fn tractability_value(labels: &[String]) -> f64 {
    let has = |needle: &str| labels.iter().any(|l| l.eq_ignore_ascii_case(needle));
    if has("Approved") {
        1.0
    } else if has("Clinical") || labels.iter().any(|l| l.to_ascii_lowercase().starts_with("phase")) {
        0.7
    } else if has("Discovery") {
        0.4
    } else if has("Predicted") {
        0.2
    } else {
        0.0
    }
}

#[derive(Debug, Clone)]
pub struct ScoredRow {
    pub row: AssociatedTargetRow,
    pub evidence_diversity: usize,
    pub tractability: f64,
    pub composite_score: f64,
}

/// spec §4.5 step 1: pages until a short page or the hard safety cap.
pub async fn fetch_all_pages(
    client: &OpenTargetsClient,
    efo_id: &str,
) -> Result<Vec<AssociatedTargetRow>, RepurposeError> {
    let mut rows = Vec::new();
    let mut index = 0u32;
    loop {
        let page = client.disease_targets_page(efo_id, index, PAGE_SIZE).await?;
        if page.is_empty() {
            break;
        }
        let page_len = page.len();
        rows.extend(page);
        if rows.len() >= HARD_SAFETY_CAP || (page_len as u32) < PAGE_SIZE {
            break;
        }
        index += 1;
    }
    Ok(rows)
}

/// spec §4.5 steps 2-3: per-dimension min-max normalized composite, sorted
/// descending, truncated to `max(min_targets, top_percent%)`, filtered to
/// `protein_coding` rows with a positive base score, capped at `max_targets`.
pub fn score_and_filter(
    rows: Vec<AssociatedTargetRow>,
    min_targets: usize,
    max_targets: usize,
    top_percent: f64,
) -> Vec<ScoredRow> {
    if rows.is_empty() {
        return Vec::new();
    }

    let diversities: Vec<usize> = rows
        .iter()
        .map(|r| r.datatype_scores.iter().filter(|(_, s)| *s > 0.0).count())
        .collect();
    let tractabilities: Vec<f64> = rows.iter().map(|r| tractability_value(&r.tractability_labels)).collect();
    let base_scores: Vec<f64> = rows.iter().map(|r| r.score).collect();

    let base_range = min_max(&base_scores);
    let evidence_range = min_max(&diversities.iter().map(|d| *d as f64).collect::<Vec<_>>());
    let tractability_range = min_max(&tractabilities);

    let mut scored: Vec<ScoredRow> = rows
        .into_iter()
        .zip(diversities)
        .zip(tractabilities)
        .map(|((row, evidence_diversity), tractability)| {
            let base_norm = normalize(row.score, base_range);
            let evidence_norm = normalize(evidence_diversity as f64, evidence_range);
            let tractability_norm = normalize(tractability, tractability_range);
            let composite_score = 0.7 * base_norm + 0.2 * evidence_norm + 0.1 * tractability_norm;
            ScoredRow {
                row,
                evidence_diversity,
                tractability,
                composite_score,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.composite_score
            .partial_cmp(&a.composite_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let top_percent_count = (scored.len() as f64 * top_percent).ceil() as usize;
    let keep_count = min_targets.max(top_percent_count);
    scored.truncate(keep_count);

    scored.retain(|s| s.row.biotype == "protein_coding" && s.row.score > 0.0);
    scored.truncate(max_targets);
    scored
}

fn min_max(values: &[f64]) -> (f64, f64) {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    (min, max)
}

fn normalize(value: f64, (min, max): (f64, f64)) -> f64 {
    if (max - min).abs() < f64::EPSILON {
        0.0
    } else {
        (value - min) / (max - min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, biotype: &str, score: f64, datatypes: usize, labels: &[&str]) -> AssociatedTargetRow {
        AssociatedTargetRow {
            target_id: id.to_string(),
            approved_symbol: id.to_string(),
            biotype: biotype.to_string(),
            score,
            datatype_scores: (0..datatypes).map(|i| (format!("dt{i}"), 0.5)).collect(),
            tractability_labels: labels.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn score_and_filter_drops_non_protein_coding_and_zero_score() {
        let rows = vec![
            row("A", "protein_coding", 0.9, 3, &["Approved"]),
            row("B", "lncRNA", 0.9, 3, &["Approved"]),
            row("C", "protein_coding", 0.0, 1, &[]),
        ];
        let scored = score_and_filter(rows, 1, 50, 1.0);
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].row.target_id, "A");
    }

    #[test]
    fn score_and_filter_ranks_higher_base_score_first() {
        let rows = vec![
            row("Low", "protein_coding", 0.1, 0, &[]),
            row("High", "protein_coding", 0.9, 3, &["Approved"]),
        ];
        let scored = score_and_filter(rows, 2, 50, 1.0);
        assert_eq!(scored[0].row.target_id, "High");
    }

    #[test]
    fn keep_count_respects_min_targets_floor() {
        let rows: Vec<_> = (0..5)
            .map(|i| row(&format!("T{i}"), "protein_coding", 0.1 * (i as f64 + 1.0), 1, &["Discovery"]))
            .collect();
        // top_percent of 10% over 5 rows rounds to 1, but min_targets=3 should win.
        let scored = score_and_filter(rows, 3, 50, 0.10);
        assert_eq!(scored.len(), 3);
    }
}
