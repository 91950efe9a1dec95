//! nhmmer output parser.
//!
//! Reads the per-target section of nhmmer's human-readable output:
//!
//! ```text
//! >> URS0000000001_9606  Homo sapiens let-7a
//!     score  bias    Evalue   hmmfrom    hmm to     alifrom    ali to      envfrom    env to       sq len      acc
//!    ------ ----- ---------   -------   -------    --------- ---------    --------- ---------    ---------    ----
//!  !   45.6   0.1   1.2e-12         1        22 []         1        22 []         1        22 []        22    0.99
//!
//!   Alignment:
//!   score: 45.6 bits
//!               query   1 UGAGGUAGUAGGUUGUAUAGUU 22
//!                         UGAGGUAGUAGGUUGUAUAGUU
//!   URS0000000001_9606   1 UGAGGUAGUAGGUUGUAUAGUU 22
//!                         9999999999999999999999 PP
//! ```
//!
//! Each score row paired with its alignment becomes one [`SearchHit`].
//! Alignment blocks are groups of four lines (query, match, target and
//! posterior probabilities) separated by blank lines.

use tracing::warn;

use super::SearchHit;
use crate::{Error, Result};

// Columns of a score row after the `!`/`?` marker. Bracket flags such as
// `[]` or `..` sit between the coordinate pairs.
const COL_SCORE: usize = 1;
const COL_BIAS: usize = 2;
const COL_EVALUE: usize = 3;
const COL_SQ_LEN: usize = 13;

#[derive(Debug, Default)]
struct Target {
    name: String,
    description: String,
    rows: Vec<ScoreRow>,
    alignments: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy)]
struct ScoreRow {
    score: f64,
    bias: f64,
    e_value: f64,
    target_length: u64,
}

fn parse_row(line: &str) -> Option<ScoreRow> {
    let cols: Vec<&str> = line.split_whitespace().collect();
    Some(ScoreRow {
        score: cols.get(COL_SCORE)?.parse().ok()?,
        bias: cols.get(COL_BIAS)?.parse().ok()?,
        e_value: cols.get(COL_EVALUE)?.parse().ok()?,
        target_length: cols.get(COL_SQ_LEN)?.parse().ok()?,
    })
}

/// Query length from the `Query: name [M=22]` header line.
fn header_query_length(output: &str) -> Option<u64> {
    output
        .lines()
        .find(|l| l.starts_with("Query:"))
        .and_then(|l| l.split("[M=").nth(1))
        .and_then(|rest| rest.split(']').next())
        .and_then(|n| n.trim().parse().ok())
}

fn ends_alignment(trimmed: &str) -> bool {
    trimmed.starts_with(">>")
        || trimmed.starts_with("Internal pipeline statistics")
        || trimmed == "//"
        || trimmed == "[ok]"
}

/// Sequence column of a `name start SEQUENCE end` alignment line.
fn aligned_sequence(line: &str) -> &str {
    let cols: Vec<&str> = line.split_whitespace().collect();
    match cols.len() {
        n if n >= 4 => cols[n - 2],
        _ => "",
    }
}

/// Percentage, `0` when the denominator is zero.
fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn is_gap(c: u8) -> bool {
    c == b'-' || c == b'.'
}

/// Alignment statistics of one aligned pair.
#[derive(Debug, Default, PartialEq, Eq)]
struct AlignmentStats {
    alignment_length: u64,
    match_count: u64,
    gap_count: u64,
    nts_count1: u64,
    nts_count2: u64,
}

fn alignment_stats(query: &str, target: &str) -> AlignmentStats {
    let mut stats = AlignmentStats {
        alignment_length: query.len().max(target.len()) as u64,
        ..AlignmentStats::default()
    };
    let q = query.as_bytes();
    let t = target.as_bytes();
    for i in 0..q.len().max(t.len()) {
        let a = q.get(i).copied().unwrap_or(b'-');
        let b = t.get(i).copied().unwrap_or(b'-');
        if !is_gap(a) {
            stats.nts_count1 += 1;
        }
        if !is_gap(b) {
            stats.nts_count2 += 1;
        }
        if is_gap(a) || is_gap(b) {
            stats.gap_count += 1;
        } else if a.eq_ignore_ascii_case(&b) {
            stats.match_count += 1;
        }
    }
    stats
}

/// Four-line blocks of an alignment: query, match, target and PP rows.
///
/// A block starts at the first non-blank line after a separator. The match
/// row is taken by position since it is all spaces when no column agrees.
fn alignment_blocks(lines: &[String]) -> Vec<&[String]> {
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if lines[i].trim().is_empty() {
            i += 1;
            continue;
        }
        let end = (i + 4).min(lines.len());
        blocks.push(&lines[i..end]);
        i = end;
    }
    blocks
}

/// Query and target sequences of the blocks, concatenated.
fn join_alignment(blocks: &[&[String]]) -> (String, String) {
    let mut query = String::new();
    let mut target = String::new();
    for block in blocks {
        if let Some(line) = block.first() {
            query.push_str(aligned_sequence(line));
        }
        if let Some(line) = block.get(2) {
            target.push_str(aligned_sequence(line));
        }
    }
    (query, target)
}

fn collect_targets(output: &str) -> Vec<Target> {
    let mut targets: Vec<Target> = Vec::new();
    let mut in_alignment = false;

    for line in output.lines() {
        let trimmed = line.trim();
        if in_alignment && ends_alignment(trimmed) {
            in_alignment = false;
        }

        if let Some(rest) = trimmed.strip_prefix(">>") {
            let rest = rest.trim();
            let (name, description) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            targets.push(Target {
                name: name.to_string(),
                description: description.trim().to_string(),
                ..Target::default()
            });
            continue;
        }
        let Some(target) = targets.last_mut() else {
            continue;
        };

        if trimmed == "Alignment:" {
            target.alignments.push(Vec::new());
            in_alignment = true;
        } else if in_alignment {
            if trimmed.starts_with("score:") {
                continue;
            }
            if let Some(block) = target.alignments.last_mut() {
                block.push(line.to_string());
            }
        } else if trimmed.starts_with('!') || trimmed.starts_with('?') {
            match parse_row(trimmed) {
                Some(row) => target.rows.push(row),
                None => warn!(line = trimmed, "Unparseable nhmmer score row"),
            }
        }
    }
    targets
}

/// Parse nhmmer output into hits numbered from 1 in output order.
///
/// `query_length` is used when the output has no `Query:` header.
pub fn parse_nhmmer_output(output: &str, query_length: u64) -> Result<Vec<SearchHit>> {
    let query_length = header_query_length(output).unwrap_or(query_length);
    let mut hits = Vec::new();

    for target in collect_targets(output) {
        if target.rows.len() != target.alignments.len() && !target.alignments.is_empty() {
            return Err(Error::invalid(
                hits.len(),
                format!(
                    "{}: {} score rows but {} alignments",
                    target.name,
                    target.rows.len(),
                    target.alignments.len()
                ),
            ));
        }
        for (i, row) in target.rows.iter().enumerate() {
            let lines = target.alignments.get(i).map(Vec::as_slice).unwrap_or_default();
            let blocks = alignment_blocks(lines);
            let (query, aligned_target) = join_alignment(&blocks);
            let stats = alignment_stats(&query, &aligned_target);
            hits.push(SearchHit {
                result_id: hits.len() as u64 + 1,
                rnacentral_id: target.name.clone(),
                description: target.description.clone(),
                bias: row.bias,
                target_length: row.target_length,
                query_length,
                alignment: blocks.concat().join("\n"),
                score: row.score,
                e_value: row.e_value,
                match_count: stats.match_count,
                gap_count: stats.gap_count,
                alignment_length: stats.alignment_length,
                nts_count1: stats.nts_count1,
                nts_count2: stats.nts_count2,
                identity: percent(stats.match_count, stats.alignment_length),
                query_coverage: percent(stats.nts_count1, query_length),
                target_coverage: percent(stats.nts_count2, row.target_length),
                gaps: percent(stats.gap_count, stats.alignment_length),
            });
        }
    }
    Ok(hits)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    const OUTPUT: &str = "\
# nhmmer :: search a DNA model, alignment, or sequence against a DNA database
Query:       query  [M=22]
Scores for complete hits:
    E-value  score  bias  Sequence           start    end  Description
    ------- ------ -----  --------           -----  -----  -----------
    1.2e-12   45.6   0.1  URS0000000001_9606     1     22  Homo sapiens let-7a


Annotation for each hit  (and alignments):
>> URS0000000001_9606  Homo sapiens let-7a
    score  bias    Evalue   hmmfrom    hmm to     alifrom    ali to      envfrom    env to       sq len      acc
   ------ ----- ---------   -------   -------    --------- ---------    --------- ---------    ---------    ----
 !   45.6   0.1   1.2e-12         1        22 []         1        22 []         1        22 []        22    0.99

  Alignment:
  score: 45.6 bits
               query  1 UGAGGUAGUAGGUUGUAUAGUU 22
                        UGAGGUAGUAGGUUGUAUAGUU
  URS0000000001_9606  1 UGAGGUAGUAGGUUGUAUAGUU 22
                        9999999999999999999999 PP

>> URS0000000002_10090  Mus musculus let-7b
    score  bias    Evalue   hmmfrom    hmm to     alifrom    ali to      envfrom    env to       sq len      acc
   ------ ----- ---------   -------   -------    --------- ---------    --------- ---------    ---------    ----
 !   30.2   0.0   4.5e-07         1        22 []         3        22 ..         1        22 []        40    0.95

  Alignment:
  score: 30.2 bits
               query  1 UGAGGUAGUAGGUUGUAUAGUU 22
                        UGAGGUAG AGG UGU UAGUU
  URS0000000002_10090  3 ugaggUAG-AGGuUGUgUAGUU 22
                        7899999905999999999999 PP



Internal pipeline statistics summary:
-------------------------------------
//
[ok]
";

    #[test]
    fn parses_each_hit() {
        let hits = parse_nhmmer_output(OUTPUT, 0).unwrap();
        assert_eq!(hits.len(), 2);

        let first = &hits[0];
        assert_eq!(first.result_id, 1);
        assert_eq!(first.rnacentral_id, "URS0000000001_9606");
        assert_eq!(first.description, "Homo sapiens let-7a");
        assert_eq!(first.query_length, 22);
        assert_eq!(first.target_length, 22);
        assert!((first.score - 45.6).abs() < 1e-9);
        assert!((first.e_value - 1.2e-12).abs() < 1e-20);
        assert_eq!(first.alignment_length, 22);
        assert_eq!(first.match_count, 22);
        assert_eq!(first.gap_count, 0);
        assert!((first.identity - 100.0).abs() < 1e-9);
        assert!((first.query_coverage - 100.0).abs() < 1e-9);
        assert_eq!(first.alignment.lines().count(), 4);
    }

    #[test]
    fn counts_gaps_and_mismatches() {
        let hits = parse_nhmmer_output(OUTPUT, 0).unwrap();
        let second = &hits[1];
        assert_eq!(second.result_id, 2);
        assert_eq!(second.target_length, 40);
        assert_eq!(second.alignment_length, 22);
        assert_eq!(second.gap_count, 1);
        // one gap and one substitution
        assert_eq!(second.match_count, 20);
        assert_eq!(second.nts_count1, 22);
        assert_eq!(second.nts_count2, 21);
        assert!((second.target_coverage - 52.5).abs() < 1e-9);
        assert!((second.gaps - 100.0 / 22.0).abs() < 1e-9);
    }

    #[test]
    fn empty_output_has_no_hits() {
        let hits =
            parse_nhmmer_output("[No hits detected that satisfy reporting thresholds]\n", 30)
                .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn stats_treat_dots_as_gaps() {
        let stats = alignment_stats("AC.GU", "ACAGU");
        assert_eq!(stats.gap_count, 1);
        assert_eq!(stats.match_count, 4);
        assert_eq!(stats.nts_count1, 4);
        assert_eq!(stats.nts_count2, 5);
    }

    #[test]
    fn blank_match_row_keeps_target_row() {
        let output = "\
Query:       query  [M=8]
>> URS0000000009_9606  unrelated
 !   10.0   0.0   1.0e-01         1         8 []         1         8 []         1         8 []         8    0.50

  Alignment:
  score: 10.0 bits
               query  1 AAAAAAAA 8
                                
  URS0000000009_9606  1 CCCCCCCC 8
                        55555555 PP

//
";
        let hits = parse_nhmmer_output(output, 0).unwrap();
        assert_eq!(hits.len(), 1);
        let hit = &hits[0];
        assert_eq!(hit.alignment_length, 8);
        assert_eq!(hit.match_count, 0);
        assert_eq!(hit.gap_count, 0);
        assert_eq!(hit.nts_count1, 8);
        assert_eq!(hit.nts_count2, 8);
        assert!((hit.target_coverage - 100.0).abs() < 1e-9);
        assert_eq!(hit.alignment.lines().count(), 4);
    }

    #[test]
    fn multi_block_alignment_is_joined() {
        let lines: Vec<String> = [
            "  query  1 ACGU 4",
            "           ACGU",
            "  URS0000000001_9606  1 ACGU 4",
            "           9999 PP",
            "",
            "  query  5 AC-U 7",
            "",
            "  URS0000000001_9606  5 ACGU 8",
            "           9999 PP",
            "",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        let blocks = alignment_blocks(&lines);
        assert_eq!(blocks.len(), 2);
        let (query, target) = join_alignment(&blocks);
        assert_eq!(query, "ACGUAC-U");
        assert_eq!(target, "ACGUACGU");
    }
}
