//! Eigenvalue buckling summary: `mode multiplier` rows among free text.

use super::Artifact;
use crate::error::{IngestError, IngestResult};
use fe_results::EigenvalueBucklingSummary;
use regex::Regex;

const ROW_PATTERN: &str = r"^\s*(?<mode>\d+)\s*(?<mult>[\-\+\.\deE]+)";

pub fn eigenvalue_summary(artifact: &Artifact<'_>) -> IngestResult<EigenvalueBucklingSummary> {
    let row_re = Regex::new(ROW_PATTERN)?;
    let mut summary = EigenvalueBucklingSummary::default();

    for (line_no, line) in artifact.lines() {
        let Some(caps) = row_re.captures(line) else {
            continue;
        };
        let mode: u32 = caps["mode"]
            .parse()
            .map_err(|_| artifact.error(line_no, format!("mode {:?} is not an integer", &caps["mode"])))?;
        let multiplier = artifact.number(line_no, &caps["mult"], "multiplier")?;
        summary.multipliers.insert(mode, multiplier);
    }

    if summary.is_empty() {
        return Err(IngestError::EmptyEigenvalueSummary {
            file: artifact.name.to_string(),
        });
    }
    Ok(summary)
}
