use itertools::Itertools;
use tracing::{debug, instrument};

use crate::errors::{SheetError, SheetResult};
use crate::sheet::worksheet::{MergedRegion, Worksheet};

/// Outcome of [`unmerge_and_fill_cells`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnmergeReport {
    /// Merged regions dissolved
    pub regions: usize,
    /// Cells written with an anchor value (anchors included)
    pub cells_written: usize,
}

/// Dissolves every merged region of `worksheet` in place, writing each
/// region's anchor value into all of its cells.
///
/// All regions are validated first. If any region leaves the grid or
/// overlaps another, [`SheetError::InvalidRegion`] is returned and the
/// worksheet is left exactly as it was. An empty anchor clears the region.
#[instrument(level = "debug", skip(worksheet), fields(sheet = %worksheet.name()))]
pub fn unmerge_and_fill_cells(worksheet: &mut Worksheet) -> SheetResult<UnmergeReport> {
    validate_regions(worksheet)?;

    let mut report = UnmergeReport::default();
    for region in worksheet.take_merged_regions() {
        let anchor_value = worksheet
            .stored_value(region.anchor())
            .cloned()
            .unwrap_or_default();
        for cell in region.range.cells() {
            worksheet.put(cell, anchor_value.clone());
            report.cells_written += 1;
        }
        report.regions += 1;
        debug!(region = %region, "unmerged");
    }
    Ok(report)
}

fn validate_regions(worksheet: &Worksheet) -> SheetResult<()> {
    let regions = worksheet.merged_regions();
    if let Some(region) = regions.iter().find(|r| !worksheet.contains_range(&r.range)) {
        return Err(SheetError::InvalidRegion {
            region: region.range,
            reason: format!(
                "exceeds worksheet bounds ({} rows x {} columns)",
                worksheet.rows(),
                worksheet.cols()
            ),
        });
    }
    if let Some((a, b)) = regions
        .iter()
        .tuple_combinations::<(&MergedRegion, &MergedRegion)>()
        .find(|(a, b)| a.range.intersects(&b.range))
    {
        return Err(SheetError::InvalidRegion {
            region: b.range,
            reason: format!("overlaps merged region {}", a),
        });
    }
    Ok(())
}
