//! unmerge_and_fill_cells against worksheets with merged regions

use rstest::rstest;

use treesheet::sheet::UnmergeReport;
use treesheet::util::testing;
use treesheet::{unmerge_and_fill_cells, CellRef, CellValue, Range, SheetError, Worksheet};

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

fn range(a1: &str) -> Range {
    Range::from_a1(a1).unwrap()
}

fn cell(a1: &str) -> CellRef {
    CellRef::from_a1(a1).unwrap()
}

#[rstest]
fn given_2x2_region_when_unmerge_then_each_cell_holds_anchor_value() {
    let mut sheet = Worksheet::new("Sheet1", 5, 5).unwrap();
    sheet.set_value(cell("A1"), "X".into()).unwrap();
    sheet.merge_range(range("A1:B2")).unwrap();

    let report = unmerge_and_fill_cells(&mut sheet).unwrap();

    assert_eq!(report, UnmergeReport { regions: 1, cells_written: 4 });
    for a1 in ["A1", "A2", "B1", "B2"] {
        assert_eq!(sheet.stored_value(cell(a1)), Some(&CellValue::from("X")));
    }
    assert!(sheet.merged_regions().is_empty());
    assert_eq!(sheet.iter_cells().count(), 4);

    // cells are independent now
    sheet.set_value(cell("B2"), "Y".into()).unwrap();
    assert_eq!(sheet.value(cell("A1")), CellValue::from("X"));
    assert_eq!(sheet.value(cell("B2")), CellValue::from("Y"));
}

#[rstest]
fn given_no_merged_regions_when_unmerge_then_noop() {
    let mut sheet = Worksheet::new("Sheet1", 3, 3).unwrap();
    sheet.set_value(cell("B2"), 2.5.into()).unwrap();
    let before = sheet.clone();

    let report = unmerge_and_fill_cells(&mut sheet).unwrap();

    assert_eq!(report, UnmergeReport::default());
    assert_eq!(sheet, before);
}

#[rstest]
fn given_several_regions_when_unmerge_then_all_filled_independently() {
    let mut sheet = Worksheet::new("Sheet1", 10, 10).unwrap();
    sheet.set_value(cell("A1"), "head".into()).unwrap();
    sheet.set_value(cell("D4"), true.into()).unwrap();
    sheet.set_value(cell("J10"), "untouched".into()).unwrap();
    sheet.merge_range(range("A1:C1")).unwrap();
    sheet.merge_range(range("D4:D6")).unwrap();

    let report = unmerge_and_fill_cells(&mut sheet).unwrap();

    assert_eq!(report.regions, 2);
    assert_eq!(report.cells_written, 6);
    assert_eq!(sheet.value(cell("C1")), CellValue::from("head"));
    assert_eq!(sheet.value(cell("D6")), CellValue::Boolean(true));
    assert_eq!(sheet.value(cell("J10")), CellValue::from("untouched"));
    assert_eq!(sheet.value(cell("D7")), CellValue::Empty);
}

#[rstest]
fn given_empty_anchor_when_unmerge_then_region_cells_empty() {
    let mut sheet = Worksheet::from_parts(
        "Sheet1",
        4,
        4,
        [(cell("B2"), CellValue::from("stale"))],
        [range("A1:B2")],
    )
    .unwrap();

    unmerge_and_fill_cells(&mut sheet).unwrap();

    for c in range("A1:B2").cells() {
        assert_eq!(sheet.stored_value(c), None);
        assert_eq!(sheet.value(c), CellValue::Empty);
    }
    assert!(sheet.merged_regions().is_empty());
}

#[rstest]
#[case::overlapping(vec![range("A1:B2"), range("B2:C3")])]
#[case::out_of_bounds(vec![range("A1:A2"), range("C3:E3")])]
fn given_invalid_regions_when_unmerge_then_error_and_sheet_untouched(#[case] regions: Vec<Range>) {
    let mut sheet = Worksheet::from_parts(
        "Sheet1",
        3,
        3,
        [
            (cell("A1"), CellValue::from("a")),
            (cell("B2"), CellValue::from("b")),
        ],
        regions,
    )
    .unwrap();
    let before = sheet.clone();

    let err = unmerge_and_fill_cells(&mut sheet).unwrap_err();

    assert!(matches!(err, SheetError::InvalidRegion { .. }));
    assert_eq!(sheet, before);
}

#[rstest]
fn given_out_of_bounds_region_when_unmerge_then_error_names_region() {
    let mut sheet = Worksheet::from_parts("Sheet1", 2, 2, Vec::new(), [range("A1:C1")]).unwrap();

    let err = unmerge_and_fill_cells(&mut sheet).unwrap_err();

    assert_eq!(
        err.to_string(),
        "Invalid merged region A1:C1: exceeds worksheet bounds (2 rows x 2 columns)"
    );
}

#[rstest]
fn given_reversed_corners_when_unmerge_then_whole_region_filled() {
    let reversed = Range {
        start: cell("B2"),
        end: cell("A1"),
    };
    let mut sheet =
        Worksheet::from_parts("Sheet1", 3, 3, [(cell("A1"), CellValue::from("X"))], [reversed]).unwrap();
    assert_eq!(sheet.merged_regions()[0].anchor(), cell("A1"));

    let report = unmerge_and_fill_cells(&mut sheet).unwrap();

    assert_eq!(report, UnmergeReport { regions: 1, cells_written: 4 });
    for a1 in ["A1", "A2", "B1", "B2"] {
        assert_eq!(sheet.stored_value(cell(a1)), Some(&CellValue::from("X")));
    }
    assert!(sheet.merged_regions().is_empty());
}

#[rstest]
fn given_region_at_u32_max_column_when_unmerge_then_error_formats() {
    let huge = Range::new(cell("A1"), CellRef::new(0, u32::MAX));
    let mut sheet = Worksheet::from_parts("Sheet1", 2, 2, Vec::new(), [huge]).unwrap();

    let err = unmerge_and_fill_cells(&mut sheet).unwrap_err();

    assert!(matches!(err, SheetError::InvalidRegion { .. }));
    assert_eq!(
        err.to_string(),
        "Invalid merged region A1:MWLQKWV1: exceeds worksheet bounds (2 rows x 2 columns)"
    );
}
