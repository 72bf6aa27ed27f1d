//! Defined-name region resolution at workbook and worksheet scope.

use umya_spreadsheet::{DefinedName, Workbook};

use crate::spec::SpecNamedRegion;
use crate::util::{parse_range_part, split_address_parts};

/// Find all regions carrying `range_name`, case-insensitively.
///
/// Workbook-scoped names come first, then worksheet-scoped names across all
/// sheets. An empty result is not an error here; callers decide.
pub fn find_named_regions(book: &Workbook, range_name: &str) -> Vec<SpecNamedRegion> {
    let mut l_regions = Vec::new();

    for defined in book.get_defined_names() {
        if defined.get_name().eq_ignore_ascii_case(range_name) {
            l_regions.push(derive_region_from_defined_name(defined, None));
        }
    }
    for worksheet in book.get_sheet_collection() {
        for defined in worksheet.get_defined_names() {
            if defined.get_name().eq_ignore_ascii_case(range_name) {
                l_regions.push(derive_region_from_defined_name(
                    defined,
                    Some(worksheet.get_name()),
                ));
            }
        }
    }

    l_regions
}

/// Whether the region belongs to the requested worksheet (or no scope was set).
pub fn matches_worksheet(region: &SpecNamedRegion, sheet_name: Option<&str>) -> bool {
    match sheet_name {
        None => true,
        Some(c_sheet) => region
            .l_ranges
            .iter()
            .any(|range| range.sheet_name.eq_ignore_ascii_case(c_sheet)),
    }
}

fn derive_region_from_defined_name(
    defined: &DefinedName,
    sheet_name_fallback: Option<&str>,
) -> SpecNamedRegion {
    let c_address = defined.get_address();
    let l_ranges = split_address_parts(&c_address)
        .iter()
        .filter_map(|c_part| parse_range_part(c_part, sheet_name_fallback))
        .collect();

    SpecNamedRegion {
        name: defined.get_name().to_string(),
        l_ranges,
    }
}
