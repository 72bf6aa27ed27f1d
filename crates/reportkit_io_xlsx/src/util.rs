//! Stateless helper utilities used by the layout and template kernels.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use umya_spreadsheet::helper::coordinate::index_from_coordinate;

use crate::conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL, TUP_PATTERNS_DATE_TEXT,
    TUP_PATTERNS_DATETIME_TEXT,
};
use crate::spec::{
    EnumCellValue, EnumColumnVariant, EnumExtractedValue, SpecColumnDescriptor, SpecRangeRef,
};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueCoercion

/// Coerce one extracted value into its grid-native representation.
///
/// Text is probed as a plain decimal first and as a date second, so a
/// digit-only date string lands as a number. Already-typed values are never
/// re-parsed.
pub fn convert_extracted_value(value: &EnumExtractedValue) -> EnumCellValue {
    match value {
        EnumExtractedValue::None => EnumCellValue::None,
        EnumExtractedValue::Text(c_text) => {
            if let Some(n_value) = parse_decimal_text(c_text) {
                return EnumCellValue::Number(n_value);
            }
            if let Some(datetime) = parse_date_text(c_text) {
                return EnumCellValue::DateTime(datetime);
            }
            EnumCellValue::String(c_text.clone())
        }
        EnumExtractedValue::Integer(n_value) => EnumCellValue::Number(*n_value as f64),
        EnumExtractedValue::Float(n_value) => EnumCellValue::Number(*n_value),
        EnumExtractedValue::DateTime(datetime) => EnumCellValue::DateTime(*datetime),
        EnumExtractedValue::Duration(duration) => EnumCellValue::Duration(*duration),
        EnumExtractedValue::Boolean(if_value) => {
            EnumCellValue::String(if *if_value { "True" } else { "False" }.to_string())
        }
    }
}

/// Parse text as a plain signed decimal (digits and at most one point).
pub fn parse_decimal_text(text: &str) -> Option<f64> {
    let c_trimmed = text.trim();
    let c_digits = c_trimmed
        .strip_prefix(['+', '-'])
        .unwrap_or(c_trimmed);
    if c_digits.is_empty() {
        return None;
    }

    let mut n_points = 0usize;
    for chr in c_digits.chars() {
        match chr {
            '.' => n_points += 1,
            '0'..='9' => {}
            _ => return None,
        }
    }
    if n_points > 1 || c_digits == "." {
        return None;
    }

    c_trimmed.parse::<f64>().ok().filter(|val| val.is_finite())
}

/// Parse text against the configured date-time and date patterns, in order.
pub fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    let c_trimmed = text.trim();
    if c_trimmed.is_empty() {
        return None;
    }

    for c_pattern in TUP_PATTERNS_DATETIME_TEXT {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(c_trimmed, c_pattern) {
            return Some(datetime);
        }
    }
    for c_pattern in TUP_PATTERNS_DATE_TEXT {
        if let Ok(date) = NaiveDate::parse_from_str(c_trimmed, c_pattern) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DateSerialConversion

/// Convert a date-time into an Excel serial number (1899-12-30 epoch).
pub fn calculate_excel_serial_date(datetime: &NaiveDateTime) -> f64 {
    let datetime_epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .expect("epoch literal")
        .and_hms_opt(0, 0, 0)
        .expect("epoch literal");
    let duration = *datetime - datetime_epoch;
    duration.num_milliseconds() as f64 / 86_400_000.0
}

/// Convert an elapsed time into an Excel day fraction.
pub fn calculate_excel_serial_duration(duration: &Duration) -> f64 {
    duration.num_milliseconds() as f64 / 86_400_000.0
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DescriptorSpanArithmetic

/// Physical column span of one descriptor.
pub fn calculate_descriptor_span<T>(descriptor: &SpecColumnDescriptor<T>) -> u32 {
    match &descriptor.variant {
        EnumColumnVariant::Plain { .. } => 1,
        EnumColumnVariant::Multi { n_cols_total, .. } => *n_cols_total as u32,
        EnumColumnVariant::Paired {
            n_cols_total,
            if_show_second,
            ..
        } => *n_cols_total as u32 * if *if_show_second { 2 } else { 1 },
    }
}

/// Total physical column span of a descriptor set.
pub fn calculate_table_span<T>(descriptors: &[SpecColumnDescriptor<T>]) -> u32 {
    descriptors.iter().map(calculate_descriptor_span).sum()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TableRowPolicy

/// Resolve `(data_start_row, write_start_row)` from the anchor row.
///
/// | header row is named range | write headers | data start | write start |
/// |---------------------------|---------------|------------|-------------|
/// | true                      | true          | anchor + 1 | anchor      |
/// | true                      | false         | anchor + 1 | anchor + 1  |
/// | false                     | true          | anchor + 1 | anchor      |
/// | false                     | false         | anchor     | anchor      |
pub fn calculate_table_rows(
    n_row_anchor: u32,
    if_header_row_is_named_range: bool,
    if_write_headers: bool,
) -> (u32, u32) {
    match (if_header_row_is_named_range, if_write_headers) {
        (true, true) => (n_row_anchor + 1, n_row_anchor),
        (true, false) => (n_row_anchor + 1, n_row_anchor + 1),
        (false, true) => (n_row_anchor + 1, n_row_anchor),
        (false, false) => (n_row_anchor, n_row_anchor),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region NamedRangeAddressParsing

/// Split a defined-name address into parts on commas outside quoted sheet names.
pub fn split_address_parts(address: &str) -> Vec<String> {
    let mut l_parts = Vec::new();
    let mut c_current = String::new();
    let mut if_in_quotes = false;

    for chr in address.chars() {
        match chr {
            '\'' => {
                if_in_quotes = !if_in_quotes;
                c_current.push(chr);
            }
            ',' if !if_in_quotes => {
                l_parts.push(c_current.trim().to_string());
                c_current.clear();
            }
            _ => c_current.push(chr),
        }
    }
    l_parts.push(c_current.trim().to_string());

    l_parts.retain(|c_part| !c_part.is_empty());
    l_parts
}

/// Parse one address part (`'Sheet'!$A$1:$B$3`) into a rectangular range.
///
/// Returns `None` for formula-shaped parts and for references without a
/// resolvable sheet binding or cell corners.
pub fn parse_range_part(part: &str, sheet_name_fallback: Option<&str>) -> Option<SpecRangeRef> {
    let c_part = part.trim();
    let c_part = c_part.strip_prefix('=').unwrap_or(c_part).trim();
    if c_part.is_empty() || c_part.contains('(') {
        return None;
    }

    let (c_sheet_raw, c_coords) = match c_part.rsplit_once('!') {
        Some((c_sheet, c_coords)) => (Some(c_sheet.trim()), c_coords.trim()),
        None => (None, c_part),
    };
    let c_sheet_name = match c_sheet_raw {
        Some(c_raw) => unquote_sheet_name(c_raw),
        None => sheet_name_fallback?.to_string(),
    };

    let (c_corner_start, c_corner_end) = match c_coords.split_once(':') {
        Some((c_start, c_end)) => (c_start, c_end),
        None => (c_coords, c_coords),
    };
    let (n_col_a, n_row_a) = parse_corner(c_corner_start)?;
    let (n_col_b, n_row_b) = parse_corner(c_corner_end)?;

    Some(SpecRangeRef {
        sheet_name: c_sheet_name,
        n_col_start: u32::min(n_col_a, n_col_b),
        n_row_start: u32::min(n_row_a, n_row_b),
        n_col_end: u32::max(n_col_a, n_col_b),
        n_row_end: u32::max(n_row_a, n_row_b),
    })
}

fn parse_corner(corner: &str) -> Option<(u32, u32)> {
    let (n_col, n_row, _, _) = index_from_coordinate(corner.trim());
    Some((n_col?, n_row?))
}

fn unquote_sheet_name(raw: &str) -> String {
    let c_raw = raw.trim();
    match c_raw
        .strip_prefix('\'')
        .and_then(|c_rest| c_rest.strip_suffix('\''))
    {
        Some(c_inner) => c_inner.replace("''", "'"),
        None => c_raw.to_string(),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to a valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_probes_text_as_number_before_date() {
        assert_eq!(
            convert_extracted_value(&EnumExtractedValue::Text("3.14".to_string())),
            EnumCellValue::Number(3.14)
        );
        // Digit-only date strings land on the number arm.
        assert_eq!(
            convert_extracted_value(&EnumExtractedValue::Text("20240115".to_string())),
            EnumCellValue::Number(20_240_115.0)
        );

        let datetime = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            convert_extracted_value(&EnumExtractedValue::Text("2024-01-15".to_string())),
            EnumCellValue::DateTime(datetime)
        );
        assert_eq!(
            convert_extracted_value(&EnumExtractedValue::Text("order-17".to_string())),
            EnumCellValue::String("order-17".to_string())
        );
    }

    #[test]
    fn test_convert_keeps_typed_values_unparsed() {
        assert_eq!(
            convert_extracted_value(&EnumExtractedValue::Integer(42)),
            EnumCellValue::Number(42.0)
        );
        assert_eq!(
            convert_extracted_value(&EnumExtractedValue::Float(2.5)),
            EnumCellValue::Number(2.5)
        );
        assert_eq!(
            convert_extracted_value(&EnumExtractedValue::Boolean(true)),
            EnumCellValue::String("True".to_string())
        );
        assert_eq!(
            convert_extracted_value(&EnumExtractedValue::None),
            EnumCellValue::None
        );
    }

    #[test]
    fn test_parse_decimal_text_rejects_non_plain_forms() {
        assert_eq!(parse_decimal_text(" 12.5 "), Some(12.5));
        assert_eq!(parse_decimal_text("-7"), Some(-7.0));
        assert_eq!(parse_decimal_text("1e5"), None);
        assert_eq!(parse_decimal_text("12,5"), None);
        assert_eq!(parse_decimal_text("."), None);
        assert_eq!(parse_decimal_text(""), None);
        assert_eq!(parse_decimal_text("1.2.3"), None);
    }

    #[test]
    fn test_calculate_excel_serial_date_known_values() {
        let datetime = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(calculate_excel_serial_date(&datetime), 45_292.0);

        let datetime_noon = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(calculate_excel_serial_date(&datetime_noon), 45_292.5);
    }

    #[test]
    fn test_calculate_excel_serial_duration() {
        assert_eq!(calculate_excel_serial_duration(&Duration::hours(36)), 1.5);
        assert_eq!(calculate_excel_serial_duration(&Duration::minutes(90)), 0.0625);
    }

    #[test]
    fn test_calculate_table_rows_covers_all_policy_combinations() {
        assert_eq!(calculate_table_rows(5, true, true), (6, 5));
        assert_eq!(calculate_table_rows(5, true, false), (6, 6));
        assert_eq!(calculate_table_rows(5, false, true), (6, 5));
        assert_eq!(calculate_table_rows(5, false, false), (5, 5));
    }

    #[test]
    fn test_split_address_parts_respects_quoted_sheet_names() {
        assert_eq!(
            split_address_parts("Sheet1!$A$1,Sheet1!$C$3"),
            vec!["Sheet1!$A$1".to_string(), "Sheet1!$C$3".to_string()]
        );
        assert_eq!(
            split_address_parts("'Totals, yearly'!$B$2,Sheet1!$A$1"),
            vec![
                "'Totals, yearly'!$B$2".to_string(),
                "Sheet1!$A$1".to_string()
            ]
        );
    }

    #[test]
    fn test_parse_range_part_handles_locks_quotes_and_spans() {
        let range = parse_range_part("Sheet1!$A$1:$B$3", None).unwrap();
        assert_eq!(range.sheet_name, "Sheet1");
        assert_eq!(
            (range.n_col_start, range.n_row_start, range.n_col_end, range.n_row_end),
            (1, 1, 2, 3)
        );

        let range = parse_range_part("'My ''Data'' Sheet'!C5", None).unwrap();
        assert_eq!(range.sheet_name, "My 'Data' Sheet");
        assert_eq!(range.first_cell(), (3, 5));

        // Fallback binds sheet-less references to the scoping worksheet.
        let range = parse_range_part("$D$2", Some("Local")).unwrap();
        assert_eq!(range.sheet_name, "Local");
        assert_eq!(range.first_cell(), (4, 2));
        assert_eq!(parse_range_part("$D$2", None), None);

        // Formula-shaped parts are not ranges.
        assert_eq!(parse_range_part("=OFFSET(Sheet1!$A$1,1,1)", None), None);
    }

    #[test]
    fn test_sanitize_sheet_name_replaces_and_truncates() {
        assert_eq!(sanitize_sheet_name("a/b:c", "_"), "a_b_c");
        assert_eq!(sanitize_sheet_name("  ", "_"), "Sheet");
        assert_eq!(
            sanitize_sheet_name("0123456789012345678901234567890123", "_").len(),
            31
        );
    }
}
