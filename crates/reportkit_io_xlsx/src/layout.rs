//! Column layout kernel: headers and data rows onto a worksheet.

use umya_spreadsheet::{HorizontalAlignmentValues, Workbook, Worksheet};

use crate::conf::{C_FMT_DATE_DEFAULT, C_FMT_DURATION_DEFAULT, C_FMT_GENERAL, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX};
use crate::spec::{
    CancelToken, EnumCellValue, EnumColumnVariant, EnumExtractedValue, EnumHorizontalAlign,
    PopulateError, SpecColumnDescriptor,
};
use crate::util::{
    calculate_excel_serial_date, calculate_excel_serial_duration, calculate_table_span,
    convert_extracted_value, sanitize_sheet_name,
};

/// Lay out `descriptors` and `items` at `(n_row_start, n_col_start)`.
///
/// Descriptors are stable-sorted by `order` before placement. The header walk
/// and every per-item walk advance the column cursor with identical
/// arithmetic, so header and data columns always line up. Data rows start one
/// row below `n_row_start` when headers are written.
///
/// Returns the number of items written.
pub fn layout_columns<T>(
    worksheet: &mut Worksheet,
    descriptors: &[SpecColumnDescriptor<T>],
    items: &[T],
    n_row_start: u32,
    n_col_start: u32,
    if_include_headers: bool,
    token: &CancelToken,
) -> Result<usize, PopulateError> {
    if descriptors.is_empty() {
        return Err(PopulateError::NoColumnsConfigured);
    }
    validate_layout_bounds(descriptors, items.len(), n_row_start, n_col_start, if_include_headers)?;

    let mut l_idx_sorted: Vec<usize> = (0..descriptors.len()).collect();
    l_idx_sorted.sort_by_key(|n_idx| descriptors[*n_idx].order);

    if if_include_headers {
        let mut n_col_cursor = n_col_start;
        for n_idx in &l_idx_sorted {
            token.check()?;
            let descriptor = &descriptors[*n_idx];
            match &descriptor.variant {
                EnumColumnVariant::Plain { .. } => {
                    write_header_cell(worksheet, n_col_cursor, n_row_start, &descriptor.caption);
                    n_col_cursor += 1;
                }
                EnumColumnVariant::Multi {
                    n_cols_total,
                    suffixes_header,
                    ..
                } => {
                    for n_idx_sub in 0..*n_cols_total {
                        token.check()?;
                        let c_caption =
                            derive_expanded_caption(&descriptor.caption, suffixes_header, n_idx_sub);
                        write_header_cell(worksheet, n_col_cursor, n_row_start, &c_caption);
                        n_col_cursor += 1;
                    }
                }
                EnumColumnVariant::Paired {
                    n_cols_total,
                    suffixes_header,
                    second,
                    if_show_second,
                    ..
                } => {
                    for n_idx_sub in 0..*n_cols_total {
                        token.check()?;
                        let c_caption =
                            derive_expanded_caption(&descriptor.caption, suffixes_header, n_idx_sub);
                        write_header_cell(worksheet, n_col_cursor, n_row_start, &c_caption);
                        n_col_cursor += 1;
                        if *if_show_second {
                            let c_caption_second = derive_expanded_caption(
                                &second.caption,
                                &second.suffixes_header,
                                n_idx_sub,
                            );
                            write_header_cell(worksheet, n_col_cursor, n_row_start, &c_caption_second);
                            n_col_cursor += 1;
                        }
                    }
                }
            }
        }
    }

    let n_topgap: u32 = if if_include_headers { 1 } else { 0 };

    for (n_idx_item, item) in items.iter().enumerate() {
        token.check()?;
        let n_row = n_row_start + n_topgap + cast_row_offset(n_idx_item)?;
        let mut n_col_cursor = n_col_start;

        for n_idx in &l_idx_sorted {
            token.check()?;
            let descriptor = &descriptors[*n_idx];
            match &descriptor.variant {
                EnumColumnVariant::Plain { extract } => {
                    let value = convert_extracted_value(&extract(item));
                    // Absent values skip the write but still advance the cursor.
                    write_value_cell(
                        worksheet,
                        n_col_cursor,
                        n_row,
                        &value,
                        &descriptor.format,
                        descriptor.align,
                    );
                    n_col_cursor += 1;
                }
                EnumColumnVariant::Multi {
                    n_cols_total,
                    extract,
                    ..
                } => {
                    let l_values = extract(item);
                    for n_idx_sub in 0..*n_cols_total {
                        token.check()?;
                        write_sequence_cell(
                            worksheet,
                            n_col_cursor,
                            n_row,
                            &l_values,
                            n_idx_sub,
                            &descriptor.format,
                            descriptor.align,
                        );
                        n_col_cursor += 1;
                    }
                }
                EnumColumnVariant::Paired {
                    n_cols_total,
                    extract,
                    second,
                    if_show_second,
                    ..
                } => {
                    let l_values_first = extract(item);
                    let l_values_second = (second.extract)(item);
                    for n_idx_sub in 0..*n_cols_total {
                        token.check()?;
                        write_sequence_cell(
                            worksheet,
                            n_col_cursor,
                            n_row,
                            &l_values_first,
                            n_idx_sub,
                            &descriptor.format,
                            descriptor.align,
                        );
                        n_col_cursor += 1;
                        if *if_show_second {
                            write_sequence_cell(
                                worksheet,
                                n_col_cursor,
                                n_row,
                                &l_values_second,
                                n_idx_sub,
                                &second.format,
                                second.align,
                            );
                            n_col_cursor += 1;
                        }
                    }
                }
            }
        }
    }

    Ok(items.len())
}

/// Create a sanitized worksheet and lay out `descriptors` + `items` at `A1`
/// with headers.
pub fn write_new_sheet<T>(
    book: &mut Workbook,
    sheet_name: &str,
    descriptors: &[SpecColumnDescriptor<T>],
    items: &[T],
    token: &CancelToken,
) -> Result<usize, PopulateError> {
    let c_sheet_name = sanitize_sheet_name(sheet_name, "_");
    let worksheet = book
        .new_sheet(&c_sheet_name)
        .map_err(|_| PopulateError::DuplicateSheetName(c_sheet_name.clone()))?;
    layout_columns(worksheet, descriptors, items, 1, 1, true, token)
}

/// Write one coerced value with number format and alignment.
///
/// Absent values leave the cell untouched. Dates and durations land as serial
/// numbers; when the requested format is the general marker they receive the
/// configured fallback formats so the serial renders as a date/time.
pub(crate) fn write_value_cell(
    worksheet: &mut Worksheet,
    n_col: u32,
    n_row: u32,
    value: &EnumCellValue,
    format: &str,
    align: EnumHorizontalAlign,
) {
    if matches!(value, EnumCellValue::None) {
        return;
    }
    let c_format = match value {
        EnumCellValue::DateTime(_) if format == C_FMT_GENERAL => C_FMT_DATE_DEFAULT,
        EnumCellValue::Duration(_) if format == C_FMT_GENERAL => C_FMT_DURATION_DEFAULT,
        _ => format,
    };

    let cell = worksheet.get_cell_mut((n_col, n_row));
    match value {
        EnumCellValue::None => return,
        EnumCellValue::String(c_value) => {
            cell.set_value_string(c_value);
        }
        EnumCellValue::Number(n_value) => {
            cell.set_value_number(*n_value);
        }
        EnumCellValue::DateTime(datetime) => {
            cell.set_value_number(calculate_excel_serial_date(datetime));
        }
        EnumCellValue::Duration(duration) => {
            cell.set_value_number(calculate_excel_serial_duration(duration));
        }
    }

    let style = cell.get_style_mut();
    if c_format != C_FMT_GENERAL {
        style.get_number_format_mut().set_format_code(c_format);
    }
    if let Some(align_value) = derive_horizontal_alignment(align) {
        style.get_alignment_mut().set_horizontal(align_value);
    }
}

fn write_header_cell(worksheet: &mut Worksheet, n_col: u32, n_row: u32, caption: &str) {
    let cell = worksheet.get_cell_mut((n_col, n_row));
    cell.set_value_string(caption);
    cell.get_style_mut().get_font_mut().set_bold(true);
}

fn write_sequence_cell(
    worksheet: &mut Worksheet,
    n_col: u32,
    n_row: u32,
    values: &[EnumExtractedValue],
    n_idx_sub: usize,
    format: &str,
    align: EnumHorizontalAlign,
) {
    // Sequences shorter than the column count leave trailing cells blank.
    let Some(value_raw) = values.get(n_idx_sub) else {
        return;
    };
    let value = convert_extracted_value(value_raw);
    write_value_cell(worksheet, n_col, n_row, &value, format, align);
}

fn derive_expanded_caption(caption: &str, suffixes: &[String], n_idx_sub: usize) -> String {
    match suffixes.get(n_idx_sub) {
        Some(c_suffix) => format!("{caption} {c_suffix}"),
        None => format!("{caption} {}", n_idx_sub + 1),
    }
}

fn derive_horizontal_alignment(align: EnumHorizontalAlign) -> Option<HorizontalAlignmentValues> {
    match align {
        EnumHorizontalAlign::General => None,
        EnumHorizontalAlign::Left => Some(HorizontalAlignmentValues::Left),
        EnumHorizontalAlign::Center => Some(HorizontalAlignmentValues::Center),
        EnumHorizontalAlign::Right => Some(HorizontalAlignmentValues::Right),
        EnumHorizontalAlign::Fill => Some(HorizontalAlignmentValues::Fill),
        EnumHorizontalAlign::Justify => Some(HorizontalAlignmentValues::Justify),
        EnumHorizontalAlign::Distributed => Some(HorizontalAlignmentValues::Distributed),
    }
}

fn validate_layout_bounds<T>(
    descriptors: &[SpecColumnDescriptor<T>],
    n_items: usize,
    n_row_start: u32,
    n_col_start: u32,
    if_include_headers: bool,
) -> Result<(), PopulateError> {
    let n_span = u64::from(calculate_table_span(descriptors));
    let n_col_last = u64::from(n_col_start) + n_span.saturating_sub(1);
    if n_col_last > u64::from(N_NCOLS_EXCEL_MAX) {
        return Err(PopulateError::ColumnIndexOverflow(n_col_last));
    }

    let n_topgap: u64 = if if_include_headers { 1 } else { 0 };
    let n_row_last = u64::from(n_row_start) + n_topgap + (n_items as u64).saturating_sub(1);
    if n_row_last > u64::from(N_NROWS_EXCEL_MAX) {
        return Err(PopulateError::RowIndexOverflow(n_row_last));
    }
    Ok(())
}

pub(crate) fn cast_row_offset(value: usize) -> Result<u32, PopulateError> {
    u32::try_from(value).map_err(|_| PopulateError::RowIndexOverflow(value as u64))
}
