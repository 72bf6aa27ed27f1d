//! Template population kernel: values and tables at named regions.

use std::io::Cursor;
use std::path::Path;

use umya_spreadsheet::{Workbook, Worksheet};

use crate::layout::{cast_row_offset, layout_columns, write_value_cell};
use crate::names::{find_named_regions, matches_worksheet};
use crate::spec::{
    CancelToken, EnumExtractedValue, EnumHorizontalAlign, PopulateError, SpecColumnDescriptor,
    SpecNamedRegion, SpecPopulateEntry, SpecPopulateReport, SpecTemplateTableOptions,
};
use crate::util::{calculate_table_rows, calculate_table_span, convert_extracted_value};

/// Stateful template workbook populator.
///
/// Owns one workbook for the duration of a generation call. Every populate
/// operation appends to the accumulated reports; the workbook is only
/// materialized to bytes/disk by the finalizers.
pub struct TemplatePopulator {
    book: Workbook,
    l_reports: Vec<SpecPopulateReport>,
}

impl TemplatePopulator {
    /// Load a template workbook from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PopulateError> {
        let book = umya_spreadsheet::reader::xlsx::read(path.as_ref()).map_err(|err| {
            PopulateError::TemplateReadFailed {
                path: path.as_ref().to_path_buf(),
                message: err.to_string(),
            }
        })?;
        Ok(Self::from_workbook(book))
    }

    /// Wrap an already-loaded workbook.
    pub fn from_workbook(book: Workbook) -> Self {
        Self {
            book,
            l_reports: Vec::new(),
        }
    }

    /// Immutable view of the owned workbook.
    pub fn workbook(&self) -> &Workbook {
        &self.book
    }

    /// Return immutable snapshot of accumulated populate reports.
    pub fn report(&self) -> Vec<SpecPopulateReport> {
        self.l_reports.clone()
    }

    /// Write one coerced value into every cell of every matching region.
    ///
    /// A name stored as several disjoint ranges receives the value in each
    /// range. With a worksheet scope, only ranges on that sheet are written;
    /// a name that exists elsewhere but not on the scoped sheet is reported
    /// as [`PopulateError::NamedRangeNotFoundInWorksheet`].
    ///
    /// Returns the number of cells addressed.
    pub fn apply_value(
        &mut self,
        range_name: &str,
        value: EnumExtractedValue,
        format: &str,
        align: EnumHorizontalAlign,
        sheet_scope: Option<&str>,
        token: &CancelToken,
    ) -> Result<usize, PopulateError> {
        let l_regions = self.resolve_regions(range_name, sheet_scope)?;
        let cell_value = convert_extracted_value(&value);

        let mut report = SpecPopulateReport::default();
        let mut n_cells_total = 0usize;

        for region in &l_regions {
            token.check()?;
            let mut n_cells_region = 0usize;

            for range in &region.l_ranges {
                if let Some(c_sheet) = sheet_scope
                    && !range.sheet_name.eq_ignore_ascii_case(c_sheet)
                {
                    continue;
                }
                let Ok(worksheet) = self.book.get_sheet_by_name_mut(&range.sheet_name) else {
                    report.warn(format!(
                        "Named range {:?} points at missing worksheet {:?}; part skipped.",
                        region.name, range.sheet_name
                    ));
                    continue;
                };

                for n_row in range.n_row_start..=range.n_row_end {
                    for n_col in range.n_col_start..=range.n_col_end {
                        token.check()?;
                        write_value_cell(worksheet, n_col, n_row, &cell_value, format, align);
                        n_cells_region += 1;
                    }
                }
            }

            report.entries.push(SpecPopulateEntry {
                range_name: region.name.clone(),
                sheet_name: derive_region_sheet_label(region),
                cnt_rows: 0,
                cnt_cells: n_cells_region,
            });
            n_cells_total += n_cells_region;
        }

        self.l_reports.push(report);
        Ok(n_cells_total)
    }

    /// Populate a table of `items` at every matching region.
    ///
    /// Each region is anchored at its first cell, the header/data start rows
    /// are resolved from the options, rows are inserted below the first data
    /// row when requested (optionally cloning that row's style across the
    /// descriptors' physical span), and layout runs at the write start row.
    ///
    /// Returns the total number of data rows written.
    pub fn apply_table<T>(
        &mut self,
        range_name: &str,
        items: &[T],
        descriptors: &[SpecColumnDescriptor<T>],
        options: &SpecTemplateTableOptions,
        token: &CancelToken,
    ) -> Result<usize, PopulateError> {
        if descriptors.is_empty() {
            return Err(PopulateError::NoColumnsConfigured);
        }

        let sheet_scope = options.sheet_scope.as_deref();
        let l_regions = self.resolve_regions(range_name, sheet_scope)?;
        let n_span = calculate_table_span(descriptors);

        let mut report = SpecPopulateReport::default();
        let mut n_rows_total = 0usize;

        for region in &l_regions {
            token.check()?;
            let Some(range) = region.l_ranges.iter().find(|range| match sheet_scope {
                None => true,
                Some(c_sheet) => range.sheet_name.eq_ignore_ascii_case(c_sheet),
            }) else {
                report.warn(format!(
                    "Named range {:?} has no addressable range part; skipped.",
                    region.name
                ));
                continue;
            };

            let (n_col_anchor, n_row_anchor) = range.first_cell();
            let (n_row_data_start, n_row_write_start) = calculate_table_rows(
                n_row_anchor,
                options.if_header_row_is_named_range,
                options.if_write_headers,
            );

            let Ok(worksheet) = self.book.get_sheet_by_name_mut(&range.sheet_name) else {
                report.warn(format!(
                    "Named range {:?} points at missing worksheet {:?}; skipped.",
                    region.name, range.sheet_name
                ));
                continue;
            };

            if options.if_insert_rows && items.len() > 1 {
                let n_rows_insert = cast_row_offset(items.len() - 1)?;
                worksheet.insert_new_row(n_row_data_start + 1, n_rows_insert);
                if options.if_copy_template_style {
                    copy_template_row_style(
                        worksheet,
                        n_col_anchor,
                        n_row_data_start,
                        n_rows_insert,
                        n_span,
                    );
                }
            }

            let n_rows = layout_columns(
                worksheet,
                descriptors,
                items,
                n_row_write_start,
                n_col_anchor,
                options.if_write_headers,
                token,
            )?;

            report.entries.push(SpecPopulateEntry {
                range_name: region.name.clone(),
                sheet_name: range.sheet_name.clone(),
                cnt_rows: n_rows,
                cnt_cells: n_rows * n_span as usize,
            });
            n_rows_total += n_rows;
        }

        self.l_reports.push(report);
        Ok(n_rows_total)
    }

    /// Write the workbook to disk.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PopulateError> {
        umya_spreadsheet::writer::xlsx::write(&self.book, path.as_ref())
            .map_err(|err| PopulateError::WorkbookWriteFailed(err.to_string()))
    }

    /// Serialize the workbook to in-memory bytes.
    pub fn save_to_bytes(&self) -> Result<Vec<u8>, PopulateError> {
        let mut cursor = Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&self.book, &mut cursor)
            .map_err(|err| PopulateError::WorkbookWriteFailed(err.to_string()))?;
        Ok(cursor.into_inner())
    }

    /// Release the owned workbook.
    pub fn into_workbook(self) -> Workbook {
        self.book
    }

    fn resolve_regions(
        &self,
        range_name: &str,
        sheet_scope: Option<&str>,
    ) -> Result<Vec<SpecNamedRegion>, PopulateError> {
        let l_regions = find_named_regions(&self.book, range_name);
        if l_regions.is_empty() {
            return Err(PopulateError::NamedRangeNotFound(range_name.to_string()));
        }

        let l_matching: Vec<SpecNamedRegion> = l_regions
            .into_iter()
            .filter(|region| matches_worksheet(region, sheet_scope))
            .collect();
        if l_matching.is_empty() {
            // The name exists, just not on the requested sheet.
            let c_sheet = sheet_scope.unwrap_or_default();
            return Err(PopulateError::NamedRangeNotFoundInWorksheet {
                name: range_name.to_string(),
                sheet_name: c_sheet.to_string(),
            });
        }
        Ok(l_matching)
    }
}

/// Clone the first data row's style onto each inserted row, column by column,
/// across the table's physical span. Values are not copied.
fn copy_template_row_style(
    worksheet: &mut Worksheet,
    n_col_anchor: u32,
    n_row_template: u32,
    n_rows_insert: u32,
    n_span: u32,
) {
    for n_row_offset in 1..=n_rows_insert {
        for n_col_offset in 0..n_span {
            let n_col = n_col_anchor + n_col_offset;
            let style = worksheet
                .get_cell((n_col, n_row_template))
                .map(|cell| cell.get_style().clone());
            let Some(style) = style else {
                continue;
            };
            worksheet
                .get_cell_mut((n_col, n_row_template + n_row_offset))
                .set_style(style);
        }
    }
}

fn derive_region_sheet_label(region: &SpecNamedRegion) -> String {
    region
        .l_ranges
        .first()
        .map(|range| range.sheet_name.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use umya_spreadsheet::DefinedName;

    fn push_defined_name(book: &mut Workbook, name: &str, address: &str) {
        let mut defined = DefinedName::default();
        defined.set_name(name);
        defined.set_address(address);
        book.get_defined_names_mut().push(defined);
    }

    struct SpecOrderRow {
        product: &'static str,
        quantity: i64,
    }

    fn derive_order_descriptors() -> Vec<SpecColumnDescriptor<SpecOrderRow>> {
        vec![
            SpecColumnDescriptor::plain(1, "Product", |row: &SpecOrderRow| {
                EnumExtractedValue::Text(row.product.to_string())
            })
            .unwrap(),
            SpecColumnDescriptor::plain(2, "Quantity", |row: &SpecOrderRow| {
                EnumExtractedValue::Integer(row.quantity)
            })
            .unwrap(),
        ]
    }

    fn derive_order_items() -> Vec<SpecOrderRow> {
        vec![
            SpecOrderRow {
                product: "Widget",
                quantity: 3,
            },
            SpecOrderRow {
                product: "Gadget",
                quantity: 5,
            },
        ]
    }

    #[test]
    fn test_apply_value_fills_every_cell_of_every_range() {
        let mut book = umya_spreadsheet::new_file();
        push_defined_name(&mut book, "InvoiceNo", "Sheet1!$A$1:$B$1,Sheet1!$D$9");

        let mut populator = TemplatePopulator::from_workbook(book);
        let n_cells = populator
            .apply_value(
                "InvoiceNo",
                EnumExtractedValue::Text("INV-0042".to_string()),
                crate::conf::C_FMT_GENERAL,
                EnumHorizontalAlign::Left,
                None,
                &CancelToken::new(),
            )
            .unwrap();

        assert_eq!(n_cells, 3);
        let worksheet = populator.workbook().get_sheet_by_name("Sheet1").unwrap();
        assert_eq!(worksheet.get_cell("A1").unwrap().get_value(), "INV-0042");
        assert_eq!(worksheet.get_cell("B1").unwrap().get_value(), "INV-0042");
        assert_eq!(worksheet.get_cell("D9").unwrap().get_value(), "INV-0042");

        let l_reports = populator.report();
        assert_eq!(l_reports.len(), 1);
        assert_eq!(l_reports[0].entries[0].cnt_cells, 3);
    }

    #[test]
    fn test_apply_value_distinguishes_missing_name_from_wrong_sheet() {
        let mut book = umya_spreadsheet::new_file();
        book.new_sheet("Back").unwrap();
        push_defined_name(&mut book, "Total", "Sheet1!$C$3");

        let mut populator = TemplatePopulator::from_workbook(book);

        let result = populator.apply_value(
            "Missing",
            EnumExtractedValue::Integer(1),
            crate::conf::C_FMT_GENERAL,
            EnumHorizontalAlign::Left,
            None,
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(PopulateError::NamedRangeNotFound(_))));

        let result = populator.apply_value(
            "Total",
            EnumExtractedValue::Integer(1),
            crate::conf::C_FMT_GENERAL,
            EnumHorizontalAlign::Left,
            Some("Back"),
            &CancelToken::new(),
        );
        assert!(matches!(
            result,
            Err(PopulateError::NamedRangeNotFoundInWorksheet { .. })
        ));
    }

    #[test]
    fn test_apply_value_scope_limits_writes_to_requested_sheet() {
        let mut book = umya_spreadsheet::new_file();
        book.new_sheet("Back").unwrap();
        push_defined_name(&mut book, "Stamp", "Sheet1!$A$1,Back!$A$1");

        let mut populator = TemplatePopulator::from_workbook(book);
        let n_cells = populator
            .apply_value(
                "Stamp",
                EnumExtractedValue::Text("front only".to_string()),
                crate::conf::C_FMT_GENERAL,
                EnumHorizontalAlign::Left,
                Some("Sheet1"),
                &CancelToken::new(),
            )
            .unwrap();

        assert_eq!(n_cells, 1);
        let worksheet = populator.workbook().get_sheet_by_name("Back").unwrap();
        assert!(worksheet.get_cell("A1").is_none());
    }

    #[test]
    fn test_apply_table_writes_headers_at_anchor_when_requested() {
        let mut book = umya_spreadsheet::new_file();
        push_defined_name(&mut book, "Orders", "Sheet1!$B$2");

        let mut populator = TemplatePopulator::from_workbook(book);
        let options = SpecTemplateTableOptions {
            if_header_row_is_named_range: true,
            if_write_headers: true,
            ..Default::default()
        };
        let n_rows = populator
            .apply_table(
                "Orders",
                &derive_order_items(),
                &derive_order_descriptors(),
                &options,
                &CancelToken::new(),
            )
            .unwrap();

        assert_eq!(n_rows, 2);
        let worksheet = populator.workbook().get_sheet_by_name("Sheet1").unwrap();
        assert_eq!(worksheet.get_cell("B2").unwrap().get_value(), "Product");
        assert_eq!(worksheet.get_cell("C2").unwrap().get_value(), "Quantity");
        assert_eq!(worksheet.get_cell("B3").unwrap().get_value(), "Widget");
        assert_eq!(worksheet.get_cell("C4").unwrap().get_value(), "5");
    }

    #[test]
    fn test_apply_table_insertion_shifts_rows_below_data_start() {
        let mut book = umya_spreadsheet::new_file();
        push_defined_name(&mut book, "Orders", "Sheet1!$A$1");
        {
            let worksheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
            worksheet.get_cell_mut("A1").set_value_string("Header");
            worksheet.get_cell_mut("A3").set_value_string("TOTAL");
        }

        let mut populator = TemplatePopulator::from_workbook(book);
        let options = SpecTemplateTableOptions {
            if_header_row_is_named_range: true,
            if_write_headers: false,
            if_insert_rows: true,
            ..Default::default()
        };
        populator
            .apply_table(
                "Orders",
                &derive_order_items(),
                &derive_order_descriptors(),
                &options,
                &CancelToken::new(),
            )
            .unwrap();

        let worksheet = populator.workbook().get_sheet_by_name("Sheet1").unwrap();
        // Anchor row untouched, two data rows, footer pushed below the block.
        assert_eq!(worksheet.get_cell("A1").unwrap().get_value(), "Header");
        assert_eq!(worksheet.get_cell("A2").unwrap().get_value(), "Widget");
        assert_eq!(worksheet.get_cell("A3").unwrap().get_value(), "Gadget");
        assert_eq!(worksheet.get_cell("A4").unwrap().get_value(), "TOTAL");
    }

    #[test]
    fn test_apply_table_without_policies_overwrites_from_anchor() {
        let mut book = umya_spreadsheet::new_file();
        push_defined_name(&mut book, "Orders", "Sheet1!$A$5");

        let mut populator = TemplatePopulator::from_workbook(book);
        populator
            .apply_table(
                "Orders",
                &derive_order_items(),
                &derive_order_descriptors(),
                &SpecTemplateTableOptions::default(),
                &CancelToken::new(),
            )
            .unwrap();

        let worksheet = populator.workbook().get_sheet_by_name("Sheet1").unwrap();
        assert_eq!(worksheet.get_cell("A5").unwrap().get_value(), "Widget");
        assert_eq!(worksheet.get_cell("B6").unwrap().get_value(), "5");
        assert!(worksheet.get_cell("A4").is_none());
    }

    #[test]
    fn test_apply_table_copies_template_row_style_onto_inserted_rows() {
        let mut book = umya_spreadsheet::new_file();
        push_defined_name(&mut book, "Orders", "Sheet1!$A$2");
        {
            let worksheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
            worksheet
                .get_cell_mut("A2")
                .get_style_mut()
                .get_font_mut()
                .set_bold(true);
        }

        let mut populator = TemplatePopulator::from_workbook(book);
        let options = SpecTemplateTableOptions {
            if_header_row_is_named_range: false,
            if_write_headers: false,
            if_insert_rows: true,
            if_copy_template_style: true,
            ..Default::default()
        };
        populator
            .apply_table(
                "Orders",
                &derive_order_items(),
                &derive_order_descriptors(),
                &options,
                &CancelToken::new(),
            )
            .unwrap();

        let worksheet = populator.workbook().get_sheet_by_name("Sheet1").unwrap();
        let font = worksheet
            .get_cell("A3")
            .unwrap()
            .get_style()
            .get_font()
            .cloned();
        assert_eq!(font.unwrap().get_bold(), true);
    }

    #[test]
    fn test_apply_table_rejects_empty_descriptor_set() {
        let mut book = umya_spreadsheet::new_file();
        push_defined_name(&mut book, "Orders", "Sheet1!$A$1");

        let mut populator = TemplatePopulator::from_workbook(book);
        let l_descriptors: Vec<SpecColumnDescriptor<SpecOrderRow>> = Vec::new();
        let result = populator.apply_table(
            "Orders",
            &derive_order_items(),
            &l_descriptors,
            &SpecTemplateTableOptions::default(),
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(PopulateError::NoColumnsConfigured)));
    }

    #[test]
    fn test_save_to_bytes_produces_xlsx_payload() {
        let mut book = umya_spreadsheet::new_file();
        push_defined_name(&mut book, "Orders", "Sheet1!$A$1");

        let mut populator = TemplatePopulator::from_workbook(book);
        populator
            .apply_table(
                "Orders",
                &derive_order_items(),
                &derive_order_descriptors(),
                &SpecTemplateTableOptions::default(),
                &CancelToken::new(),
            )
            .unwrap();

        let v_bytes = populator.save_to_bytes().unwrap();
        // XLSX payloads are ZIP archives.
        assert_eq!(&v_bytes[0..2], b"PK".as_slice());
    }
}
