//! Shared layout/template specification models.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Duration, NaiveDateTime};

////////////////////////////////////////////////////////////////////////////////
// #region ValueModel

/// Raw value produced by a column extractor before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumExtractedValue {
    /// Missing/absent value; nothing is written.
    None,
    /// Text value; probed as number, then date, before falling through as text.
    Text(String),
    /// Integer value.
    Integer(i64),
    /// Floating-point value.
    Float(f64),
    /// Date-time value.
    DateTime(NaiveDateTime),
    /// Elapsed-time value.
    Duration(Duration),
    /// Boolean value; rendered through the text fallthrough.
    Boolean(bool),
}

/// Grid-native cell value after coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Date-time value, written as an Excel serial number.
    DateTime(NaiveDateTime),
    /// Elapsed-time value, written as an Excel day fraction.
    Duration(Duration),
}

/// Horizontal cell alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumHorizontalAlign {
    /// Keep the cell's existing alignment.
    General,
    /// Left-aligned (default).
    #[default]
    Left,
    /// Centered.
    Center,
    /// Right-aligned.
    Right,
    /// Fill.
    Fill,
    /// Justified.
    Justify,
    /// Distributed.
    Distributed,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnDescriptorModel

/// Extractor producing one value per item.
pub type FnExtractValue<T> = Box<dyn Fn(&T) -> EnumExtractedValue>;
/// Extractor producing an ordered value sequence per item.
pub type FnExtractSequence<T> = Box<dyn Fn(&T) -> Vec<EnumExtractedValue>>;

/// One logical output column bound to item type `T`.
///
/// `order` is the sole placement key; ties keep construction order. `caption`,
/// `format` and `align` apply to the column's cells (for the paired variant,
/// to the first column of each pair).
pub struct SpecColumnDescriptor<T> {
    /// Placement key; stable-sorted ascending before layout.
    pub order: i32,
    /// Header caption; validated non-blank at construction.
    pub caption: String,
    /// Number format code; [`crate::conf::C_FMT_GENERAL`] leaves cells untouched.
    pub format: String,
    /// Horizontal alignment for header and data cells.
    pub align: EnumHorizontalAlign,
    /// Variant payload.
    pub variant: EnumColumnVariant<T>,
}

/// Physical expansion behavior of one logical column.
pub enum EnumColumnVariant<T> {
    /// One physical column.
    Plain {
        /// Per-item value extractor.
        extract: FnExtractValue<T>,
    },
    /// `n_cols_total` physical columns fed from one value sequence.
    Multi {
        /// Physical column count; validated `>= 1` at construction.
        n_cols_total: usize,
        /// Per-sub-column caption suffixes; missing entries fall back to the
        /// 1-based sub-column index.
        suffixes_header: Vec<String>,
        /// Per-item sequence extractor; shorter sequences leave cells blank.
        extract: FnExtractSequence<T>,
    },
    /// `n_cols_total` repetitions of a first/second column pair.
    Paired {
        /// Pair repetition count; validated `>= 1` at construction.
        n_cols_total: usize,
        /// Caption suffixes for the first column of each pair.
        suffixes_header: Vec<String>,
        /// Sequence extractor for the first column of each pair.
        extract: FnExtractSequence<T>,
        /// Caption/format/extractor for the second column of each pair.
        second: SpecPairedSecond<T>,
        /// When false, the second column of every pair is suppressed entirely.
        if_show_second: bool,
    },
}

/// Second-column settings of a paired descriptor.
pub struct SpecPairedSecond<T> {
    /// Header caption; validated non-blank at construction of the descriptor.
    pub caption: String,
    /// Number format code for second-column cells.
    pub format: String,
    /// Horizontal alignment for second-column cells.
    pub align: EnumHorizontalAlign,
    /// Caption suffixes for the second column of each pair.
    pub suffixes_header: Vec<String>,
    /// Sequence extractor for the second column of each pair.
    pub extract: FnExtractSequence<T>,
}

impl<T> SpecPairedSecond<T> {
    /// Create second-column settings with general format and default alignment.
    pub fn new(
        caption: impl Into<String>,
        suffixes_header: Vec<String>,
        extract: impl Fn(&T) -> Vec<EnumExtractedValue> + 'static,
    ) -> Self {
        Self {
            caption: caption.into(),
            format: crate::conf::C_FMT_GENERAL.to_string(),
            align: EnumHorizontalAlign::default(),
            suffixes_header,
            extract: Box::new(extract),
        }
    }

    /// Return settings with the given number format code.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Return settings with the given horizontal alignment.
    pub fn with_align(mut self, align: EnumHorizontalAlign) -> Self {
        self.align = align;
        self
    }
}

impl<T> SpecColumnDescriptor<T> {
    /// Create a plain one-column descriptor.
    pub fn plain(
        order: i32,
        caption: impl Into<String>,
        extract: impl Fn(&T) -> EnumExtractedValue + 'static,
    ) -> Result<Self, PopulateError> {
        let c_caption = validate_caption(caption.into(), order)?;
        Ok(Self {
            order,
            caption: c_caption,
            format: crate::conf::C_FMT_GENERAL.to_string(),
            align: EnumHorizontalAlign::default(),
            variant: EnumColumnVariant::Plain {
                extract: Box::new(extract),
            },
        })
    }

    /// Create a horizontally-expanded descriptor spanning `n_cols_total` columns.
    pub fn multiple(
        order: i32,
        caption: impl Into<String>,
        n_cols_total: usize,
        suffixes_header: Vec<String>,
        extract: impl Fn(&T) -> Vec<EnumExtractedValue> + 'static,
    ) -> Result<Self, PopulateError> {
        let c_caption = validate_caption(caption.into(), order)?;
        validate_column_count(n_cols_total, &c_caption)?;
        Ok(Self {
            order,
            caption: c_caption,
            format: crate::conf::C_FMT_GENERAL.to_string(),
            align: EnumHorizontalAlign::default(),
            variant: EnumColumnVariant::Multi {
                n_cols_total,
                suffixes_header,
                extract: Box::new(extract),
            },
        })
    }

    /// Create a paired descriptor emitting `n_cols_total` first/second pairs.
    pub fn paired(
        order: i32,
        caption: impl Into<String>,
        n_cols_total: usize,
        suffixes_header: Vec<String>,
        extract: impl Fn(&T) -> Vec<EnumExtractedValue> + 'static,
        second: SpecPairedSecond<T>,
        if_show_second: bool,
    ) -> Result<Self, PopulateError> {
        let c_caption = validate_caption(caption.into(), order)?;
        validate_caption(second.caption.clone(), order)?;
        validate_column_count(n_cols_total, &c_caption)?;
        Ok(Self {
            order,
            caption: c_caption,
            format: crate::conf::C_FMT_GENERAL.to_string(),
            align: EnumHorizontalAlign::default(),
            variant: EnumColumnVariant::Paired {
                n_cols_total,
                suffixes_header,
                extract: Box::new(extract),
                second,
                if_show_second,
            },
        })
    }

    /// Return the descriptor with the given number format code.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Return the descriptor with the given horizontal alignment.
    pub fn with_align(mut self, align: EnumHorizontalAlign) -> Self {
        self.align = align;
        self
    }
}

fn validate_caption(caption: String, order: i32) -> Result<String, PopulateError> {
    if caption.trim().is_empty() {
        return Err(PopulateError::EmptyCaption { order });
    }
    Ok(caption)
}

fn validate_column_count(n_cols_total: usize, caption: &str) -> Result<(), PopulateError> {
    if n_cols_total == 0 {
        return Err(PopulateError::InvalidColumnCount {
            caption: caption.to_string(),
        });
    }
    Ok(())
}

impl<T> EnumColumnVariant<T> {
    /// Variant label for diagnostics.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Plain { .. } => "Plain",
            Self::Multi { .. } => "Multi",
            Self::Paired { .. } => "Paired",
        }
    }
}

impl<T> fmt::Debug for SpecColumnDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecColumnDescriptor")
            .field("order", &self.order)
            .field("caption", &self.caption)
            .field("format", &self.format)
            .field("align", &self.align)
            .field("variant", &self.variant.kind_label())
            .finish()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TemplateTableOptions

/// Policies for populating a table at a named region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecTemplateTableOptions {
    /// The named region marks the header row; data starts one row below.
    pub if_header_row_is_named_range: bool,
    /// Write header captions as part of population.
    pub if_write_headers: bool,
    /// Insert `items - 1` rows below the first data row to make room.
    pub if_insert_rows: bool,
    /// Clone the first data row's style onto each inserted row.
    pub if_copy_template_style: bool,
    /// Restrict population to regions on this worksheet.
    pub sheet_scope: Option<String>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region NamedRegionModel

/// One rectangular range of a defined name, bound to a worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRangeRef {
    /// Owning worksheet name.
    pub sheet_name: String,
    /// First column (1-based, inclusive).
    pub n_col_start: u32,
    /// First row (1-based, inclusive).
    pub n_row_start: u32,
    /// Last column (1-based, inclusive).
    pub n_col_end: u32,
    /// Last row (1-based, inclusive).
    pub n_row_end: u32,
}

impl SpecRangeRef {
    /// Top-left `(column, row)` of the range.
    pub fn first_cell(&self) -> (u32, u32) {
        (self.n_col_start, self.n_row_start)
    }
}

/// A defined name resolved to zero or more rectangular ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecNamedRegion {
    /// Defined name as stored in the workbook.
    pub name: String,
    /// Parsed rectangular ranges; formula-shaped address parts are omitted.
    pub l_ranges: Vec<SpecRangeRef>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportModel

/// One completed populate operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecPopulateEntry {
    /// Defined name the operation targeted.
    pub range_name: String,
    /// Worksheet the anchor resolved to.
    pub sheet_name: String,
    /// Data rows written (zero for single-value population).
    pub cnt_rows: usize,
    /// Cells addressed by the operation.
    pub cnt_cells: usize,
}

/// Per-call populate report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecPopulateReport {
    /// Completed operations.
    pub entries: Vec<SpecPopulateEntry>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecPopulateReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CancellationToken

/// Cooperative cancellation flag polled by the kernels.
///
/// Clones share the flag. Cancellation aborts at the next poll point; cells
/// already written stay in the workbook and the caller discards the output.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    if_cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.if_cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.if_cancelled.load(Ordering::Relaxed)
    }

    /// Return [`PopulateError::Cancelled`] once cancellation was requested.
    pub fn check(&self) -> Result<(), PopulateError> {
        if self.is_cancelled() {
            return Err(PopulateError::Cancelled);
        }
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ErrorsInit

/// Top-level population failure.
#[derive(Debug)]
pub enum PopulateError {
    /// Column caption blank after trimming.
    EmptyCaption {
        /// Placement key of the offending descriptor.
        order: i32,
    },
    /// Multi/paired descriptor with a zero column count.
    InvalidColumnCount {
        /// Caption of the offending descriptor.
        caption: String,
    },
    /// Layout requested with no descriptors.
    NoColumnsConfigured,
    /// Worksheet name already taken during new-sheet generation.
    DuplicateSheetName(String),
    /// Defined name absent from the workbook.
    NamedRangeNotFound(String),
    /// Defined name exists, but not on the requested worksheet.
    NamedRangeNotFoundInWorksheet {
        /// Requested defined name.
        name: String,
        /// Requested worksheet scope.
        sheet_name: String,
    },
    /// Template workbook could not be read.
    TemplateReadFailed {
        /// Template path that failed to load.
        path: PathBuf,
        /// Underlying reader error text.
        message: String,
    },
    /// Workbook serialization failed.
    WorkbookWriteFailed(String),
    /// Row index beyond worksheet capacity.
    RowIndexOverflow(u64),
    /// Column index beyond worksheet capacity.
    ColumnIndexOverflow(u64),
    /// Cancellation was requested.
    Cancelled,
}

impl fmt::Display for PopulateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCaption { order } => {
                write!(f, "Column caption must be non-blank (order={order}).")
            }
            Self::InvalidColumnCount { caption } => {
                write!(f, "Column count must be >= 1 for column {caption:?}.")
            }
            Self::NoColumnsConfigured => write!(f, "No columns configured."),
            Self::DuplicateSheetName(name) => {
                write!(f, "Worksheet already exists: {name:?}")
            }
            Self::NamedRangeNotFound(name) => {
                write!(f, "Named range not found: {name:?}")
            }
            Self::NamedRangeNotFoundInWorksheet { name, sheet_name } => {
                write!(f, "Named range {name:?} not found in worksheet {sheet_name:?}")
            }
            Self::TemplateReadFailed { path, message } => {
                write!(f, "Failed to read template {}: {message}", path.display())
            }
            Self::WorkbookWriteFailed(message) => {
                write!(f, "Failed to write workbook: {message}")
            }
            Self::RowIndexOverflow(value) => {
                write!(f, "Row index exceeds worksheet capacity: {value}")
            }
            Self::ColumnIndexOverflow(value) => {
                write!(f, "Column index exceeds worksheet capacity: {value}")
            }
            Self::Cancelled => write!(f, "Population cancelled."),
        }
    }
}

impl std::error::Error for PopulateError {}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_constructor_rejects_blank_caption() {
        let result = SpecColumnDescriptor::<i64>::plain(3, "   ", |_| EnumExtractedValue::None);
        assert!(matches!(
            result,
            Err(PopulateError::EmptyCaption { order: 3 })
        ));
    }

    #[test]
    fn test_multiple_constructor_rejects_zero_columns() {
        let result =
            SpecColumnDescriptor::<i64>::multiple(1, "Score", 0, vec![], |_| Vec::new());
        assert!(matches!(
            result,
            Err(PopulateError::InvalidColumnCount { .. })
        ));
    }

    #[test]
    fn test_paired_constructor_rejects_blank_second_caption() {
        let second = SpecPairedSecond::<i64>::new("  ", vec![], |_| Vec::new());
        let result =
            SpecColumnDescriptor::paired(2, "Qty", 1, vec![], |_| Vec::new(), second, true);
        assert!(matches!(
            result,
            Err(PopulateError::EmptyCaption { order: 2 })
        ));
    }

    #[test]
    fn test_cancel_token_check_flips_after_cancel() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());

        let token_shared = token.clone();
        token_shared.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(PopulateError::Cancelled)));
    }
}
