//! XLSX constants shared by the layout and template kernels.

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: u32 = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: u32 = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// General/default number format marker: cells keep their existing format.
pub const C_FMT_GENERAL: &str = "General";
/// Fallback number format for date values written into general-format cells.
pub const C_FMT_DATE_DEFAULT: &str = "yyyy-mm-dd hh:mm:ss";
/// Fallback number format for duration values written into general-format cells.
pub const C_FMT_DURATION_DEFAULT: &str = "[h]:mm:ss";

/// Date-time text patterns probed by the text coercion path, in order.
pub const TUP_PATTERNS_DATETIME_TEXT: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// Date-only text patterns probed after the date-time patterns, in order.
pub const TUP_PATTERNS_DATE_TEXT: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d %b %Y"];
