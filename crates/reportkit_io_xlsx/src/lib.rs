//! `reportkit_io_xlsx` v1:
//! Rust-side XLSX layout and template population kernel.
//!
//! Maps in-memory collections onto workbook grids, in two modes:
//! - `layout`   : brand-new worksheets from ordered column descriptors
//! - `template` : pre-existing workbooks populated at named anchor regions
//!
//! Module architecture:
//! - `conf`     : constants
//! - `spec`     : specs/models/options/errors
//! - `util`     : pure helper functions
//! - `names`    : defined-name region resolution
//! - `layout`   : column layout kernel
//! - `template` : template population kernel
pub mod conf;
pub mod layout;
pub mod names;
pub mod spec;
pub mod template;
pub mod util;

pub use conf::{
    C_FMT_DATE_DEFAULT, C_FMT_DURATION_DEFAULT, C_FMT_GENERAL, N_LEN_EXCEL_SHEET_NAME_MAX,
    N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
pub use layout::{layout_columns, write_new_sheet};
pub use names::{find_named_regions, matches_worksheet};
pub use spec::{
    CancelToken, EnumCellValue, EnumColumnVariant, EnumExtractedValue, EnumHorizontalAlign,
    FnExtractSequence, FnExtractValue, PopulateError, SpecColumnDescriptor, SpecNamedRegion,
    SpecPairedSecond, SpecPopulateEntry, SpecPopulateReport, SpecRangeRef,
    SpecTemplateTableOptions,
};
pub use template::TemplatePopulator;
pub use util::{
    calculate_descriptor_span, calculate_excel_serial_date, calculate_excel_serial_duration,
    calculate_table_rows, calculate_table_span, convert_extracted_value, sanitize_sheet_name,
};
