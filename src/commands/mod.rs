pub mod metadata;
pub mod mount;

pub use metadata::{row_to_edit, run_metadata, SpreadsheetRow, SPREADSHEET_PRIORITY};
pub use mount::run_mount;
