mod csv_export;
mod csv_import;

pub(crate) use csv_export::export_bills;
pub(crate) use csv_import::{import_bills, parse_decimal};
