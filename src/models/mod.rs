mod bill;
mod company;

pub use bill::{validate_month, validate_year, Bill, BillKey};
#[cfg(test)]
pub use bill::{MAX_AMOUNT, MAX_YEAR};
pub use company::Company;
