pub(crate) mod analysis;
pub(crate) mod bills;
pub(crate) mod companies;
