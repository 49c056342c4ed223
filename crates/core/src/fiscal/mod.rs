//! Accounting years: date ranges, the single active year, and the
//! open/closing/closed lifecycle that gates posting.

pub mod error;
pub mod service;
pub mod year;

#[cfg(test)]
mod service_props;

pub use error::FiscalError;
pub use service::YearService;
pub use year::{AccountingYear, YearStatus};
