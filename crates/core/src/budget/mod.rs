//! Budget allocations, overrun checks, and variance analysis.

pub mod error;
pub mod guard;
pub mod service;
pub mod types;
pub mod variance;


pub use error::BudgetError;
pub use guard::BudgetGuard;
pub use service::BudgetService;
pub use types::{
    Budget, BudgetAction, BudgetCheck, BudgetOverrunWarning, BudgetPosition, BudgetStatus, CreateBudgetInput,
    VarianceLine, VarianceReport,
};
pub use variance::{BudgetVariance, VarianceType};
