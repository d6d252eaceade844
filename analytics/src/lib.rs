pub mod aggregate;
pub mod reports;
pub mod runner;

pub use reports::ReportContext;
pub use runner::{run, run_all, run_report, run_with_context, ReportKind, ReportOutput};
