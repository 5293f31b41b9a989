pub mod aggregate;
pub mod cashflow;
pub mod config;
pub mod error;
pub mod parser;
pub mod pdf;
pub mod report;
pub mod returns;
pub mod statement;
pub mod transaction;
pub mod xirr;

pub use error::Error;
