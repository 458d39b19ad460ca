//! Schooling ICS Core Library
//!
//! 科目の繰り返し定義から学期中の授業日を展開し、iCalendar 形式で出力する。

pub mod catalog;
pub mod error;
pub mod exclusion;
pub mod ics;
pub mod schedule;
pub mod summary;
pub mod term;
pub mod types;

// Re-export core types and error handling
pub use error::{Error, Result};
pub use types::*;

/// Commonly used items
pub mod prelude {
    pub use crate::{
        catalog::*, exclusion::*, ics::*, schedule::*, summary::*, term::*, types::*,
    };
}
