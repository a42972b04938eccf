pub mod types;
pub mod violations;

pub use types::{Attachments, Cell, CellType, Issue, IssueMetadata, TextPosition};
pub use violations::{
    violation_category, violation_info, Severity, ViolationCategory, ViolationInfo,
};
