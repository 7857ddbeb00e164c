pub mod filter;
pub mod formula;
pub mod relation;
pub mod work_item;

pub use filter::{Filter, FilterError};
pub use formula::{Formula, FormulaInputs, FormulaSet};
pub use relation::RelationRefs;
pub use work_item::{SubEntity, Subject, WorkItem};
