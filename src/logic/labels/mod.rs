//! Labels Module
//!
//! Status taxonomy shared by the classifier, the device's edge label and
//! the actuation command.
//!
//! ## Structure
//! - `types`: `LabelKind`, `ClassificationResult`
//! - `table`: alias lookup and the label → command table

pub mod types;
pub mod table;

pub use types::{ClassificationResult, LabelKind, LabelSource};
pub use table::{CommandTable, LabelTable};
