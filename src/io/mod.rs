//! Persistence: the multi-table result document, split plans, and CSV
//! exports.

mod export;
mod plan;
mod result_doc;

pub use export::write_light_curve_csv;
pub use plan::{adaptive_table_name, read_plan_json, write_plan_json};
pub use result_doc::{
    Column, ColumnData, ResultDoc, Table, read_result_doc, write_result_doc,
};
