pub mod aggregate;
pub mod executor;
pub mod registry;
pub mod schema;
pub mod search;

pub use aggregate::SpendingByCategoryTool;
pub use executor::ToolExecutor;
pub use registry::{Tool, ToolDescriptor, ToolRegistry};
pub use schema::{decode_args, parameters_schema_for};
pub use search::SearchTransactionsTool;
