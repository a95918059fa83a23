pub mod model;
pub mod money;
pub mod response;

pub use model::{Line, LineItem, Origin, PageResult, PageType, ReconciliationResult, Word};
pub use money::Money;
pub use response::{ErrorResponse, ExtractionResponse, ResponseData, TokenUsage};
