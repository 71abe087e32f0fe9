//! The three purchase workers.

pub mod check_persister;
pub mod reply_composer;
pub mod stock_validator;

pub use check_persister::CheckPersister;
pub use reply_composer::ReplyComposer;
pub use stock_validator::StockValidator;

/// Registry key of the default stock validator.
pub const STOCK_VALIDATOR: &str = "stock_validator";

/// Registry key of the default check persister.
pub const CHECK_PERSISTER: &str = "check_persister";

/// Registry key of the default reply composer.
pub const REPLY_COMPOSER: &str = "reply_composer";
