mod app;
mod architecture;
mod attribute;
pub mod attrs;
mod scope;

pub use app::{App, AppId};
pub use architecture::Architecture;
pub use attribute::{parse_decimal_u32, AttributeList, AttributeType, AttributeValue};
pub use scope::Scope;
