pub mod filter;
pub mod grant;
pub mod pagination;
pub mod time_serde;

mod error;

pub use error::{Error, Result};
pub use filter::{DateRange, DeletedFilter, DialogStatus, SearchFilterSet, SystemLabel};
pub use grant::AuthorizationGrant;
pub use pagination::{Cursor, OrderDirection, OrderEntry, OrderKey, OrderSpec};
