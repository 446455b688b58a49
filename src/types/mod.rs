pub mod balance;
pub mod ids;
pub mod price;
pub mod quantity;
pub mod ticker;
pub mod timestamp;

pub use balance::Balance;
pub use ids::{EntryId, OrderId, UserId};
pub use price::Price;
pub use quantity::Quantity;
pub use ticker::Ticker;
pub use timestamp::{Clock, ManualClock, SystemClock, Timestamp};
