pub mod lifecycle;
pub mod order;
pub mod validator;

pub use lifecycle::OrderLifecycleManager;
pub use order::{Order, OrderStatus, OrderType, Side};
pub use validator::{OrderRequest, OrderValidator};
