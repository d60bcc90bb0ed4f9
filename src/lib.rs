pub mod book;
pub mod exchange;
pub mod orders;
pub mod signal;
pub mod stream;
pub mod types;

pub use book::{ActiveOrderBook, BookError, ExecutionMode, WaitOutcome};
pub use orders::{Order, OrderStatus, OrderType, SubmitOrder};
pub use types::OrderSide;
