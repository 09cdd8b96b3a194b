//! Domain models shared by repositories, services, and handlers.

pub mod account;
pub mod catalogue;
pub mod order;

pub use account::{Account, Address};
pub use catalogue::{Image, Product, Tag};
pub use order::{Invoice, Order, OrderLine, Receipt, Report, TrolleyLine};
