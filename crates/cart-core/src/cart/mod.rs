//! Shopping cart module.
//!
//! Contains the canonical item type and the sku-unique cart.

mod cart;
mod item;

pub use cart::{Cart, MAX_QUANTITY_PER_ITEM};
pub use item::{CartItem, DEFAULT_CATEGORY, DEFAULT_NAME};
