//! Order and receiving classification (C5, C6).

pub mod order;
pub mod receiving;

pub use order::{classify_order, OrderClassification, OrderType};
pub use receiving::{classify_receiving, ReceivingClassification, ReceivingUrgency};
