//! SeaORM entities for the pharmacy tables.

pub mod article;
pub mod cart;
pub mod cart_line;
pub mod dci;
pub mod invoice;
pub mod lot;
pub mod sale;
pub mod sale_line;
