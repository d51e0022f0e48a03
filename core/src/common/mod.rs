pub mod meta;
pub mod unit;
