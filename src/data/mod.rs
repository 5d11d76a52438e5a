pub mod preprocessing;
pub mod reference;
