pub mod history;
pub mod importance;
pub mod trainer;
