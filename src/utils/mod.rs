pub mod currency;
pub mod input;
pub mod io;
pub mod plot;
