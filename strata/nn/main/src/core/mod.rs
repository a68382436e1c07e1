pub mod chain;
pub mod conv;
pub mod data;
pub mod options;
