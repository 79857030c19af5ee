pub mod reports;
pub mod shift;
pub mod tester;

pub use shift::*;
pub use tester::*;
