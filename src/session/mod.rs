pub mod clock;
pub mod driver;
pub mod result;
pub mod retry;
pub mod review;
pub mod state;
