pub mod code;
pub mod model;
pub mod service;
pub mod sweeper;

pub use code::generate_booking_code;
pub use model::*;
pub use service::BookingService;
pub use sweeper::hold_sweeper;
