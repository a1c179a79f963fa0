pub mod coordinator;
pub mod locks;
pub mod reference;
pub mod tickets;

pub use coordinator::BookingCoordinator;
pub use locks::{AcquireOutcome, SeatLockManager};
pub use reference::ReferenceGenerator;
pub use tickets::TicketPipeline;
