pub mod event;
pub mod genre;
pub mod reservation;
pub mod role;
pub mod timeslot;
pub mod venue;

pub use event::{Event, EventView};
pub use genre::Genre;
pub use reservation::{Reservation, ReservationView};
pub use role::Role;
pub use timeslot::{Timeslot, TimeslotView};
pub use venue::Venue;
