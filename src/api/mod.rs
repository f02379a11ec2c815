pub mod events;
pub mod kiosk;
pub mod marks;
pub mod reports;
pub mod sessions;
