pub mod backfill;
pub mod events;
pub mod lateness;
pub mod mark;
pub mod registry;
