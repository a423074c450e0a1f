pub mod certificate;
pub mod chai;
pub mod review;
pub mod store;
pub mod user;
