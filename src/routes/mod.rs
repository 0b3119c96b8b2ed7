pub mod appointments;
pub mod auth;
pub mod coupons;
pub mod notifications;
pub mod payments;
pub mod providers;
pub mod users;
