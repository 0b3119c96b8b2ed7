pub mod coupon;
pub mod payment;
pub mod status;
pub mod view;
