pub mod booking;
pub mod commands;
pub mod events;
pub mod fare;
pub mod payment;
pub mod route;
