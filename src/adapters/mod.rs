pub mod access;
pub mod admin;
pub mod api_errors;
pub mod checkout;
pub mod razorpay;
pub mod verify;
pub mod webhook;
