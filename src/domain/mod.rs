pub mod error;
pub mod grant;
pub mod id;
pub mod money;
pub mod payment;
pub mod product;
