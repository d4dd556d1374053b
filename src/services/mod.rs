pub mod access;
pub mod notify;
pub mod recovery;
pub mod verification;
