pub mod ca;
pub mod certificate;

pub use ca::{Enroller, FabricCaClient};
pub use certificate::{Credentials, Enrollment, X509Identity};
