pub mod bootstrap;

pub use bootstrap::IdentityBootstrapper;
