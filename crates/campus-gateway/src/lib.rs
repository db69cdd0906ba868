pub mod connection;
pub mod presence;
pub mod relay;
