// Core types shared by the gateway, the breed cache, and the controllers.
pub mod cat;
pub mod error;
pub mod fields;
