pub mod assets;
pub mod nullable;
pub mod response;
