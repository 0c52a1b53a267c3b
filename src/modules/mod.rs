pub mod debug;
pub mod info;
pub mod system;
pub mod teleport;
