pub mod availability;
pub mod booking;
pub mod capacity;
pub mod directory;
pub mod lifecycle;
pub mod settings;
pub mod slots;
pub mod validator;
