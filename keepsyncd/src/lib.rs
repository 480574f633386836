pub mod daemon;
pub mod dbus_api;
pub mod storage;
pub mod sync;
