pub const APP_ID_BASE: &str = "dev.keepsync";

pub const DBUS_NAME_SYNC: &str = "dev.keepsync.Sync1";
pub const DBUS_INTERFACE_SYNC: &str = "dev.keepsync.Sync1";
pub const DBUS_OBJECT_PATH_SYNC: &str = "/dev/keepsync/Sync1";

pub const DBUS_ERROR_NOT_FOUND: &str = "dev.keepsync.Sync1.Error.NotFound";
pub const DBUS_ERROR_HALTED: &str = "dev.keepsync.Sync1.Error.Halted";
pub const DBUS_ERROR_INVALID_TEXT: &str = "dev.keepsync.Sync1.Error.InvalidText";
pub const DBUS_ERROR_FAILED: &str = "dev.keepsync.Sync1.Error.Failed";

pub const KEYRING_SERVICE: &str = APP_ID_BASE;
