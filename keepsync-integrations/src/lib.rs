pub mod ids;

/// Which side an item was first observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemOrigin {
    Local,
    Remote,
}

impl ItemOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemOrigin::Local => "local",
            ItemOrigin::Remote => "remote",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountHealth {
    Online,
    Offline,
    Error,
}

impl AccountHealth {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountHealth::Online => "online",
            AccountHealth::Offline => "offline",
            AccountHealth::Error => "error",
        }
    }

    pub fn parse(state: &str) -> Self {
        match state {
            "online" => AccountHealth::Online,
            "offline" => AccountHealth::Offline,
            _ => AccountHealth::Error,
        }
    }
}
