/*!
The [`ResourceAttributes`] type.
*/

/**
Identifies the host that metrics were collected from.

These are detected once at startup and shared, unchanged, by every batch.
*/
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceAttributes {
    pub hostname: String,
    pub username: String,
}

impl ResourceAttributes {
    pub fn new(hostname: impl Into<String>, username: impl Into<String>) -> Self {
        ResourceAttributes {
            hostname: hostname.into(),
            username: username.into(),
        }
    }
}
