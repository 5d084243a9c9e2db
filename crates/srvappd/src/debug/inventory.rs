//! Inventory of the HTTP listeners and the routes each one serves.

use std::net::SocketAddr;

use serde::Serialize;

/// One route served by a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    /// HTTP method, or `ANY`.
    pub method: &'static str,
    /// Path pattern.
    pub path: &'static str,
    /// Short description.
    pub description: &'static str,
}

impl RouteInfo {
    const fn new(method: &'static str, path: &'static str, description: &'static str) -> Self {
        Self {
            method,
            path,
            description,
        }
    }
}

/// Routes of the private debug listener.
pub const PRIVATE_ROUTES: &[RouteInfo] = &[
    RouteInfo::new("GET", "/debug/appinfo/", "listener and route inventory"),
    RouteInfo::new("GET", "/debug/counters/", "counter values"),
    RouteInfo::new("GET", "/debug/logs/", "recent log records, oldest first"),
    RouteInfo::new("POST", "/cmd/crash/", "crash the process after a short delay"),
    RouteInfo::new("POST", "/cmd/shutdown/", "shut down after a short delay"),
    RouteInfo::new("GET", "/*", "private static files"),
];

/// Routes of the public listener.
pub const PUBLIC_ROUTES: &[RouteInfo] = &[RouteInfo::new("GET", "/*", "public static files")];

/// One bound listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListenerInfo {
    /// Listener label.
    pub name: &'static str,
    /// Bound address.
    pub address: String,
    /// Routes served.
    pub routes: Vec<RouteInfo>,
}

impl ListenerInfo {
    /// Describes the private debug listener bound to `address`.
    #[must_use]
    pub fn private(address: SocketAddr) -> Self {
        Self {
            name: "private",
            address: address.to_string(),
            routes: PRIVATE_ROUTES.to_vec(),
        }
    }

    /// Describes the public listener bound to `address`.
    #[must_use]
    pub fn public(address: SocketAddr) -> Self {
        Self {
            name: "public",
            address: address.to_string(),
            routes: PUBLIC_ROUTES.to_vec(),
        }
    }
}

/// Serialised as a JSON array of listeners.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HandlerInventory {
    listeners: Vec<ListenerInfo>,
}

impl HandlerInventory {
    /// Inventory over `listeners`.
    #[must_use]
    pub fn new(listeners: Vec<ListenerInfo>) -> Self {
        Self { listeners }
    }

    /// Registered listeners.
    #[must_use]
    pub fn listeners(&self) -> &[ListenerInfo] {
        &self.listeners
    }
}
