//! Node discovery — finds nodes on the local network or locally.
//!
//! Supports local-only discovery (this machine) and mDNS-based LAN
//! peer discovery using the `_rustant._tcp.local.` service name.
//! The mDNS layer is trait-abstracted for testability.

use super::types::{Capability, NodeId, NodeInfo, Platform};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── mDNS constants ──────────────────────────────────────────────────

/// mDNS multicast group (IPv4).
pub const MDNS_MULTICAST_ADDR: &str = "224.0.0.251";
/// mDNS port.
pub const MDNS_PORT: u16 = 5353;
/// Service name used for Rustant node discovery.
pub const RUSTANT_SERVICE_NAME: &str = "_rustant._tcp.local.";

// ── mDNS service record ─────────────────────────────────────────────

/// An mDNS service record describing a Rustant node on the LAN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdnsServiceRecord {
    /// The service name (always `_rustant._tcp.local.`).
    pub service_name: String,
    /// Human-readable instance name (e.g. "DevMac-Rustant").
    pub instance_name: String,
    /// IP address of the advertising node.
    pub address: String,
    /// Gateway port the node listens on.
    pub port: u16,
    /// Platform of the advertising node.
    pub platform: Platform,
    /// Node id.
    pub node_id: String,
    /// Comma-separated capability list.
    pub capabilities_csv: String,
}

impl MdnsServiceRecord {
    /// Parse capabilities from the CSV field.
    pub fn parse_capabilities(&self) -> Vec<Capability> {
        if self.capabilities_csv.is_empty() {
            return Vec::new();
        }
        self.capabilities_csv
            .split(',')
            .filter_map(|s| match s.trim() {
                "shell" => Some(Capability::Shell),
                "filesystem" => Some(Capability::FileSystem),
                "applescript" => Some(Capability::AppleScript),
                "automator" => Some(Capability::Automator),
                "screenshot" => Some(Capability::Screenshot),
                "clipboard" => Some(Capability::Clipboard),
                "notifications" => Some(Capability::Notifications),
                "browser" => Some(Capability::Browser),
                "camera" => Some(Capability::Camera),
                "screen_record" => Some(Capability::ScreenRecord),
                "location" => Some(Capability::Location),
                other if other.starts_with("app_control:") => {
                    Some(Capability::AppControl(other[12..].to_string()))
                }
                other if other.starts_with("custom:") => {
                    Some(Capability::Custom(other[7..].to_string()))
                }
                _ => None,
            })
            .collect()
    }

    /// Build capability CSV from a slice of capabilities.
    pub fn capabilities_to_csv(caps: &[Capability]) -> String {
        caps.iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Convert to a `DiscoveredNode`.
    pub fn to_discovered_node(&self) -> DiscoveredNode {
        DiscoveredNode {
            node_id: NodeId::new(&self.node_id),
            address: self.address.clone(),
            port: self.port,
            platform: self.platform,
            capabilities: self.parse_capabilities(),
            discovered_at: Utc::now(),
        }
    }
}

// ── mDNS service trait ──────────────────────────────────────────────

/// Trait abstracting mDNS network operations for testability.
#[async_trait]
pub trait MdnsTransport: Send + Sync {
    /// Register (advertise) this node on the local network.
    async fn register(&self, record: &MdnsServiceRecord) -> Result<(), String>;

    /// Unregister (stop advertising) this node.
    async fn unregister(&self) -> Result<(), String>;

    /// Perform a single discovery scan and return found service records.
    async fn discover(&self, timeout_ms: u64) -> Result<Vec<MdnsServiceRecord>, String>;
}

// ── mDNS discovery coordinator ──────────────────────────────────────

/// Configuration for mDNS-based node discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdnsConfig {
    /// Whether mDNS discovery is enabled.
    pub enabled: bool,
    /// Scan interval in seconds for background discovery.
    pub scan_interval_secs: u64,
    /// Timeout in milliseconds for each discovery scan.
    pub scan_timeout_ms: u64,
    /// Maximum age in seconds before a node is considered stale.
    pub stale_threshold_secs: u64,
}

impl Default for MdnsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scan_interval_secs: 30,
            scan_timeout_ms: 3000,
            stale_threshold_secs: 120,
        }
    }
}

/// mDNS-based discovery coordinator.
///
/// Wraps an `MdnsTransport` implementation and manages registration,
/// scanning, and stale-node pruning.
pub struct MdnsDiscovery {
    transport: Box<dyn MdnsTransport>,
    config: MdnsConfig,
    /// The record this node advertises (set after `register()`).
    local_record: Option<MdnsServiceRecord>,
    /// Nodes found via mDNS scans.
    found: Vec<DiscoveredNode>,
}

impl MdnsDiscovery {
    pub fn new(transport: Box<dyn MdnsTransport>, config: MdnsConfig) -> Self {
        Self {
            transport,
            config,
            local_record: None,
            found: Vec::new(),
        }
    }

    /// Register this node on the network.
    pub async fn register(&mut self, record: MdnsServiceRecord) -> Result<(), String> {
        self.transport.register(&record).await?;
        self.local_record = Some(record);
        Ok(())
    }

    /// Unregister this node.
    pub async fn unregister(&mut self) -> Result<(), String> {
        self.transport.unregister().await?;
        self.local_record = None;
        Ok(())
    }

    /// Whether this node is currently registered/advertising.
    pub fn is_registered(&self) -> bool {
        self.local_record.is_some()
    }

    /// Perform a single discovery scan. Returns newly found nodes.
    pub async fn scan(&mut self) -> Result<Vec<DiscoveredNode>, String> {
        let records = self.transport.discover(self.config.scan_timeout_ms).await?;
        let local_id = self.local_record.as_ref().map(|r| r.node_id.as_str());

        let mut new_nodes = Vec::new();
        for record in records {
            // Skip our own advertisement.
            if let Some(lid) = local_id {
                if record.node_id == lid {
                    continue;
                }
            }

            let already_known = self.found.iter().any(|n| n.node_id.0 == record.node_id);
            let discovered = record.to_discovered_node();

            if already_known {
                // Refresh timestamp for existing node.
                if let Some(existing) = self
                    .found
                    .iter_mut()
                    .find(|n| n.node_id.0 == record.node_id)
                {
                    existing.discovered_at = Utc::now();
                    existing.capabilities = discovered.capabilities;
                }
            } else {
                new_nodes.push(discovered.clone());
                self.found.push(discovered);
            }
        }

        Ok(new_nodes)
    }

    /// All currently known remote nodes from mDNS.
    pub fn found_nodes(&self) -> &[DiscoveredNode] {
        &self.found
    }

    /// Remove stale nodes that haven't been refreshed within the threshold.
    pub fn prune_stale(&mut self) -> usize {
        let now = Utc::now();
        let threshold = self.config.stale_threshold_secs as i64;
        let before = self.found.len();
        self.found.retain(|node| {
            let age = now.signed_duration_since(node.discovered_at);
            age.num_seconds() < threshold
        });
        before - self.found.len()
    }

    /// Clear all found nodes.
    pub fn clear(&mut self) {
        self.found.clear();
    }

    /// Access the config.
    pub fn config(&self) -> &MdnsConfig {
        &self.config
    }
}

// ── Real UDP mDNS transport ─────────────────────────────────────────

/// A real mDNS transport that uses UDP multicast.
///
/// Sends and receives mDNS-like JSON packets on `224.0.0.251:5353`.
/// This is a simplified Rustant-specific protocol — not full RFC 6762 —
/// but uses the standard mDNS multicast group for LAN discovery.
pub struct UdpMdnsTransport {
    bind_addr: String,
}

impl UdpMdnsTransport {
    pub fn new() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", MDNS_PORT),
        }
    }

    pub fn with_bind_addr(addr: impl Into<String>) -> Self {
        Self {
            bind_addr: addr.into(),
        }
    }
}

impl Default for UdpMdnsTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MdnsTransport for UdpMdnsTransport {
    async fn register(&self, record: &MdnsServiceRecord) -> Result<(), String> {
        let socket = tokio::net::UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| format!("Failed to bind UDP socket: {e}"))?;

        let payload =
            serde_json::to_vec(record).map_err(|e| format!("Failed to serialize record: {e}"))?;

        let dest = format!("{}:{}", MDNS_MULTICAST_ADDR, MDNS_PORT);
        socket
            .send_to(&payload, &dest)
            .await
            .map_err(|e| format!("Failed to send mDNS announcement: {e}"))?;

        Ok(())
    }

    async fn unregister(&self) -> Result<(), String> {
        // In a full implementation, send a "goodbye" packet.
        // For now, simply stop advertising.
        Ok(())
    }

    async fn discover(&self, timeout_ms: u64) -> Result<Vec<MdnsServiceRecord>, String> {
        use std::net::Ipv4Addr;

        let socket = tokio::net::UdpSocket::bind(&self.bind_addr)
            .await
            .map_err(|e| format!("Failed to bind mDNS socket: {e}"))?;

        let multicast_addr: Ipv4Addr = MDNS_MULTICAST_ADDR
            .parse()
            .map_err(|e| format!("Invalid multicast addr: {e}"))?;

        socket
            .join_multicast_v4(multicast_addr, Ipv4Addr::UNSPECIFIED)
            .map_err(|e| format!("Failed to join multicast group: {e}"))?;

        let mut buf = vec![0u8; 4096];
        let mut records = Vec::new();
        let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_millis(timeout_ms);

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }

            match tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await {
                Ok(Ok((len, _addr))) => {
                    if let Ok(record) = serde_json::from_slice::<MdnsServiceRecord>(&buf[..len]) {
                        if record.service_name == RUSTANT_SERVICE_NAME {
                            records.push(record);
                        }
                    }
                }
                Ok(Err(_)) => break,
                Err(_) => break, // timeout
            }
        }

        Ok(records)
    }
}

// ── Original local discovery ────────────────────────────────────────

/// A node discovered on the network with connection metadata.
#[derive(Debug, Clone)]
pub struct DiscoveredNode {
    pub node_id: NodeId,
    pub address: String,
    pub port: u16,
    pub platform: Platform,
    pub capabilities: Vec<Capability>,
    pub discovered_at: DateTime<Utc>,
}

/// Discovers nodes available for task execution (local + mDNS).
#[derive(Debug, Clone, Default)]
pub struct NodeDiscovery {
    discovered: Vec<NodeInfo>,
    network_discovered: Vec<DiscoveredNode>,
}

impl NodeDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discover the local machine as a node.
    pub fn discover_local(&mut self) -> NodeInfo {
        let platform = Self::detect_platform();
        let hostname = Self::get_hostname();
        let info = NodeInfo {
            node_id: NodeId::new(format!("local-{}", hostname)),
            name: format!("Local ({})", hostname),
            platform,
            hostname,
            registered_at: Utc::now(),
            os_version: None,
            agent_version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: 0,
        };
        self.discovered.push(info.clone());
        info
    }

    /// Number of discovered nodes.
    pub fn discovered_count(&self) -> usize {
        self.discovered.len()
    }

    /// All discovered nodes.
    pub fn discovered_nodes(&self) -> &[NodeInfo] {
        &self.discovered
    }

    /// Clear all discovered nodes.
    pub fn clear(&mut self) {
        self.discovered.clear();
        self.network_discovered.clear();
    }

    /// Add a network-discovered node.
    pub fn add_network_node(&mut self, node: DiscoveredNode) {
        self.network_discovered.push(node);
    }

    /// List all network-discovered nodes.
    pub fn network_nodes(&self) -> &[DiscoveredNode] {
        &self.network_discovered
    }

    /// Remove stale network-discovered nodes older than `max_age_secs`.
    /// Returns the number of removed entries.
    pub fn remove_stale(&mut self, max_age_secs: u64) -> usize {
        let now = Utc::now();
        let before = self.network_discovered.len();
        self.network_discovered.retain(|node| {
            let age = now.signed_duration_since(node.discovered_at);
            age.num_seconds() < max_age_secs as i64
        });
        before - self.network_discovered.len()
    }

    /// Detect the current platform.
    fn detect_platform() -> Platform {
        if cfg!(target_os = "macos") {
            Platform::MacOS
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Unknown
        }
    }

    /// Get the hostname.
    fn get_hostname() -> String {
        std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("HOST"))
            .unwrap_or_else(|_| "unknown".to_string())
    }
}
