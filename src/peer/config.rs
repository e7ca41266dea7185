//! Per-peer configuration

/// Peer configuration options
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Frames the hub may queue for this peer before it counts as too slow
    pub outbox_capacity: usize,

    /// Longest accepted message body in bytes (0 = unbounded)
    pub max_body_len: usize,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: 64,
            max_body_len: 4096,
        }
    }
}

impl PeerConfig {
    /// Set the outbox capacity (at least 1)
    pub fn outbox_capacity(mut self, capacity: usize) -> Self {
        self.outbox_capacity = capacity.max(1);
        self
    }

    /// Set the body length limit
    pub fn max_body_len(mut self, len: usize) -> Self {
        self.max_body_len = len;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PeerConfig::default();
        assert_eq!(config.outbox_capacity, 64);
        assert_eq!(config.max_body_len, 4096);
    }

    #[test]
    fn test_builder() {
        let config = PeerConfig::default().outbox_capacity(0).max_body_len(0);
        assert_eq!(config.outbox_capacity, 1);
        assert_eq!(config.max_body_len, 0);
    }
}
