//! Hub configuration

/// Hub configuration options
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of the event intake shared by all peers
    pub intake_capacity: usize,

    /// Deliver a broadcast back to the peer that sent it
    pub echo: bool,

    /// Capacity of the delivery feed (lagging subscribers lose entries)
    pub delivery_feed_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            intake_capacity: 1024,
            echo: true,
            delivery_feed_capacity: 256,
        }
    }
}

impl HubConfig {
    /// Set the intake capacity (at least 1)
    pub fn intake_capacity(mut self, capacity: usize) -> Self {
        self.intake_capacity = capacity.max(1);
        self
    }

    /// Enable or disable echoing broadcasts to their sender
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Set the delivery feed capacity (at least 1)
    pub fn delivery_feed_capacity(mut self, capacity: usize) -> Self {
        self.delivery_feed_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();

        assert_eq!(config.intake_capacity, 1024);
        assert!(config.echo);
        assert_eq!(config.delivery_feed_capacity, 256);
    }

    #[test]
    fn test_builder_chaining() {
        let config = HubConfig::default()
            .intake_capacity(8)
            .echo(false)
            .delivery_feed_capacity(16);

        assert_eq!(config.intake_capacity, 8);
        assert!(!config.echo);
        assert_eq!(config.delivery_feed_capacity, 16);
    }

    #[test]
    fn test_zero_capacities_are_raised() {
        // tokio channels panic on a zero capacity
        let config = HubConfig::default()
            .intake_capacity(0)
            .delivery_feed_capacity(0);

        assert_eq!(config.intake_capacity, 1);
        assert_eq!(config.delivery_feed_capacity, 1);
    }
}
