/// Address a host's own client connects to.
pub const DEFAULT_LOOPBACK_ADDRESS: &str = "127.0.0.1";

/// Routes server and client starts through one sub-transport of an
/// aggregator instead of the default managers.
///
/// The same index is used for both halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MultiTransportSelector {
    pub enabled: bool,
    pub index: usize,
}

impl MultiTransportSelector {
    pub fn enabled(index: usize) -> Self {
        Self {
            enabled: true,
            index,
        }
    }

    /// The index to route through, if selection is on.
    pub fn active_index(&self) -> Option<usize> {
        self.enabled.then_some(self.index)
    }
}

/// Configuration for a [`SessionHandler`](crate::SessionHandler).
///
/// [`HandlerConfig::new`] applies the `NETSTART_*` environment overrides;
/// [`Default`] does not, so embedders and tests get the same settings
/// whatever the process environment holds.
///
/// ```rust
/// use netstart::HandlerConfig;
///
/// let config = HandlerConfig::new()
///     .multi_transport(1)
///     .loopback_address("::1");
/// ```
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    pub(crate) selector: MultiTransportSelector,
    pub(crate) loopback_address: String,
}

impl Default for HandlerConfig {
    /// Built-in defaults only; the environment is not read.
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl HandlerConfig {
    /// Create a new config with defaults.
    ///
    /// `NETSTART_MULTI_TRANSPORT_INDEX` enables multi-transport selection
    /// with that index; `NETSTART_LOOPBACK_ADDRESS` overrides the address a
    /// host's client connects to. Unparsable values are ignored.
    pub fn new() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let selector = match lookup("NETSTART_MULTI_TRANSPORT_INDEX") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(index) => MultiTransportSelector::enabled(index),
                Err(_) => {
                    tracing::warn!(value = %raw, "ignoring NETSTART_MULTI_TRANSPORT_INDEX");
                    MultiTransportSelector::default()
                }
            },
            None => MultiTransportSelector::default(),
        };
        let loopback_address = lookup("NETSTART_LOOPBACK_ADDRESS")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOOPBACK_ADDRESS.to_string());

        Self {
            selector,
            loopback_address,
        }
    }

    /// Route server and client starts through sub-transport `index`.
    pub fn multi_transport(mut self, index: usize) -> Self {
        self.selector = MultiTransportSelector::enabled(index);
        self
    }

    /// Use the default server/client managers.
    pub fn no_multi_transport(mut self) -> Self {
        self.selector.enabled = false;
        self
    }

    /// Address a host's own client connects to (default: `127.0.0.1`).
    pub fn loopback_address(mut self, address: impl Into<String>) -> Self {
        self.loopback_address = address.into();
        self
    }

    pub fn selector(&self) -> MultiTransportSelector {
        self.selector
    }

    pub fn loopback(&self) -> &str {
        &self.loopback_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults() {
        let config = HandlerConfig::default();
        assert_eq!(config.selector(), MultiTransportSelector::default());
        assert_eq!(config.selector().active_index(), None);
        assert_eq!(config.loopback(), "127.0.0.1");
    }

    #[test]
    fn default_matches_empty_environment() {
        let from_env = HandlerConfig::from_lookup(lookup(&[]));
        let default = HandlerConfig::default();
        assert_eq!(default.selector(), from_env.selector());
        assert_eq!(default.loopback(), from_env.loopback());

        let overridden = HandlerConfig::from_lookup(lookup(&[
            ("NETSTART_MULTI_TRANSPORT_INDEX", "1"),
            ("NETSTART_LOOPBACK_ADDRESS", "::1"),
        ]));
        assert_ne!(overridden.selector(), default.selector());
        assert_ne!(overridden.loopback(), default.loopback());
    }

    #[test]
    fn env_index_enables_selection() {
        let config = HandlerConfig::from_lookup(lookup(&[("NETSTART_MULTI_TRANSPORT_INDEX", "2")]));
        assert_eq!(config.selector().active_index(), Some(2));
    }

    #[test]
    fn bad_env_index_is_ignored() {
        let config = HandlerConfig::from_lookup(lookup(&[("NETSTART_MULTI_TRANSPORT_INDEX", "-1")]));
        assert_eq!(config.selector().active_index(), None);
    }

    #[test]
    fn blank_loopback_falls_back() {
        let config = HandlerConfig::from_lookup(lookup(&[("NETSTART_LOOPBACK_ADDRESS", "  ")]));
        assert_eq!(config.loopback(), DEFAULT_LOOPBACK_ADDRESS);
    }

    #[test]
    fn builder_overrides() {
        let config = HandlerConfig::default()
            .multi_transport(1)
            .loopback_address("::1");
        assert_eq!(config.selector(), MultiTransportSelector::enabled(1));
        assert_eq!(config.loopback(), "::1");

        let config = config.no_multi_transport();
        assert_eq!(config.selector().active_index(), None);
        assert_eq!(config.selector().index, 1);
    }
}
