//! Static registry of networks served by the upstream gateway.
//!
//! # Responsibilities
//! - Hold the (chain id, chain name) table in declaration order
//! - Validate and expand requested chain id lists
//! - Resolve names to ids and back

use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainId};

/// A single registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Network {
    pub chain_id: ChainId,
    pub name: &'static str,
}

const fn network(chain_id: u64, name: &'static str) -> Network {
    Network {
        chain_id: ChainId(chain_id),
        name,
    }
}

/// Networks supported by the gateway, in declaration order.
pub const SUPPORTED_NETWORKS: &[Network] = &[
    network(1, "ethereum"),
    network(43114, "avalanche"),
    network(56, "bsc"),
    network(137, "polygon"),
    network(10, "optimism"),
    network(42161, "arbitrum"),
    network(42170, "nova"),
    network(8453, "base"),
    network(534352, "scroll"),
    network(324, "zksync"),
    network(1101, "polygonzkevm"),
    network(1284, "moonbeam"),
    network(1285, "moonriver"),
    network(1313161554, "aurora"),
    network(1030, "confluxespace"),
    network(22776, "mapprotocol"),
    network(728126428, "tron"),
    network(42220, "celo"),
    network(25, "cronos"),
    network(250, "fantom"),
    network(100, "gnosis"),
    network(1666600000, "harmony"),
    network(128, "heco"),
    network(321, "kcc"),
    network(8217, "klaytn"),
    network(1088, "metis"),
    network(42262, "oasisemerald"),
    network(66, "okc"),
    network(210425, "platon"),
    network(108, "thundercore"),
];

/// Read-only view over a network table. Safe to share between tasks.
#[derive(Debug, Clone, Copy)]
pub struct ChainRegistry {
    networks: &'static [Network],
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new(SUPPORTED_NETWORKS)
    }
}

impl ChainRegistry {
    pub const fn new(networks: &'static [Network]) -> Self {
        Self { networks }
    }

    /// All entries, in declaration order.
    pub fn networks(&self) -> &'static [Network] {
        self.networks
    }

    pub fn is_supported(&self, chain_id: ChainId) -> bool {
        self.networks.iter().any(|n| n.chain_id == chain_id)
    }

    /// Expand a requested id list into registry entries.
    ///
    /// `[0]` selects every entry. Otherwise ids are kept in the given order,
    /// duplicates included; unsupported ids are logged and skipped.
    pub fn expand(&self, requested: &[ChainId]) -> Vec<Network> {
        if requested == [ChainId::ALL] {
            return self.networks.to_vec();
        }

        requested
            .iter()
            .filter_map(|&chain_id| match self.find(chain_id) {
                Some(network) => Some(*network),
                None => {
                    tracing::warn!(chain_id = %chain_id, "Chain id not supported, skipping");
                    None
                }
            })
            .collect()
    }

    /// Case-insensitive name lookup.
    pub fn name_to_id(&self, name: &str) -> BlockchainResult<ChainId> {
        self.networks
            .iter()
            .find(|n| n.name.eq_ignore_ascii_case(name.trim()))
            .map(|n| n.chain_id)
            .ok_or_else(|| BlockchainError::UnsupportedChainName(name.to_string()))
    }

    pub fn id_to_name(&self, chain_id: ChainId) -> Option<&'static str> {
        self.find(chain_id).map(|n| n.name)
    }

    fn find(&self, chain_id: ChainId) -> Option<&'static Network> {
        self.networks.iter().find(|n| n.chain_id == chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::{Layer, Registry};

    fn ids(networks: &[Network]) -> Vec<u64> {
        networks.iter().map(|n| n.chain_id.0).collect()
    }

    /// Collects the `chain_id` field of every WARN event.
    #[derive(Clone, Default)]
    struct WarningLayer {
        chain_ids: Arc<Mutex<Vec<String>>>,
    }

    struct ChainIdField<'a>(&'a mut Option<String>);

    impl Visit for ChainIdField<'_> {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "chain_id" {
                *self.0 = Some(format!("{value:?}"));
            }
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for WarningLayer {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() != tracing::Level::WARN {
                return;
            }
            let mut chain_id = None;
            event.record(&mut ChainIdField(&mut chain_id));
            if let Some(chain_id) = chain_id {
                self.chain_ids.lock().unwrap().push(chain_id);
            }
        }
    }

    #[test]
    fn expand_sentinel_returns_all_in_order() {
        let registry = ChainRegistry::default();
        let expanded = registry.expand(&[ChainId::ALL]);
        assert_eq!(expanded, SUPPORTED_NETWORKS.to_vec());
        assert_eq!(expanded[0].name, "ethereum");
        assert_eq!(expanded.last().unwrap().name, "thundercore");
    }

    #[test]
    fn expand_skips_unsupported() {
        let registry = ChainRegistry::default();
        assert!(registry.expand(&[ChainId(999_999)]).is_empty());
        assert_eq!(ids(&registry.expand(&[ChainId(137), ChainId(4), ChainId(1)])), vec![137, 1]);
    }

    #[test]
    fn expand_warns_for_each_unsupported_id() {
        let layer = WarningLayer::default();
        let subscriber = Registry::default().with(layer.clone());
        let expanded = tracing::subscriber::with_default(subscriber, || {
            ChainRegistry::default().expand(&[ChainId(999_999), ChainId(1), ChainId(4)])
        });

        assert_eq!(ids(&expanded), vec![1]);
        assert_eq!(*layer.chain_ids.lock().unwrap(), vec!["999999", "4"]);
    }

    #[test]
    fn expand_keeps_duplicates_and_order() {
        let registry = ChainRegistry::default();
        let expanded = registry.expand(&[ChainId(56), ChainId(1), ChainId(56)]);
        assert_eq!(ids(&expanded), vec![56, 1, 56]);
    }

    #[test]
    fn zero_mixed_with_others_is_not_the_sentinel() {
        let registry = ChainRegistry::default();
        assert_eq!(ids(&registry.expand(&[ChainId(0), ChainId(1)])), vec![1]);
    }

    #[test]
    fn name_lookup_is_case_insensitive() {
        let registry = ChainRegistry::default();
        assert_eq!(registry.name_to_id("Polygon").unwrap(), ChainId(137));
        assert_eq!(registry.name_to_id("ETHEREUM").unwrap(), ChainId(1));
        assert!(matches!(
            registry.name_to_id("dogechain"),
            Err(BlockchainError::UnsupportedChainName(name)) if name == "dogechain"
        ));
    }

    #[test]
    fn id_lookup() {
        let registry = ChainRegistry::default();
        assert!(registry.is_supported(ChainId(8453)));
        assert!(!registry.is_supported(ChainId(0)));
        assert_eq!(registry.id_to_name(ChainId(8453)), Some("base"));
        assert_eq!(registry.id_to_name(ChainId(31337)), None);
    }

    #[test]
    fn chain_ids_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for network in SUPPORTED_NETWORKS {
            assert!(seen.insert(network.chain_id), "duplicate id {}", network.chain_id);
        }
    }

    #[test]
    fn custom_table() {
        static TABLE: &[Network] = &[network(31337, "anvil")];
        let registry = ChainRegistry::new(TABLE);
        assert_eq!(ids(&registry.expand(&[ChainId::ALL])), vec![31337]);
        assert!(!registry.is_supported(ChainId(1)));
    }
}
