use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Failures after which a custom host is skipped in favour of a default one.
pub const MAX_CUSTOM_HOST_FAILURES: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostType {
    Full,
    Tx,
    Evm,
    Explorer,
    Musig,
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HostType::Full => "full",
            HostType::Tx => "tx",
            HostType::Evm => "evm",
            HostType::Explorer => "explorer",
            HostType::Musig => "musig",
        };
        f.write_str(label)
    }
}

/// A node endpoint, either shipped with the network or added by the user.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkHost {
    pub host: String,
    #[serde(rename = "type")]
    pub kind: HostType,
    #[serde(default)]
    pub custom: bool,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing)]
    pub failed_count: u32,
}

fn default_enabled() -> bool {
    true
}

impl NetworkHost {
    pub fn new(host: impl Into<String>, kind: HostType) -> Self {
        Self {
            host: host.into(),
            kind,
            custom: false,
            enabled: true,
            failed_count: 0,
        }
    }

    pub fn custom(host: impl Into<String>, kind: HostType) -> Self {
        Self {
            custom: true,
            ..Self::new(host, kind)
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.failed_count < MAX_CUSTOM_HOST_FAILURES
    }
}

/// Picks the host a request of `kind` should go to.
///
/// Enabled custom hosts of the requested type win. With fallback enabled a
/// custom host that failed [`MAX_CUSTOM_HOST_FAILURES`] times is swapped for
/// a random default host; with fallback disabled a custom host is always
/// used.
pub fn select_host<'a, R>(
    hosts: &'a [NetworkHost],
    kind: HostType,
    fallback_to_default: bool,
    rng: &mut R,
) -> Option<&'a NetworkHost>
where
    R: Rng + ?Sized,
{
    let custom: Vec<&NetworkHost> = hosts
        .iter()
        .filter(|host| host.custom && host.enabled && host.kind == kind)
        .collect();
    let defaults: Vec<&NetworkHost> = hosts
        .iter()
        .filter(|host| !host.custom && host.kind == kind)
        .collect();

    if custom.is_empty() {
        return defaults.choose(rng).copied();
    }

    let candidate = custom.choose(rng).copied()?;
    if !fallback_to_default || candidate.is_healthy() {
        return Some(candidate);
    }
    defaults.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn failing_custom() -> NetworkHost {
        NetworkHost {
            failed_count: 5,
            ..NetworkHost::custom("https://mine.example", HostType::Full)
        }
    }

    #[test]
    fn defaults_are_used_without_custom_hosts() {
        let hosts = vec![
            NetworkHost::new("https://a.example", HostType::Full),
            NetworkHost::new("https://tx.example", HostType::Tx),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let selected = select_host(&hosts, HostType::Tx, true, &mut rng).expect("host");
        assert_eq!(selected.host, "https://tx.example");
        assert!(select_host(&hosts, HostType::Evm, true, &mut rng).is_none());
    }

    #[test]
    fn failing_custom_host_is_skipped_when_fallback_enabled() {
        let hosts = vec![
            failing_custom(),
            NetworkHost::new("https://a.example", HostType::Full),
            NetworkHost::new("https://b.example", HostType::Full),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..64 {
            let selected = select_host(&hosts, HostType::Full, true, &mut rng).expect("host");
            assert!(!selected.custom);
        }
    }

    #[test]
    fn custom_host_is_kept_when_fallback_disabled() {
        let hosts = vec![
            failing_custom(),
            NetworkHost::new("https://a.example", HostType::Full),
        ];
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..64 {
            let selected = select_host(&hosts, HostType::Full, false, &mut rng).expect("host");
            assert!(selected.custom);
        }
    }

    #[test]
    fn disabled_or_mismatched_custom_hosts_are_ignored() {
        let mut disabled = NetworkHost::custom("https://off.example", HostType::Full);
        disabled.enabled = false;
        let hosts = vec![
            disabled,
            NetworkHost::custom("https://evm.example", HostType::Evm),
            NetworkHost::new("https://a.example", HostType::Full),
        ];
        let mut rng = StdRng::seed_from_u64(11);
        let selected = select_host(&hosts, HostType::Full, false, &mut rng).expect("host");
        assert_eq!(selected.host, "https://a.example");
    }

    #[test]
    fn healthy_custom_host_is_preferred() {
        let hosts = vec![
            NetworkHost {
                failed_count: 2,
                ..NetworkHost::custom("https://mine.example", HostType::Full)
            },
            NetworkHost::new("https://a.example", HostType::Full),
        ];
        let mut rng = StdRng::seed_from_u64(5);
        let selected = select_host(&hosts, HostType::Full, true, &mut rng).expect("host");
        assert!(selected.custom);
    }
}
