//! Height-indexed protocol configuration.
//!
//! Milestones arrive as loose JSON objects. [`MilestoneConfig::set_config`]
//! sorts them by height, checks that validator-count changes land on round
//! boundaries, and merges every milestone forward so that each snapshot is
//! complete on its own. Lookups by height go through a cursor that walks
//! forward or backward from the previous answer.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

const HEIGHT_KEY: &str = "height";
const ACTIVE_VALIDATORS_KEY: &str = "activeValidators";
const VALIDATOR_REGISTRATION_FEE_KEY: &str = "validatorRegistrationFee";
const BLOCK_TIME_KEY: &str = "blockTime";
const REWARD_KEY: &str = "reward";
const DEFAULT_TARGET_HEIGHT: u64 = 1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MilestoneError {
    #[error("configuration has not been set")]
    ConfigNotSet,
    #[error("no milestone found: configuration has not been set")]
    MilestoneNotFound,
    #[error("no milestones have been set")]
    NoMilestonesSet,
    #[error("validator count change at height {height} does not fall on a round boundary")]
    InvalidValidatorChange { height: u64 },
    #[error("unknown configuration key `{0}`")]
    UnknownConfig(String),
    #[error("invalid milestone configuration: {0}")]
    InvalidPayload(String),
}

/// One merged protocol-parameter snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Milestone {
    height: u64,
    data: Map<String, Value>,
}

impl Milestone {
    pub fn from_value(value: Value) -> Result<Self, MilestoneError> {
        let Value::Object(data) = value else {
            return Err(MilestoneError::InvalidPayload(
                "milestone must be an object".into(),
            ));
        };
        let height = data
            .get(HEIGHT_KEY)
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                MilestoneError::InvalidPayload("milestone is missing a numeric height".into())
            })?;
        Ok(Self { height, data })
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.data.clone())
    }

    pub fn active_validators(&self) -> Option<u64> {
        self.get(ACTIVE_VALIDATORS_KEY)
            .and_then(value_as_u128)
            .and_then(|value| u64::try_from(value).ok())
    }

    pub fn validator_registration_fee(&self) -> Option<u128> {
        self.get(VALIDATOR_REGISTRATION_FEE_KEY).and_then(value_as_u128)
    }

    pub fn block_time(&self) -> Option<u64> {
        self.get(BLOCK_TIME_KEY)
            .and_then(value_as_u128)
            .and_then(|value| u64::try_from(value).ok())
    }

    pub fn reward(&self) -> Option<u128> {
        self.get(REWARD_KEY).and_then(value_as_u128)
    }
}

/// Reads numbers that nodes send either as JSON numbers or decimal strings.
pub fn value_as_u128(value: &Value) -> Option<u128> {
    match value {
        Value::Number(number) => number.as_u64().map(u128::from),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Position of the last answered lookup. `current` is always
/// `milestones[index]`.
#[derive(Clone, Debug)]
pub struct MilestoneCursor {
    index: usize,
    current: Arc<Milestone>,
}

impl MilestoneCursor {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> &Arc<Milestone> {
        &self.current
    }
}

/// Result of [`MilestoneConfig::get_next_milestone_with_new_key`].
#[derive(Clone, Debug, PartialEq)]
pub struct NextMilestone {
    pub found: bool,
    pub height: u64,
    pub data: Option<Arc<Milestone>>,
}

#[derive(Debug, Default)]
struct ConfigState {
    config: Option<Value>,
    milestones: Vec<Arc<Milestone>>,
    cursor: Option<MilestoneCursor>,
    height: Option<u64>,
}

/// Protocol configuration for a single network.
///
/// The cursor is shared mutable state; keep one instance per network and
/// profile instead of sharing it across concurrent height queries.
#[derive(Debug, Default)]
pub struct MilestoneConfig {
    state: RwLock<ConfigState>,
}

impl MilestoneConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from a `{ milestones, network }` payload.
    pub fn from_payload(payload: Value) -> Result<Self, MilestoneError> {
        let config = Self::new();
        config.set_config_payload(payload)?;
        Ok(config)
    }

    pub fn set_config_payload(&self, payload: Value) -> Result<(), MilestoneError> {
        let Value::Object(mut payload) = payload else {
            return Err(MilestoneError::InvalidPayload(
                "configuration must be an object".into(),
            ));
        };
        let milestones = match payload.remove("milestones") {
            Some(Value::Array(milestones)) => milestones,
            Some(_) => {
                return Err(MilestoneError::InvalidPayload(
                    "milestones must be an array".into(),
                ))
            }
            None => Vec::new(),
        };
        let network = payload.remove("network").unwrap_or(Value::Null);
        self.set_config(milestones, network)
    }

    /// Sorts, validates and merges `milestones`, then resets the cursor.
    pub fn set_config(&self, milestones: Vec<Value>, network: Value) -> Result<(), MilestoneError> {
        let mut parsed = milestones
            .into_iter()
            .map(Milestone::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        parsed.sort_by_key(Milestone::height);
        validate_milestones(&parsed)?;
        let merged = merge_forward(parsed);

        let mut config = Map::new();
        config.insert(
            "milestones".into(),
            Value::Array(merged.iter().map(Milestone::to_value).collect()),
        );
        config.insert("network".into(), network);

        let milestones: Vec<Arc<Milestone>> = merged.into_iter().map(Arc::new).collect();
        let cursor = milestones.first().map(|first| MilestoneCursor {
            index: 0,
            current: Arc::clone(first),
        });

        let mut state = self.state.write();
        info!(milestones = milestones.len(), "protocol configuration loaded");
        state.config = Some(Value::Object(config));
        state.milestones = milestones;
        state.cursor = cursor;
        Ok(())
    }

    pub fn set_height(&self, height: u64) {
        self.state.write().height = Some(height);
    }

    pub fn get_height(&self) -> Option<u64> {
        self.state.read().height
    }

    /// Dotted-path lookup into the active configuration object.
    pub fn get(&self, key: &str) -> Result<Value, MilestoneError> {
        let state = self.state.read();
        let config = state.config.as_ref().ok_or(MilestoneError::ConfigNotSet)?;
        resolve_path(config, key)
            .cloned()
            .ok_or_else(|| MilestoneError::UnknownConfig(key.to_string()))
    }

    /// Like [`MilestoneConfig::get`] but yields `None` instead of failing.
    pub fn get_loose(&self, key: &str) -> Option<Value> {
        let state = self.state.read();
        state
            .config
            .as_ref()
            .and_then(|config| resolve_path(config, key))
            .cloned()
    }

    pub fn set(&self, key: &str, value: Value) -> Result<(), MilestoneError> {
        let mut state = self.state.write();
        let config = state.config.as_mut().ok_or(MilestoneError::ConfigNotSet)?;
        assign_path(config, key, value);
        Ok(())
    }

    pub fn all(&self) -> Option<Value> {
        self.state.read().config.clone()
    }

    pub fn milestones(&self) -> Vec<Arc<Milestone>> {
        self.state.read().milestones.clone()
    }

    pub fn cursor(&self) -> Option<MilestoneCursor> {
        self.state.read().cursor.clone()
    }

    /// Milestone in force at `height` (or the stored height, or `1`).
    pub fn get_milestone(&self, height: Option<u64>) -> Result<Arc<Milestone>, MilestoneError> {
        let mut state = self.state.write();
        let target = height.or(state.height).unwrap_or(DEFAULT_TARGET_HEIGHT);
        let ConfigState {
            milestones, cursor, ..
        } = &mut *state;
        let cursor = cursor.as_mut().ok_or(MilestoneError::MilestoneNotFound)?;

        while milestones
            .get(cursor.index + 1)
            .is_some_and(|next| next.height <= target)
        {
            cursor.index += 1;
        }
        while cursor.index > 0 && milestones[cursor.index].height > target {
            cursor.index -= 1;
        }
        cursor.current = Arc::clone(&milestones[cursor.index]);
        Ok(Arc::clone(&cursor.current))
    }

    pub fn is_new_milestone(&self, height: Option<u64>) -> bool {
        let state = self.state.read();
        let target = height.or(state.height).unwrap_or(DEFAULT_TARGET_HEIGHT);
        state
            .milestones
            .iter()
            .any(|milestone| milestone.height == target)
    }

    /// First milestone above `after_height` whose `key` differs from the
    /// value in force at `after_height`.
    pub fn get_next_milestone_with_new_key(
        &self,
        after_height: u64,
        key: &str,
    ) -> Result<NextMilestone, MilestoneError> {
        if self.state.read().milestones.is_empty() {
            return Err(MilestoneError::NoMilestonesSet);
        }
        let current = self.get_milestone(Some(after_height))?;
        let current_value = current.get(key);

        let state = self.state.read();
        let next = state.milestones.iter().find(|milestone| {
            milestone.height > after_height
                && milestone
                    .get(key)
                    .is_some_and(|value| Some(value) != current_value)
        });
        Ok(match next {
            Some(milestone) => {
                debug!(key, height = milestone.height, "found milestone with new key");
                NextMilestone {
                    found: true,
                    height: milestone.height,
                    data: Some(Arc::clone(milestone)),
                }
            }
            None => NextMilestone {
                found: false,
                height: after_height,
                data: None,
            },
        })
    }
}

/// Checks that every change in `activeValidators` happens on a round
/// boundary of the previous validator count.
pub fn validate_milestones(milestones: &[Milestone]) -> Result<(), MilestoneError> {
    let with_validators: Vec<(u64, u64)> = milestones
        .iter()
        .filter_map(|milestone| {
            milestone
                .active_validators()
                .map(|count| (milestone.height, count))
        })
        .collect();

    for pair in with_validators.windows(2) {
        let (height_a, validators_a) = pair[0];
        let (height_b, validators_b) = pair[1];
        if validators_a == validators_b {
            continue;
        }
        let aligned = (height_b - height_a)
            .checked_rem(validators_a)
            .is_some_and(|rest| rest == 0);
        if !aligned {
            return Err(MilestoneError::InvalidValidatorChange { height: height_b });
        }
    }
    Ok(())
}

fn merge_forward(milestones: Vec<Milestone>) -> Vec<Milestone> {
    let mut merged: Vec<Milestone> = Vec::with_capacity(milestones.len());
    for milestone in milestones {
        let data = match merged.last() {
            Some(previous) => deep_merge(&previous.data, &milestone.data),
            None => milestone.data,
        };
        merged.push(Milestone {
            height: milestone.height,
            data,
        });
    }
    merged
}

/// Objects merge key by key; arrays and scalars from `overlay` replace.
fn deep_merge(base: &Map<String, Value>, overlay: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, value) in overlay {
        match (merged.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                *existing = deep_merge(existing, incoming);
            }
            _ => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}

fn resolve_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn assign_path(root: &mut Value, path: &str, value: Value) {
    let mut current = root;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}
