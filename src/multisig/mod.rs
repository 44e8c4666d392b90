mod signatures;

pub use signatures::{signer_index, valid_signatures};

use serde::{Deserialize, Serialize};

/// Multi-signature requirements attached to a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiSignatureAsset {
    pub min: usize,
    pub public_keys: Vec<String>,
}

/// Everything the tracker needs to know about one transaction, captured once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultiSignatureSnapshot {
    pub asset: Option<MultiSignatureAsset>,
    pub signatures: Vec<String>,
    pub signature: Option<String>,
    pub sender_public_key: Option<String>,
    pub is_registration: bool,
}

/// Answers "who still has to sign" for a transaction collecting cosigner
/// signatures. A registration transaction needs every listed key plus a
/// final signature from the sender; any other multi-signature transaction
/// only needs `min` cosigners.
#[derive(Clone, Debug)]
pub struct MultiSignatureTracker {
    snapshot: MultiSignatureSnapshot,
}

impl MultiSignatureTracker {
    pub fn new(snapshot: MultiSignatureSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &MultiSignatureSnapshot {
        &self.snapshot
    }

    pub fn is_multi_signature(&self) -> bool {
        self.snapshot.asset.is_some()
    }

    pub fn is_registration(&self) -> bool {
        self.snapshot.is_registration
    }

    pub fn needs_all_signatures(&self) -> bool {
        self.valid_count() < self.public_keys().len()
    }

    pub fn needs_signatures(&self) -> bool {
        if self.snapshot.is_registration {
            return self.needs_all_signatures();
        }
        self.valid_count() < self.min()
    }

    pub fn needs_final_signature(&self) -> bool {
        if self.is_multi_signature() && !self.snapshot.is_registration {
            return false;
        }
        self.snapshot.signature.is_none()
    }

    pub fn is_multi_signature_ready(&self, exclude_final: bool) -> bool {
        if self.needs_signatures() {
            return false;
        }
        !(self.snapshot.is_registration && self.needs_final_signature() && !exclude_final)
    }

    pub fn needs_wallet_signature(&self, public_key: &str) -> bool {
        if !self.needs_signatures() && !self.needs_final_signature() {
            return false;
        }

        if self.snapshot.is_registration && self.is_multi_signature_ready(true) {
            return self.needs_final_signature()
                && self.snapshot.sender_public_key.as_deref() == Some(public_key);
        }

        let Some(index) = self.public_keys().iter().position(|key| key == public_key) else {
            return false;
        };
        let has_any = self
            .snapshot
            .signatures
            .iter()
            .any(|signature| signer_index(signature).map(usize::from) == Some(index));
        if !has_any {
            return true;
        }
        !self
            .valid()
            .iter()
            .any(|(signer, _)| usize::from(*signer) == index)
    }

    pub fn remaining_signature_count(&self) -> usize {
        let required = if self.snapshot.is_registration {
            self.public_keys().len()
        } else {
            self.min()
        };
        required.saturating_sub(self.snapshot.signatures.len())
    }

    pub fn valid_signature_count(&self) -> usize {
        self.valid_count()
    }

    fn valid(&self) -> Vec<(u8, &str)> {
        valid_signatures(&self.snapshot.signatures, self.public_keys().len())
    }

    fn valid_count(&self) -> usize {
        self.valid().len()
    }

    fn public_keys(&self) -> &[String] {
        self.snapshot
            .asset
            .as_ref()
            .map(|asset| asset.public_keys.as_slice())
            .unwrap_or(&[])
    }

    fn min(&self) -> usize {
        self.snapshot.asset.as_ref().map_or(0, |asset| asset.min)
    }
}
