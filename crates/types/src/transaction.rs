//! Transaction drafts and their patches

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What a transaction does with the account's funds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum OperationMode {
    /// Transfer to another address
    #[default]
    Send,
    /// Bond spendable funds to validators
    Delegate,
    /// Start unbonding funds from validators
    Undelegate,
    /// Move bonded funds from a source validator to other validators
    Redelegate,
    /// Withdraw pending rewards
    ClaimReward,
    /// Withdraw pending rewards and bond them again
    ClaimRewardCompound,
}

impl OperationMode {
    pub const ALL: [OperationMode; 6] = [
        OperationMode::Send,
        OperationMode::Delegate,
        OperationMode::Undelegate,
        OperationMode::Redelegate,
        OperationMode::ClaimReward,
        OperationMode::ClaimRewardCompound,
    ];

    /// Parse mode from its wire name
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "send" => Some(OperationMode::Send),
            "delegate" => Some(OperationMode::Delegate),
            "undelegate" => Some(OperationMode::Undelegate),
            "redelegate" => Some(OperationMode::Redelegate),
            "claimReward" => Some(OperationMode::ClaimReward),
            "claimRewardCompound" => Some(OperationMode::ClaimRewardCompound),
            _ => None,
        }
    }

    /// Get mode wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationMode::Send => "send",
            OperationMode::Delegate => "delegate",
            OperationMode::Undelegate => "undelegate",
            OperationMode::Redelegate => "redelegate",
            OperationMode::ClaimReward => "claimReward",
            OperationMode::ClaimRewardCompound => "claimRewardCompound",
        }
    }

    /// Whether the mode targets validators rather than a recipient
    pub fn is_delegation_like(&self) -> bool {
        !matches!(self, OperationMode::Send)
    }

    /// Whether the mode withdraws pending rewards
    pub fn is_claim(&self) -> bool {
        matches!(
            self,
            OperationMode::ClaimReward | OperationMode::ClaimRewardCompound
        )
    }
}

impl std::fmt::Display for OperationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validator targeted by a draft
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DelegationInfo {
    pub address: String,
    pub amount: Decimal,
}

impl DelegationInfo {
    pub fn new(address: impl Into<String>, amount: Decimal) -> Self {
        Self {
            address: address.into(),
            amount,
        }
    }
}

/// Network conditions captured when the draft was priced
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkInfo {
    pub fees: Decimal,
}

/// Outcome of pricing a draft
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    pub estimated_fees: Decimal,
    pub estimated_gas: Option<Decimal>,
}

/// A transaction the user is building.
///
/// Drafts are values: updates produce a new draft.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    pub mode: OperationMode,
    pub amount: Decimal,
    pub recipient: String,
    pub fees: Option<Decimal>,
    pub gas: Option<Decimal>,
    pub memo: Option<String>,
    pub validators: Vec<DelegationInfo>,
    pub source_validator: Option<String>,
    pub use_all_amount: bool,
    pub network_info: Option<NetworkInfo>,
}

impl TransactionDraft {
    /// Sum of the amounts assigned to validators
    pub fn validators_total(&self) -> Decimal {
        self.validators.iter().map(|v| v.amount).sum()
    }

    /// Number of protocol messages the draft produces
    pub fn message_count(&self) -> usize {
        match self.mode {
            OperationMode::Send => 1,
            OperationMode::Delegate
            | OperationMode::Undelegate
            | OperationMode::Redelegate
            | OperationMode::ClaimReward => self.validators.len(),
            OperationMode::ClaimRewardCompound => self.validators.len() * 2,
        }
    }

    /// Merge every field present in `patch` into a copy of this draft
    pub fn apply(&self, patch: TransactionPatch) -> Self {
        let mut next = self.clone();
        if let Some(mode) = patch.mode {
            next.mode = mode;
        }
        if let Some(amount) = patch.amount {
            next.amount = amount;
        }
        if let Some(recipient) = patch.recipient {
            next.recipient = recipient;
        }
        if let Some(fees) = patch.fees {
            next.fees = fees;
        }
        if let Some(gas) = patch.gas {
            next.gas = gas;
        }
        if let Some(memo) = patch.memo {
            next.memo = memo;
        }
        if let Some(validators) = patch.validators {
            next.validators = validators;
        }
        if let Some(source_validator) = patch.source_validator {
            next.source_validator = source_validator;
        }
        if let Some(use_all_amount) = patch.use_all_amount {
            next.use_all_amount = use_all_amount;
        }
        if let Some(network_info) = patch.network_info {
            next.network_info = network_info;
        }
        next
    }
}

/// A partial update of a draft.
///
/// Nullable fields are `Option<Option<_>>`: `Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionPatch {
    pub mode: Option<OperationMode>,
    pub amount: Option<Decimal>,
    pub recipient: Option<String>,
    pub fees: Option<Option<Decimal>>,
    pub gas: Option<Option<Decimal>>,
    pub memo: Option<Option<String>>,
    pub validators: Option<Vec<DelegationInfo>>,
    pub source_validator: Option<Option<String>>,
    pub use_all_amount: Option<bool>,
    pub network_info: Option<Option<NetworkInfo>>,
}

impl TransactionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: OperationMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn fees(mut self, fees: Option<Decimal>) -> Self {
        self.fees = Some(fees);
        self
    }

    pub fn gas(mut self, gas: Option<Decimal>) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn memo(mut self, memo: Option<String>) -> Self {
        self.memo = Some(memo);
        self
    }

    pub fn validators(mut self, validators: Vec<DelegationInfo>) -> Self {
        self.validators = Some(validators);
        self
    }

    pub fn source_validator(mut self, source_validator: Option<String>) -> Self {
        self.source_validator = Some(source_validator);
        self
    }

    pub fn use_all_amount(mut self, use_all_amount: bool) -> Self {
        self.use_all_amount = Some(use_all_amount);
        self
    }

    pub fn network_info(mut self, network_info: Option<NetworkInfo>) -> Self {
        self.network_info = Some(network_info);
        self
    }
}
