//! Configuration validation utilities

use crate::schema::Config;
use types::utils::is_valid_bech32_like;
use types::Result;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate complete configuration
    pub fn validate(config: &Config) -> Result<ValidationReport> {
        let mut report = ValidationReport::new();

        Self::validate_network(config, &mut report);
        Self::validate_protocol(config, &mut report);
        Self::validate_fees(config, &mut report);
        Self::validate_drafting(config, &mut report);
        Self::validate_logging(config, &mut report);

        Ok(report)
    }

    fn validate_network(config: &Config, report: &mut ValidationReport) {
        let network = &config.network;

        if network.currency_id.is_empty() {
            report.add_error("network.currency_id", "Currency id cannot be empty");
        }

        if network.denom.is_empty() {
            report.add_error("network.denom", "Denomination cannot be empty");
        }

        if network.unit_magnitude > 18 {
            report.add_warning(
                "network.unit_magnitude",
                &format!("Unit magnitude {} is unusually large", network.unit_magnitude),
            );
        }

        if network.account_prefix.is_empty() {
            report.add_error("network.account_prefix", "Account prefix cannot be empty");
        }

        if network.validator_prefix.is_empty() {
            report.add_error("network.validator_prefix", "Validator prefix cannot be empty");
        } else if network.validator_prefix == network.account_prefix {
            report.add_error(
                "network.validator_prefix",
                "Validator prefix must differ from the account prefix",
            );
        }

        if !is_valid_bech32_like(&network.placeholder_recipient, &network.account_prefix) {
            report.add_error(
                "network.placeholder_recipient",
                "Placeholder recipient is not a valid account address",
            );
        }

        match network.node_url {
            Some(ref node_url) => {
                if !node_url.starts_with("http://") && !node_url.starts_with("https://") {
                    report.add_error("network.node_url", "Node URL must start with http:// or https://");
                } else if node_url.starts_with("http://") {
                    report.add_warning("network.node_url", "Node URL should use HTTPS");
                }
            }
            None => {
                report.add_warning(
                    "network.node_url",
                    "No node configured, fees will be quoted from the offline gas schedule",
                );
            }
        }

        if network.request_timeout_seconds == 0 {
            report.add_error("network.request_timeout_seconds", "Timeout cannot be zero");
        } else if network.request_timeout_seconds > 300 {
            report.add_warning(
                "network.request_timeout_seconds",
                &format!("Timeout is very high ({}s)", network.request_timeout_seconds),
            );
        }
    }

    fn validate_protocol(config: &Config, report: &mut ValidationReport) {
        let protocol = &config.protocol;

        if protocol.max_delegations == 0 {
            report.add_error("protocol.max_delegations", "Max delegations cannot be 0");
        }

        if protocol.max_unbondings == 0 {
            report.add_error("protocol.max_unbondings", "Max unbondings cannot be 0");
        }

        if protocol.max_redelegations == 0 {
            report.add_error("protocol.max_redelegations", "Max redelegations cannot be 0");
        }

        if protocol.unbonding_period_days <= 0 {
            report.add_error("protocol.unbonding_period_days", "Unbonding period must be positive");
        }

        match config.protocol_params() {
            Ok(params) => {
                if params.min_safe.is_sign_negative() {
                    report.add_error("protocol.min_safe", "Safety reserve cannot be negative");
                }
                if params.min_fees.is_sign_negative() {
                    report.add_error("protocol.min_fees", "Fee floor cannot be negative");
                }
                if params.min_fees.is_zero() {
                    report.add_warning("protocol.min_fees", "Fee floor is zero, delegations reserve nothing for fees");
                }
            }
            Err(e) => {
                report.add_error("protocol", &format!("Failed to parse protocol: {}", e));
            }
        }
    }

    fn validate_fees(config: &Config, report: &mut ValidationReport) {
        if config.fees.cache_size == 0 {
            report.add_error("fees.cache_size", "Cache size cannot be 0");
        } else if config.fees.cache_size > 10_000 {
            report.add_warning("fees.cache_size", "Cache size is very high");
        }

        let schedule = &config.fees.schedule;
        match schedule.parse_prices() {
            Ok(prices) => {
                if prices.gas_amplifier < rust_decimal::Decimal::ONE {
                    report.add_warning(
                        "fees.schedule.gas_amplifier",
                        "Gas amplifier below 1 may under-estimate gas",
                    );
                }
                if prices.gas_price.is_sign_negative() || prices.gas_price.is_zero() {
                    report.add_error("fees.schedule.gas_price", "Gas price must be positive");
                }
                if prices.min_fee.is_sign_negative() {
                    report.add_error("fees.schedule.min_fee", "Minimum fee cannot be negative");
                }
            }
            Err(e) => {
                report.add_error("fees.schedule", &format!("Failed to parse gas schedule: {}", e));
            }
        }

        if schedule.base_gas == 0 {
            report.add_warning("fees.schedule.base_gas", "Base gas is zero");
        }
    }

    fn validate_drafting(config: &Config, report: &mut ValidationReport) {
        if config.drafting.default_memo.is_empty() {
            report.add_warning("drafting.default_memo", "Default memo is empty");
        } else if config.drafting.default_memo.len() > 256 {
            report.add_error("drafting.default_memo", "Default memo exceeds 256 bytes");
        }

        if config.drafting.batch_size == 0 {
            report.add_error("drafting.batch_size", "Batch size cannot be 0");
        } else if config.drafting.batch_size > 50 {
            report.add_warning("drafting.batch_size", "Large batch sizes may be rate limited by the node");
        }
    }

    fn validate_logging(config: &Config, report: &mut ValidationReport) {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.logging.level.as_str()) {
            report.add_warning(
                "logging.level",
                &format!(
                    "Log level '{}' is not a plain level, it will be parsed as a filter directive",
                    config.logging.level
                ),
            );
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&config.logging.format.as_str()) {
            report.add_error(
                "logging.format",
                &format!(
                    "Invalid log format: {}. Valid formats: {:?}",
                    config.logging.format, valid_formats
                ),
            );
        }

        if let Some(ref file_path) = config.logging.file_path {
            if let Some(parent) = std::path::Path::new(file_path).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    report.add_warning("logging.file_path", "Log file directory does not exist");
                }
            }
        }
    }
}

/// Validation report containing errors and warnings
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

/// A validation issue (error or warning)
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn summary(&self) -> String {
        format!("Validation: {} errors, {} warnings", self.errors.len(), self.warnings.len())
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}
