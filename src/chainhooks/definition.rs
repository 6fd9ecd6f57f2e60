//! Chainhook definitions built from simplified registration parameters

use super::models::ChainhookEventType;
use serde::{Deserialize, Serialize};

/// Stacks network a chainhook is registered on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StacksNetwork {
    Mainnet,
    #[default]
    Testnet,
}

impl StacksNetwork {
    /// Hosted chainhooks API for this network
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.mainnet.hiro.so",
            Self::Testnet => "https://api.testnet.hiro.so",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}

impl std::fmt::Display for StacksNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simplified parameters for registering a chainhook
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateChainhookParams {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Contract identifier (`<address>.<contract-name>`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<ChainhookEventType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decode_values: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_on_registration: Option<bool>,
}

impl CreateChainhookParams {
    /// Validate registration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Missing required field: name".to_string());
        }

        if let Some(contract_id) = &self.contract_id {
            if contract_id.trim().is_empty() {
                return Err("Contract id cannot be empty".to_string());
            }
        }

        Ok(())
    }
}

/// Full chainhook definition accepted by the chainhooks API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainhookDefinition {
    pub version: String,
    pub name: String,
    pub chain: String,
    pub network: StacksNetwork,
    pub filters: ChainhookFilters,
    pub action: ChainhookAction,
    pub options: ChainhookOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChainhookFilters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventFilter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventFilter {
    #[serde(rename = "type")]
    pub event_type: ChainhookEventType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_identifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployer: Option<String>,
}

impl EventFilter {
    fn of(event_type: ChainhookEventType) -> Self {
        Self {
            event_type,
            contract_identifier: None,
            function_name: None,
            deployer: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainhookAction {
    #[serde(rename = "type")]
    pub action_type: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainhookOptions {
    pub decode_clarity_values: bool,
    pub enable_on_registration: bool,
}

impl ChainhookDefinition {
    /// Build a definition that delivers matches to `webhook_url`
    pub fn from_params(
        params: &CreateChainhookParams,
        network: StacksNetwork,
        webhook_url: &str,
    ) -> Self {
        Self {
            version: params.version.clone().unwrap_or_else(|| "1".to_string()),
            name: params.name.clone(),
            chain: "stacks".to_string(),
            network,
            filters: build_filters(params),
            action: ChainhookAction {
                action_type: "http_post".to_string(),
                url: webhook_url.to_string(),
            },
            options: ChainhookOptions {
                decode_clarity_values: params.decode_values.unwrap_or(true),
                enable_on_registration: params.enable_on_registration.unwrap_or(true),
            },
        }
    }
}

fn build_filters(params: &CreateChainhookParams) -> ChainhookFilters {
    let contract_id = params.contract_id.as_deref();

    let filter = match (params.event_type, contract_id) {
        (Some(ChainhookEventType::ContractCall), Some(contract_id)) => Some(EventFilter {
            contract_identifier: Some(contract_id.to_string()),
            function_name: params.function_name.clone(),
            ..EventFilter::of(ChainhookEventType::ContractCall)
        }),
        (Some(ChainhookEventType::ContractDeployment), contract_id) => Some(EventFilter {
            deployer: contract_id
                .and_then(|id| id.split('.').next())
                .map(str::to_string),
            ..EventFilter::of(ChainhookEventType::ContractDeployment)
        }),
        (Some(ChainhookEventType::StxTransfer), _) => {
            Some(EventFilter::of(ChainhookEventType::StxTransfer))
        }
        (Some(ChainhookEventType::PrintEvent), Some(contract_id)) => Some(EventFilter {
            contract_identifier: Some(contract_id.to_string()),
            ..EventFilter::of(ChainhookEventType::PrintEvent)
        }),
        _ => None,
    };

    ChainhookFilters {
        events: filter.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WEBHOOK: &str = "https://relay.example.com/api/chainhooks/webhook";

    fn params(event_type: Option<ChainhookEventType>, contract_id: Option<&str>) -> CreateChainhookParams {
        CreateChainhookParams {
            name: "listener".to_string(),
            contract_id: contract_id.map(str::to_string),
            event_type,
            ..Default::default()
        }
    }

    #[test]
    fn test_contract_call_definition() {
        let mut p = params(
            Some(ChainhookEventType::ContractCall),
            Some("SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7.my-nft"),
        );
        p.function_name = Some("transfer".to_string());

        let definition = ChainhookDefinition::from_params(&p, StacksNetwork::Mainnet, WEBHOOK);
        let value = serde_json::to_value(&definition).unwrap();

        assert_eq!(
            value,
            json!({
                "version": "1",
                "name": "listener",
                "chain": "stacks",
                "network": "mainnet",
                "filters": {"events": [{
                    "type": "contract_call",
                    "contract_identifier": "SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7.my-nft",
                    "function_name": "transfer"
                }]},
                "action": {"type": "http_post", "url": WEBHOOK},
                "options": {"decode_clarity_values": true, "enable_on_registration": true}
            })
        );
    }

    #[test]
    fn test_deployment_filter_uses_deployer_address() {
        let p = params(
            Some(ChainhookEventType::ContractDeployment),
            Some("SP000000000000000000002Q6VF78.pox"),
        );
        let definition = ChainhookDefinition::from_params(&p, StacksNetwork::Testnet, WEBHOOK);

        assert_eq!(
            definition.filters.events[0].deployer.as_deref(),
            Some("SP000000000000000000002Q6VF78")
        );

        let p = params(Some(ChainhookEventType::ContractDeployment), None);
        let definition = ChainhookDefinition::from_params(&p, StacksNetwork::Testnet, WEBHOOK);
        assert_eq!(definition.filters.events.len(), 1);
        assert!(definition.filters.events[0].deployer.is_none());
    }

    #[test]
    fn test_filters_requiring_contract_id() {
        for event_type in [ChainhookEventType::ContractCall, ChainhookEventType::PrintEvent] {
            let definition = ChainhookDefinition::from_params(
                &params(Some(event_type), None),
                StacksNetwork::Testnet,
                WEBHOOK,
            );
            assert!(definition.filters.events.is_empty());
            assert_eq!(serde_json::to_value(&definition.filters).unwrap(), json!({}));
        }
    }

    #[test]
    fn test_stx_transfer_and_print_filters() {
        let definition = ChainhookDefinition::from_params(
            &params(Some(ChainhookEventType::StxTransfer), None),
            StacksNetwork::Testnet,
            WEBHOOK,
        );
        assert_eq!(
            serde_json::to_value(&definition.filters).unwrap(),
            json!({"events": [{"type": "stx_transfer_event"}]})
        );

        let definition = ChainhookDefinition::from_params(
            &params(Some(ChainhookEventType::PrintEvent), Some("SP1.logger")),
            StacksNetwork::Testnet,
            WEBHOOK,
        );
        assert_eq!(
            serde_json::to_value(&definition.filters).unwrap(),
            json!({"events": [{"type": "print_event", "contract_identifier": "SP1.logger"}]})
        );
    }

    #[test]
    fn test_params_from_legacy_request_body() {
        let body = json!({
            "name": "logs",
            "contractId": "SP1.logger",
            "eventType": "contract_log",
            "decodeValues": false,
            "enableOnRegistration": false
        });
        let p: CreateChainhookParams = serde_json::from_value(body).unwrap();
        assert_eq!(p.event_type, Some(ChainhookEventType::PrintEvent));

        let definition = ChainhookDefinition::from_params(&p, StacksNetwork::Testnet, WEBHOOK);
        assert!(!definition.options.decode_clarity_values);
        assert!(!definition.options.enable_on_registration);
        assert_eq!(definition.network, StacksNetwork::Testnet);
    }

    #[test]
    fn test_params_validation() {
        assert!(params(None, None).validate().is_ok());

        let mut missing_name = params(None, None);
        missing_name.name = "  ".to_string();
        assert_eq!(
            missing_name.validate().unwrap_err(),
            "Missing required field: name"
        );
    }
}
