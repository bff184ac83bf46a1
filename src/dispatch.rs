use crate::error::Result;
use crate::network::gateway::{ContractRef, LedgerSession};
use serde_json::Value;

/// Whether an operation reads ledger state or changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Evaluate on a peer; no endorsement or commit.
    Query,
    /// Endorse and commit.
    Submit,
}

impl Capability {
    /// Default classification for callers that only have a function name:
    /// names starting with `query_prefix` are queries.
    pub fn classify(function: &str, query_prefix: &str) -> Self {
        if !query_prefix.is_empty() && function.starts_with(query_prefix) {
            Capability::Query
        } else {
            Capability::Submit
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    pub function: String,
    pub args: Vec<String>,
    pub capability: Capability,
}

impl OperationRequest {
    pub fn new(function: impl Into<String>, args: Vec<String>, capability: Capability) -> Self {
        Self {
            function: function.into(),
            args,
            capability,
        }
    }

    pub fn query(function: impl Into<String>, args: Vec<String>) -> Self {
        Self::new(function, args, Capability::Query)
    }

    pub fn submit(function: impl Into<String>, args: Vec<String>) -> Self {
        Self::new(function, args, Capability::Submit)
    }
}

pub async fn dispatch(
    session: &mut dyn LedgerSession,
    contract: &ContractRef,
    request: &OperationRequest,
) -> Result<Vec<u8>> {
    match request.capability {
        Capability::Query => {
            log::debug!("Evaluating {}({:?})", request.function, request.args);
            session
                .evaluate_transaction(contract, &request.function, &request.args)
                .await
        }
        Capability::Submit => {
            log::debug!("Submitting {}({:?})", request.function, request.args);
            session
                .submit_transaction(contract, &request.function, &request.args)
                .await
        }
    }
}

/// Ledger responses are UTF-8 JSON documents.
pub fn decode_payload(payload: &[u8]) -> Result<Value> {
    Ok(serde_json::from_slice(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_selects_query() {
        assert_eq!(Capability::classify("getUserState", "get"), Capability::Query);
        assert_eq!(Capability::classify("get_market_price", "get"), Capability::Query);
        assert_eq!(Capability::classify("transferEnergy", "get"), Capability::Submit);
        assert_eq!(Capability::classify("queryAssetHistory", "get"), Capability::Submit);
        assert_eq!(Capability::classify("queryAssetHistory", "query"), Capability::Query);
    }

    #[test]
    fn empty_prefix_never_queries() {
        assert_eq!(Capability::classify("getUserState", ""), Capability::Submit);
    }

    #[test]
    fn decodes_json_and_rejects_other_payloads() {
        let value = decode_payload(br#"{"owner":"buyerOrg","amount":50}"#).unwrap();
        assert_eq!(value["amount"], 50);
        assert!(decode_payload(b"").is_err());
        assert_eq!(
            decode_payload(b"OK").unwrap_err().kind(),
            crate::error::ErrorKind::Decode
        );
    }
}
