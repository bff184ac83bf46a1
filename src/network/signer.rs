use super::proto::{common, msp, peer};
use crate::error::{InvokerError, Result};
use crate::pki::X509Identity;
use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::DecodePrivateKey;
use prost::Message;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 24;

pub fn signing_key_from_pem(pem: &str) -> Result<SigningKey> {
    SigningKey::from_pkcs8_pem(pem)
        .map_err(|e| InvokerError::identity(format!("invalid identity private key: {e}")))
}

/// Signs on behalf of a wallet identity.
pub struct IdentitySigner {
    msp_id: String,
    certificate: String,
    key: SigningKey,
}

impl IdentitySigner {
    pub fn new(identity: &X509Identity) -> Result<Self> {
        if !identity.is_x509() {
            return Err(InvokerError::identity(format!(
                "unsupported identity type '{}'",
                identity.identity_type
            )));
        }
        Ok(Self {
            msp_id: identity.msp_id.clone(),
            certificate: identity.credentials.certificate.clone(),
            key: signing_key_from_pem(&identity.credentials.private_key)?,
        })
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    /// Serialized `msp.SerializedIdentity`, used as proposal creator.
    pub fn creator(&self) -> Vec<u8> {
        msp::SerializedIdentity {
            mspid: self.msp_id.clone(),
            id_bytes: self.certificate.as_bytes().to_vec(),
        }
        .encode_to_vec()
    }

    /// ECDSA P-256 over SHA-256, low-S, DER encoded.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: Signature = self.key.sign(message);
        let signature = signature.normalize_s().unwrap_or(signature);
        signature.to_der().as_bytes().to_vec()
    }
}

pub fn transaction_id(nonce: &[u8], creator: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce);
    hasher.update(creator);
    hex::encode(hasher.finalize())
}

/// A signed chaincode proposal ready for Evaluate or Endorse.
pub struct PreparedProposal {
    pub transaction_id: String,
    pub signed: peer::SignedProposal,
}

pub fn build_proposal(
    signer: &IdentitySigner,
    channel: &str,
    chaincode: &str,
    function: &str,
    args: &[String],
) -> PreparedProposal {
    let mut nonce = vec![0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    build_proposal_with_nonce(signer, channel, chaincode, function, args, nonce)
}

pub(crate) fn build_proposal_with_nonce(
    signer: &IdentitySigner,
    channel: &str,
    chaincode: &str,
    function: &str,
    args: &[String],
    nonce: Vec<u8>,
) -> PreparedProposal {
    let creator = signer.creator();
    let tx_id = transaction_id(&nonce, &creator);
    let chaincode_id = peer::ChaincodeId {
        name: chaincode.to_string(),
        ..Default::default()
    };

    let now = chrono::Utc::now();
    let channel_header = common::ChannelHeader {
        r#type: common::HEADER_TYPE_ENDORSER_TRANSACTION,
        timestamp: Some(prost_types::Timestamp {
            seconds: now.timestamp(),
            nanos: now.timestamp_subsec_nanos() as i32,
        }),
        channel_id: channel.to_string(),
        tx_id: tx_id.clone(),
        extension: peer::ChaincodeHeaderExtension {
            chaincode_id: Some(chaincode_id.clone()),
        }
        .encode_to_vec(),
        ..Default::default()
    };
    let header = common::Header {
        channel_header: channel_header.encode_to_vec(),
        signature_header: common::SignatureHeader { creator, nonce }.encode_to_vec(),
    };

    let mut input_args = Vec::with_capacity(args.len() + 1);
    input_args.push(function.as_bytes().to_vec());
    input_args.extend(args.iter().map(|a| a.as_bytes().to_vec()));
    let invocation = peer::ChaincodeInvocationSpec {
        chaincode_spec: Some(peer::ChaincodeSpec {
            chaincode_id: Some(chaincode_id),
            input: Some(peer::ChaincodeInput {
                args: input_args,
                is_init: false,
            }),
            ..Default::default()
        }),
    };
    let proposal = peer::Proposal {
        header: header.encode_to_vec(),
        payload: peer::ChaincodeProposalPayload {
            input: invocation.encode_to_vec(),
        }
        .encode_to_vec(),
        extension: Vec::new(),
    };

    let proposal_bytes = proposal.encode_to_vec();
    let signature = signer.sign(&proposal_bytes);
    PreparedProposal {
        transaction_id: tx_id,
        signed: peer::SignedProposal {
            proposal_bytes,
            signature,
        },
    }
}

/// Chaincode response payload carried inside an endorsed transaction envelope.
pub fn endorsed_result(envelope: &common::Envelope) -> Result<Vec<u8>> {
    let malformed = |what: &str, e: prost::DecodeError| {
        InvokerError::operation(format!("malformed prepared transaction ({what}): {e}"))
    };
    let payload = common::Payload::decode(envelope.payload.as_slice())
        .map_err(|e| malformed("payload", e))?;
    let transaction =
        peer::Transaction::decode(payload.data.as_slice()).map_err(|e| malformed("transaction", e))?;
    let action = transaction
        .actions
        .first()
        .ok_or_else(|| InvokerError::operation("prepared transaction has no actions"))?;
    let action_payload = peer::ChaincodeActionPayload::decode(action.payload.as_slice())
        .map_err(|e| malformed("action payload", e))?;
    let endorsed = action_payload
        .action
        .ok_or_else(|| InvokerError::operation("prepared transaction has no endorsed action"))?;
    let response_payload =
        peer::ProposalResponsePayload::decode(endorsed.proposal_response_payload.as_slice())
            .map_err(|e| malformed("proposal response", e))?;
    let chaincode_action = peer::ChaincodeAction::decode(response_payload.extension.as_slice())
        .map_err(|e| malformed("chaincode action", e))?;
    Ok(chaincode_action
        .response
        .map(|r| r.payload)
        .unwrap_or_default())
}
