//! Domain separation for typed messages.
//!
//! Every signed digest binds the protocol name, version, chain (deployment)
//! id, and verifying-contract identity, so a signature made for one
//! deployment can never be replayed against another.

use super::typed::{FieldEncoder, TypedStruct};
use crate::principal::identifier::Identifier;
use serde::{Deserialize, Serialize};

/// The prefix for every signed digest: `/delegatable/`.
pub const SEPARATOR_STR: &str = "/delegatable/";

/// The same separator as in [`SEPARATOR_STR`], represented as bytes.
pub const SEPARATOR: &[u8] = SEPARATOR_STR.as_bytes();

/// The four fields that scope a signature to one protocol instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainSeparator {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Identifier,
}

impl DomainSeparator {
    pub fn new<N: ToString, V: ToString>(
        name: N,
        version: V,
        chain_id: u64,
        verifying_contract: Identifier,
    ) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            chain_id,
            verifying_contract,
        }
    }
}

impl TypedStruct for DomainSeparator {
    const TYPE_ENCODING: &'static str =
        "Domain(string name,string version,uint256 chainId,bytes32 verifyingContract)";

    fn encode_fields(&self, encoder: &mut FieldEncoder) {
        encoder.string(&self.name);
        encoder.string(&self.version);
        encoder.uint(self.chain_id);
        encoder.identifier(&self.verifying_contract);
    }
}
