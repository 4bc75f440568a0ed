//! Dynamic ABI helpers used to encode call data and decode per-call results.

use alloy::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier},
    json_abi::Function,
    primitives::Bytes,
};

use crate::error::{DecodeError, Error, Result};

/// Output types of a single contract call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    types: Vec<DynSolType>,
}

impl Schema {
    pub fn new(types: Vec<DynSolType>) -> Self {
        Self { types }
    }

    /// Parses either a single type (`uint256`) or a tuple of types (`(uint256,bool)`).
    pub fn parse(s: &str) -> Result<Self> {
        match DynSolType::parse(s).map_err(|e| Error::Encode(e.to_string()))? {
            DynSolType::Tuple(types) => Ok(Self { types }),
            ty => Ok(Self { types: vec![ty] }),
        }
    }

    pub fn from_function(function: &Function) -> Result<Self> {
        let types = function
            .outputs
            .iter()
            .map(|param| param.resolve())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Encode(e.to_string()))?;
        Ok(Self { types })
    }

    pub fn types(&self) -> &[DynSolType] {
        &self.types
    }

    pub fn decode(&self, data: &[u8]) -> Result<Vec<DynSolValue>, DecodeError> {
        match DynSolType::Tuple(self.types.clone()).abi_decode_params(data)? {
            DynSolValue::Tuple(values) => Ok(values),
            value => Ok(vec![value]),
        }
    }

    /// Decodes a raw storage word. Short words are left padded to a full slot.
    pub fn unpack(&self, word: &[u8]) -> Result<Vec<DynSolValue>, DecodeError> {
        if word.len() >= 32 {
            return self.decode(word);
        }
        let mut padded = [0u8; 32];
        padded[32 - word.len()..].copy_from_slice(word);
        self.decode(&padded)
    }
}

/// Encodes a call from a human readable signature such as `balanceOf(address)`.
pub fn encode_call(signature: &str, args: &[DynSolValue]) -> Result<Bytes> {
    let function = Function::parse(signature).map_err(|e| Error::Encode(e.to_string()))?;
    encode_function_call(&function, args)
}

pub fn encode_function_call(function: &Function, args: &[DynSolValue]) -> Result<Bytes> {
    function
        .abi_encode_input(args)
        .map(Bytes::from)
        .map_err(|e| Error::Encode(e.to_string()))
}

/// Extracts a readable reason from `Error(string)` or `Panic(uint256)` revert data.
/// A bare `revert()` carries no data and yields `None`.
pub fn revert_reason(data: &[u8]) -> Option<String> {
    if data.is_empty() {
        return None;
    }
    alloy::sol_types::decode_revert_reason(data).filter(|reason| !reason.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::{
        primitives::{address, U256},
        sol_types::SolValue,
    };

    #[test]
    fn parse_single_and_tuple() {
        assert_eq!(Schema::parse("uint256").unwrap().types(), &[DynSolType::Uint(256)]);
        assert_eq!(
            Schema::parse("(uint256,bool)").unwrap().types(),
            &[DynSolType::Uint(256), DynSolType::Bool]
        );
        assert!(Schema::parse("uint257").is_err());
    }

    #[test]
    fn schema_from_function_outputs() {
        let function = Function::parse("function getReserves() returns (uint112, uint112, uint32)").unwrap();
        let schema = Schema::from_function(&function).unwrap();
        assert_eq!(
            schema.types(),
            &[DynSolType::Uint(112), DynSolType::Uint(112), DynSolType::Uint(32)]
        );
    }

    #[test]
    fn decode_multiple_outputs() {
        let schema = Schema::parse("(uint256,bool)").unwrap();
        let data = (U256::from(7), true).abi_encode_params();
        assert_eq!(
            schema.decode(&data).unwrap(),
            vec![DynSolValue::Uint(U256::from(7), 256), DynSolValue::Bool(true)]
        );
    }

    #[test]
    fn decode_rejects_short_data() {
        let schema = Schema::parse("uint256").unwrap();
        assert!(matches!(schema.decode(&[0u8; 4]), Err(DecodeError::Abi(_))));
    }

    #[test]
    fn unpack_pads_short_storage_word() {
        let schema = Schema::parse("uint8").unwrap();
        assert_eq!(schema.unpack(&[0x2a]).unwrap(), vec![DynSolValue::Uint(U256::from(42), 8)]);
    }

    #[test]
    fn encode_call_prefixes_selector() {
        let owner = address!("00000000000000000000000000000000000000aa");
        let data = encode_call("balanceOf(address)", &[DynSolValue::Address(owner)]).unwrap();
        // keccak256("balanceOf(address)")[..4]
        assert_eq!(&data[..4], &[0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(&data[4..], owner.abi_encode().as_slice());
    }

    #[test]
    fn encode_call_checks_arguments() {
        assert!(encode_call("balanceOf(address)", &[DynSolValue::Bool(true)]).is_err());
    }

    #[test]
    fn revert_reason_from_error_string() {
        let mut data = vec![0x08, 0xc3, 0x79, 0xa0];
        data.extend(("insufficient balance".to_string(),).abi_encode_params());
        let reason = revert_reason(&data).unwrap();
        assert!(reason.contains("insufficient balance"));
    }

    #[test]
    fn bare_revert_has_no_reason() {
        assert_eq!(revert_reason(&[]), None);
    }
}
