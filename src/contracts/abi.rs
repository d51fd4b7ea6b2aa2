//! ARC-4 ABI encoding for application calls

use crate::types::{sha512_256, Address};
use eyre::{bail, ensure, eyre, Result};
use std::fmt;

/// Prefix the AVM puts on the log line carrying a method's return value
pub const RETURN_PREFIX: [u8; 4] = [0x15, 0x1f, 0x7c, 0x75];

/// ABI types used by the Ijarah contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiType {
    Uint64,
    Address,
    String,
    Tuple(&'static [AbiType]),
    /// Payment transaction placed before the app call in the group
    Pay,
}

/// Encoded or decoded ABI value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Uint64(u64),
    Address(Address),
    String(String),
    Tuple(Vec<AbiValue>),
}

impl AbiType {
    /// Whether the argument travels as a group transaction instead of an app arg
    pub fn is_transaction(&self) -> bool {
        matches!(self, AbiType::Pay)
    }

    fn is_dynamic(&self) -> bool {
        match self {
            AbiType::String => true,
            AbiType::Tuple(items) => items.iter().any(AbiType::is_dynamic),
            _ => false,
        }
    }

    fn static_size(&self) -> usize {
        match self {
            AbiType::Uint64 => 8,
            AbiType::Address => 32,
            AbiType::Tuple(items) => items.iter().map(AbiType::static_size).sum(),
            AbiType::String | AbiType::Pay => 0,
        }
    }

    fn head_size(&self) -> usize {
        if self.is_dynamic() {
            2
        } else {
            self.static_size()
        }
    }

    /// Encode a value of this type
    pub fn encode(&self, value: &AbiValue) -> Result<Vec<u8>> {
        match (self, value) {
            (AbiType::Uint64, AbiValue::Uint64(v)) => Ok(v.to_be_bytes().to_vec()),
            (AbiType::Address, AbiValue::Address(a)) => Ok(a.as_bytes().to_vec()),
            (AbiType::String, AbiValue::String(s)) => {
                let len = u16::try_from(s.len()).map_err(|_| eyre!("String too long for ABI"))?;
                let mut out = len.to_be_bytes().to_vec();
                out.extend_from_slice(s.as_bytes());
                Ok(out)
            }
            (AbiType::Tuple(types), AbiValue::Tuple(values)) => {
                ensure!(
                    types.len() == values.len(),
                    "Tuple arity mismatch: expected {}, got {}",
                    types.len(),
                    values.len()
                );
                let head_len: usize = types.iter().map(AbiType::head_size).sum();
                let mut head = Vec::with_capacity(head_len);
                let mut tail = Vec::new();
                for (ty, value) in types.iter().zip(values) {
                    let encoded = ty.encode(value)?;
                    if ty.is_dynamic() {
                        let offset = u16::try_from(head_len + tail.len())
                            .map_err(|_| eyre!("Tuple too large for ABI"))?;
                        head.extend_from_slice(&offset.to_be_bytes());
                        tail.extend_from_slice(&encoded);
                    } else {
                        head.extend_from_slice(&encoded);
                    }
                }
                head.extend_from_slice(&tail);
                Ok(head)
            }
            (AbiType::Pay, _) => bail!("Transaction arguments are not ABI-encoded"),
            (ty, value) => bail!("Value {:?} does not match ABI type {}", value, ty),
        }
    }

    /// Decode a value of this type, requiring the input to be fully consumed
    pub fn decode(&self, data: &[u8]) -> Result<AbiValue> {
        match self {
            AbiType::Uint64 => {
                let bytes: [u8; 8] = data
                    .try_into()
                    .map_err(|_| eyre!("uint64 needs 8 bytes, got {}", data.len()))?;
                Ok(AbiValue::Uint64(u64::from_be_bytes(bytes)))
            }
            AbiType::Address => {
                let bytes: [u8; 32] = data
                    .try_into()
                    .map_err(|_| eyre!("address needs 32 bytes, got {}", data.len()))?;
                Ok(AbiValue::Address(Address(bytes)))
            }
            AbiType::String => {
                ensure!(data.len() >= 2, "string is missing its length prefix");
                let len = u16::from_be_bytes([data[0], data[1]]) as usize;
                ensure!(
                    data.len() == 2 + len,
                    "string length {} does not match payload {}",
                    len,
                    data.len() - 2
                );
                Ok(AbiValue::String(
                    String::from_utf8_lossy(&data[2..]).into_owned(),
                ))
            }
            AbiType::Tuple(types) => {
                let head_len: usize = types.iter().map(AbiType::head_size).sum();
                ensure!(data.len() >= head_len, "tuple shorter than its head");

                // Dynamic elements end where the next dynamic element starts
                let mut offsets = Vec::new();
                let mut cursor = 0;
                for ty in types.iter() {
                    if ty.is_dynamic() {
                        let offset = u16::from_be_bytes([data[cursor], data[cursor + 1]]) as usize;
                        ensure!(offset <= data.len(), "tuple offset out of range");
                        offsets.push(offset);
                    }
                    cursor += ty.head_size();
                }
                if offsets.is_empty() {
                    ensure!(data.len() == head_len, "trailing bytes after static tuple");
                }
                offsets.push(data.len());

                let mut values = Vec::with_capacity(types.len());
                let mut cursor = 0;
                let mut dynamic_index = 0;
                for ty in types.iter() {
                    if ty.is_dynamic() {
                        let start = offsets[dynamic_index];
                        let end = offsets[dynamic_index + 1];
                        ensure!(start <= end, "tuple offsets out of order");
                        values.push(ty.decode(&data[start..end])?);
                        dynamic_index += 1;
                        cursor += 2;
                    } else {
                        let size = ty.static_size();
                        values.push(ty.decode(&data[cursor..cursor + size])?);
                        cursor += size;
                    }
                }
                Ok(AbiValue::Tuple(values))
            }
            AbiType::Pay => bail!("Transaction arguments are not ABI-encoded"),
        }
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiType::Uint64 => f.write_str("uint64"),
            AbiType::Address => f.write_str("address"),
            AbiType::String => f.write_str("string"),
            AbiType::Pay => f.write_str("pay"),
            AbiType::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl AbiValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            AbiValue::Uint64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AbiValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&Address> {
        match self {
            AbiValue::Address(a) => Some(a),
            _ => None,
        }
    }

    /// Flatten a tuple of uint64 into a vector
    pub fn as_u64_tuple(&self) -> Option<Vec<u64>> {
        match self {
            AbiValue::Tuple(items) => items.iter().map(AbiValue::as_u64).collect(),
            _ => None,
        }
    }
}

/// An ABI method description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Method {
    pub name: &'static str,
    pub args: &'static [AbiType],
    /// `None` is `void`
    pub returns: Option<AbiType>,
}

impl Method {
    /// Canonical signature, e.g. `terminate_lease(uint64)string`
    pub fn signature(&self) -> String {
        let args = self
            .args
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let returns = self
            .returns
            .map(|ty| ty.to_string())
            .unwrap_or_else(|| "void".to_string());
        format!("{}({}){}", self.name, args, returns)
    }

    /// First four bytes of SHA-512/256 of the signature
    pub fn selector(&self) -> [u8; 4] {
        let digest = sha512_256(self.signature().as_bytes());
        [digest[0], digest[1], digest[2], digest[3]]
    }

    /// Number of transaction arguments that precede the call in the group
    pub fn transaction_arg_count(&self) -> usize {
        self.args.iter().filter(|ty| ty.is_transaction()).count()
    }

    /// Application args: selector followed by every non-transaction argument
    pub fn encode_app_args(&self, values: &[AbiValue]) -> Result<Vec<Vec<u8>>> {
        let abi_args: Vec<&AbiType> = self.args.iter().filter(|ty| !ty.is_transaction()).collect();
        ensure!(
            abi_args.len() == values.len(),
            "{} takes {} ABI arguments, got {}",
            self.name,
            abi_args.len(),
            values.len()
        );

        let mut app_args = Vec::with_capacity(values.len() + 1);
        app_args.push(self.selector().to_vec());
        for (ty, value) in abi_args.into_iter().zip(values) {
            app_args.push(ty.encode(value)?);
        }
        Ok(app_args)
    }

    /// Decode application args produced by [`Method::encode_app_args`]
    #[cfg(test)]
    pub(crate) fn decode_app_args(&self, app_args: &[Vec<u8>]) -> Result<Vec<AbiValue>> {
        ensure!(
            app_args.first().map(Vec::as_slice) == Some(&self.selector()[..]),
            "Selector does not match {}",
            self.name
        );
        let abi_args: Vec<&AbiType> = self.args.iter().filter(|ty| !ty.is_transaction()).collect();
        ensure!(
            abi_args.len() + 1 == app_args.len(),
            "{} takes {} ABI arguments, got {}",
            self.name,
            abi_args.len(),
            app_args.len() - 1
        );
        abi_args
            .into_iter()
            .zip(&app_args[1..])
            .map(|(ty, data)| ty.decode(data))
            .collect()
    }

    /// Find the return value among a transaction's logs (the last prefixed line)
    pub fn decode_return(&self, logs: &[Vec<u8>]) -> Result<Option<AbiValue>> {
        let Some(ty) = self.returns else {
            return Ok(None);
        };
        let Some(line) = logs.iter().rev().find(|line| line.starts_with(&RETURN_PREFIX)) else {
            return Ok(None);
        };
        ty.decode(&line[RETURN_PREFIX.len()..]).map(Some)
    }

    /// Encode a return log line, as the AVM would emit it
    #[cfg(test)]
    pub(crate) fn encode_return(&self, value: &AbiValue) -> Result<Vec<u8>> {
        let ty = self
            .returns
            .ok_or_else(|| eyre!("{} returns void", self.name))?;
        let mut line = RETURN_PREFIX.to_vec();
        line.extend_from_slice(&ty.encode(value)?);
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const U64_TRIPLE: AbiType = AbiType::Tuple(&[AbiType::Uint64, AbiType::Uint64, AbiType::Uint64]);
    const MIXED: AbiType = AbiType::Tuple(&[AbiType::Uint64, AbiType::String, AbiType::String]);

    #[test]
    fn test_uint64_encoding() {
        let encoded = AbiType::Uint64.encode(&AbiValue::Uint64(1_000_000)).unwrap();
        assert_eq!(encoded, vec![0, 0, 0, 0, 0, 0x0f, 0x42, 0x40]);
    }

    #[test]
    fn test_string_encoding() {
        let encoded = AbiType::String
            .encode(&AbiValue::String("hi".to_string()))
            .unwrap();
        assert_eq!(encoded, vec![0, 2, b'h', b'i']);
    }

    #[test]
    fn test_static_tuple() {
        let value = AbiValue::Tuple(vec![
            AbiValue::Uint64(1),
            AbiValue::Uint64(2),
            AbiValue::Uint64(3),
        ]);
        let encoded = U64_TRIPLE.encode(&value).unwrap();
        assert_eq!(encoded.len(), 24);
        assert_eq!(U64_TRIPLE.decode(&encoded).unwrap(), value);
        assert_eq!(value.as_u64_tuple(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_dynamic_tuple_offsets() {
        let value = AbiValue::Tuple(vec![
            AbiValue::Uint64(9),
            AbiValue::String("ab".to_string()),
            AbiValue::String("c".to_string()),
        ]);
        let encoded = MIXED.encode(&value).unwrap();
        // head: 8 + 2 + 2, first tail at 12, second at 16
        assert_eq!(&encoded[8..12], &[0, 12, 0, 16]);
        assert_eq!(MIXED.decode(&encoded).unwrap(), value);
    }

    #[test]
    fn test_type_mismatch() {
        assert!(AbiType::Uint64
            .encode(&AbiValue::String("x".to_string()))
            .is_err());
        assert!(AbiType::Uint64.decode(&[1, 2, 3]).is_err());
        assert!(U64_TRIPLE.decode(&[0u8; 25]).is_err());
    }

    #[test]
    fn test_signature_formatting() {
        let method = Method {
            name: "get",
            args: &[AbiType::Pay, AbiType::Address],
            returns: Some(U64_TRIPLE),
        };
        assert_eq!(method.signature(), "get(pay,address)(uint64,uint64,uint64)");
        assert_eq!(method.transaction_arg_count(), 1);

        let void = Method {
            name: "noop",
            args: &[],
            returns: None,
        };
        assert_eq!(void.signature(), "noop()void");
    }

    #[test]
    fn test_return_log() {
        let method = Method {
            name: "total",
            args: &[],
            returns: Some(AbiType::Uint64),
        };
        let line = method.encode_return(&AbiValue::Uint64(42)).unwrap();
        let logs = vec![b"debug".to_vec(), line];
        assert_eq!(
            method.decode_return(&logs).unwrap(),
            Some(AbiValue::Uint64(42))
        );
        assert_eq!(method.decode_return(&[]).unwrap(), None);
    }
}
