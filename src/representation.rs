//! Self-describing representation of protocol messages.
//!
//! A [`Representation`] is a small tree of byte strings, integers, strings, lists and
//! maps that can be serialized with any `serde` format. Protocol messages are turned
//! into a representation by the protocol that produced them, and recreated from one by
//! the same protocol (see [`crate::traits::SigmaProtocol::recreate_announcement`]):
//! the representation alone carries no type information about the relation.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use ff::PrimeField;
use group::prime::PrimeGroup;
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::group::serialization::{
    deserialize_elements, deserialize_scalars, serialize_elements, serialize_scalars,
};

/// A structured, self-describing value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Representation {
    /// Opaque bytes, hex encoded by human-readable formats.
    Bytes(#[serde(with = "hex::serde")] Vec<u8>),
    /// An unsigned integer.
    Int(u64),
    /// A UTF-8 string.
    Str(String),
    /// An ordered list.
    List(Vec<Representation>),
    /// A string-keyed map.
    Map(BTreeMap<String, Representation>),
}

impl Representation {
    /// Representation of a single group element.
    pub fn element<G: PrimeGroup>(element: &G) -> Self {
        Representation::Bytes(serialize_elements([element]))
    }

    /// Representation of a single scalar.
    pub fn scalar<F: PrimeField>(scalar: &F) -> Self {
        Representation::Bytes(serialize_scalars(&[*scalar]))
    }

    /// Representation of a list of group elements.
    pub fn elements<G: PrimeGroup>(elements: &[G]) -> Self {
        Representation::List(elements.iter().map(Self::element).collect())
    }

    /// Representation of a list of scalars.
    pub fn scalars<F: PrimeField>(scalars: &[F]) -> Self {
        Representation::List(scalars.iter().map(Self::scalar).collect())
    }

    /// Build a map representation from `(key, value)` pairs.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Representation)>) -> Self {
        Representation::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_bytes(&self) -> Result<&[u8], Error> {
        match self {
            Representation::Bytes(bytes) => Ok(bytes),
            other => Err(unexpected("bytes", other)),
        }
    }

    pub fn as_int(&self) -> Result<u64, Error> {
        match self {
            Representation::Int(value) => Ok(*value),
            other => Err(unexpected("int", other)),
        }
    }

    pub fn as_str(&self) -> Result<&str, Error> {
        match self {
            Representation::Str(value) => Ok(value),
            other => Err(unexpected("str", other)),
        }
    }

    pub fn as_list(&self) -> Result<&[Representation], Error> {
        match self {
            Representation::List(items) => Ok(items),
            other => Err(unexpected("list", other)),
        }
    }

    /// Returns the list items, requiring exactly `len` of them.
    pub fn as_list_of_len(&self, len: usize) -> Result<&[Representation], Error> {
        let items = self.as_list()?;
        if items.len() != len {
            return Err(Error::Representation(format!(
                "expected {len} list items, found {}",
                items.len()
            )));
        }
        Ok(items)
    }

    /// Look up a key of a map representation.
    pub fn get(&self, key: &str) -> Result<&Representation, Error> {
        match self {
            Representation::Map(entries) => entries
                .get(key)
                .ok_or_else(|| Error::Representation(format!("missing key `{key}`"))),
            other => Err(unexpected("map", other)),
        }
    }

    pub fn to_element<G: PrimeGroup>(&self) -> Result<G, Error> {
        let mut bytes = self.as_bytes()?;
        let element = deserialize_elements::<G>(&mut bytes, 1)
            .ok_or_else(|| Error::Representation("invalid group element".to_string()))?;
        if !bytes.is_empty() {
            return Err(Error::Representation("trailing bytes after group element".to_string()));
        }
        Ok(element[0])
    }

    pub fn to_scalar<F: PrimeField>(&self) -> Result<F, Error> {
        let mut bytes = self.as_bytes()?;
        let scalar = deserialize_scalars::<F>(&mut bytes, 1)
            .ok_or_else(|| Error::Representation("invalid scalar".to_string()))?;
        if !bytes.is_empty() {
            return Err(Error::Representation("trailing bytes after scalar".to_string()));
        }
        Ok(scalar[0])
    }

    /// Decode a list of exactly `len` group elements.
    pub fn to_elements<G: PrimeGroup>(&self, len: usize) -> Result<Vec<G>, Error> {
        self.as_list_of_len(len)?
            .iter()
            .map(Representation::to_element::<G>)
            .collect()
    }

    /// Decode a list of exactly `len` scalars.
    pub fn to_scalars<F: PrimeField>(&self, len: usize) -> Result<Vec<F>, Error> {
        self.as_list_of_len(len)?
            .iter()
            .map(Representation::to_scalar::<F>)
            .collect()
    }

    fn kind(&self) -> &'static str {
        match self {
            Representation::Bytes(_) => "bytes",
            Representation::Int(_) => "int",
            Representation::Str(_) => "str",
            Representation::List(_) => "list",
            Representation::Map(_) => "map",
        }
    }
}

fn unexpected(expected: &str, found: &Representation) -> Error {
    Error::Representation(format!("expected {expected}, found {}", found.kind()))
}
