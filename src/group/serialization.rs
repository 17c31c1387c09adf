//! Serialization and deserialization utilities for group elements and scalars.
//!
//! Group elements use their canonical compressed encoding; scalars are written
//! big-endian. Deserialization functions consume bytes from the front of a cursor
//! (`&mut &[u8]`) so that composite messages can be decoded piecewise.

use alloc::vec::Vec;
use ff::PrimeField;
use group::prime::PrimeGroup;

/// Get the serialized length of a group element in bytes.
pub fn group_elt_serialized_len<G: PrimeGroup>() -> usize {
    G::Repr::default().as_ref().len()
}

/// Get the serialized length of a scalar in bytes.
pub fn scalar_serialized_len<F: PrimeField>() -> usize {
    F::Repr::default().as_ref().len()
}

fn take<'a>(data: &mut &'a [u8], len: usize) -> Option<&'a [u8]> {
    if data.len() < len {
        return None;
    }
    let (head, tail) = data.split_at(len);
    *data = tail;
    Some(head)
}

/// Serialize a sequence of group elements into a byte vector.
pub fn serialize_elements<'a, G: PrimeGroup>(elements: impl IntoIterator<Item = &'a G>) -> Vec<u8> {
    let mut bytes = Vec::new();
    for element in elements {
        bytes.extend_from_slice(element.to_bytes().as_ref());
    }
    bytes
}

/// Deserialize `count` group elements from the front of `data`.
///
/// Returns `None` if the data is too short or an encoding is invalid.
pub fn deserialize_elements<G: PrimeGroup>(data: &mut &[u8], count: usize) -> Option<Vec<G>> {
    let mut elements = Vec::with_capacity(count);
    for _ in 0..count {
        let mut repr = G::Repr::default();
        let repr_mut = repr.as_mut();
        let slice = take(data, repr_mut.len())?;
        repr_mut.copy_from_slice(slice);

        let element: Option<G> = G::from_bytes(&repr).into();
        elements.push(element?);
    }

    Some(elements)
}

/// Serialize a slice of scalar field elements into a byte vector.
///
/// Each scalar is written in big-endian order.
pub fn serialize_scalars<F: PrimeField>(scalars: &[F]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for scalar in scalars {
        let mut scalar_bytes = scalar.to_repr().as_ref().to_vec();
        scalar_bytes.reverse();
        bytes.extend_from_slice(&scalar_bytes);
    }
    bytes
}

/// Deserialize `count` big-endian scalars from the front of `data`.
///
/// Returns `None` if the data is too short or a value is not canonical.
pub fn deserialize_scalars<F: PrimeField>(data: &mut &[u8], count: usize) -> Option<Vec<F>> {
    let mut scalars = Vec::with_capacity(count);
    for _ in 0..count {
        let mut repr = F::Repr::default();
        let repr_mut = repr.as_mut();
        let slice = take(data, repr_mut.len())?;
        repr_mut.copy_from_slice(slice);
        repr_mut.reverse();

        let scalar: Option<F> = F::from_repr(repr).into();
        scalars.push(scalar?);
    }

    Some(scalars)
}

/// Write a `u32` length prefix.
pub(crate) fn write_len(out: &mut Vec<u8>, len: usize) {
    out.extend_from_slice(&(len as u32).to_be_bytes());
}

/// Read a `u32` length prefix written by [`write_len`].
pub(crate) fn read_len(data: &mut &[u8]) -> Option<usize> {
    let bytes = take(data, 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize)
}

/// Read `len` raw bytes.
pub(crate) fn read_bytes<'a>(data: &mut &'a [u8], len: usize) -> Option<&'a [u8]> {
    take(data, len)
}
