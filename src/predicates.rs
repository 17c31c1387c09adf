//! Predicate factories.
//!
//! Builders turning common statements about group elements and committed values into
//! policy leaves (a [`CanonicalLinearRelation`]) or subtrees (a [`PolicyTree`]).
//! Commitments are Pedersen commitments `C = x·G + r·H`.

use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use ff::{Field, PrimeField};
use group::prime::PrimeGroup;

use crate::errors::Error;
use crate::linear_relation::expr::{EquationSystem, Expr};
use crate::linear_relation::{CanonicalLinearRelation, LinearRelation};
use crate::policy::PolicyTree;
use crate::witness::WitnessTable;

/// Largest interval accepted by [`range_membership`].
pub const MAX_RANGE_SIZE: u64 = 64;

/// Knowledge of `x` with `X = x·G`.
///
/// Witness: `[x]`.
#[allow(non_snake_case)]
pub fn discrete_log<G: PrimeGroup>(g: G, X: G) -> Result<CanonicalLinearRelation<G>, Error> {
    let mut relation = LinearRelation::new();

    let var_x = relation.allocate_scalar();
    let var_g = relation.allocate_element();
    let var_X = relation.allocate_eq(var_x * var_g);

    relation.set_elements([(var_g, g), (var_X, X)]);
    relation.canonical()
}

/// Knowledge of `x` with `X = x·G` and `Y = x·H`.
///
/// Witness: `[x]`.
#[allow(non_snake_case)]
pub fn dleq<G: PrimeGroup>(g: G, h: G, X: G, Y: G) -> Result<CanonicalLinearRelation<G>, Error> {
    let mut relation = LinearRelation::new();

    let var_x = relation.allocate_scalar();
    let [var_g, var_h] = relation.allocate_elements();
    let var_X = relation.allocate_eq(var_x * var_g);
    let var_Y = relation.allocate_eq(var_x * var_h);

    relation.set_elements([(var_g, g), (var_h, h), (var_X, X), (var_Y, Y)]);
    relation.canonical()
}

/// Knowledge of an opening `(x, r)` of `C = x·G + r·H`.
///
/// Witness: `[x, r]`.
#[allow(non_snake_case)]
pub fn pedersen_opening<G: PrimeGroup>(
    g: G,
    h: G,
    C: G,
) -> Result<CanonicalLinearRelation<G>, Error> {
    let mut relation = LinearRelation::new();

    let [var_x, var_r] = relation.allocate_scalars();
    let [var_g, var_h] = relation.allocate_elements();
    let var_C = relation.allocate_eq(var_x * var_g + var_r * var_h);

    relation.set_elements([(var_g, g), (var_h, h), (var_C, C)]);
    relation.canonical()
}

/// Two commitments `C1 = x·G + r1·H` and `C2 = x·G + r2·H` open to the same value.
///
/// Witness: `[x, r1, r2]`.
#[allow(non_snake_case)]
pub fn attribute_equality<G: PrimeGroup>(
    g: G,
    h: G,
    C1: G,
    C2: G,
) -> Result<CanonicalLinearRelation<G>, Error> {
    let mut system = EquationSystem::new();
    system
        .equation(
            Expr::element(C1),
            Expr::element(g).pow_unknown("x") + Expr::element(h).pow_unknown("r1"),
        )
        .equation(
            Expr::element(C2),
            Expr::element(g).pow_unknown("x") + Expr::element(h).pow_unknown("r2"),
        );
    Ok(system.compile()?.relation)
}

/// The value committed in `C = x·G + r·H` differs from the public `a`.
///
/// With `δ = x − a`, the prover shows `G = u·(C − a·G) + v·H` for
/// `u = δ⁻¹` and `v = −r·δ⁻¹`, which has no solution when `δ = 0`.
/// Use [`inequality_witness`] to compute the witness `[u, v]`.
#[allow(non_snake_case)]
pub fn inequality<G: PrimeGroup>(
    g: G,
    h: G,
    C: G,
    a: G::Scalar,
) -> Result<CanonicalLinearRelation<G>, Error> {
    let mut relation = LinearRelation::new();

    let [var_u, var_v] = relation.allocate_scalars();
    let [var_D, var_h] = relation.allocate_elements();
    let var_g = relation.allocate_eq(var_u * var_D + var_v * var_h);

    relation.set_elements([(var_D, C - g * a), (var_h, h), (var_g, g)]);
    relation.canonical()
}

/// Witness of [`inequality`] for the opening `(x, r)`.
///
/// # Errors
/// - [`Error::InvalidInstanceWitnessPair`] if `x == a`.
pub fn inequality_witness<F: Field>(x: F, r: F, a: F) -> Result<Vec<F>, Error> {
    let inverse = Option::<F>::from((x - a).invert()).ok_or(Error::InvalidInstanceWitnessPair)?;
    Ok(vec![inverse, -(r * inverse)])
}

fn member_name(prefix: &str, index: usize) -> String {
    format!("{prefix}[{index}]")
}

/// The value committed in `C = x·G + r·H` belongs to `set`.
///
/// Returns a 1-of-k tree whose `j`-th leaf, named `prefix[j]`, proves knowledge of
/// `r` with `C − set[j]·G = r·H`.
///
/// # Errors
/// - [`Error::MalformedPolicy`] if `set` is empty.
#[allow(non_snake_case)]
pub fn set_membership<G: PrimeGroup>(
    prefix: &str,
    g: G,
    h: G,
    C: G,
    set: &[G::Scalar],
) -> Result<PolicyTree<G>, Error> {
    if set.is_empty() {
        return Err(Error::MalformedPolicy("empty membership set".into()));
    }
    let leaves = set
        .iter()
        .enumerate()
        .map(|(j, a)| {
            let relation = discrete_log(h, C - g * a)?;
            Ok(PolicyTree::leaf(member_name(prefix, j), relation))
        })
        .collect::<Result<Vec<_>, Error>>()?;
    PolicyTree::or(leaves)
}

/// Adds the witness of [`set_membership`] for the opening `(x, r)` to `table`.
///
/// # Errors
/// - [`Error::InvalidInstanceWitnessPair`] if `x` is not in `set`.
pub fn set_membership_witness<G: PrimeGroup>(
    table: &mut WitnessTable<G>,
    prefix: &str,
    set: &[G::Scalar],
    x: G::Scalar,
    r: G::Scalar,
) -> Result<(), Error> {
    let index = set
        .iter()
        .position(|a| *a == x)
        .ok_or(Error::InvalidInstanceWitnessPair)?;
    table.insert(member_name(prefix, index), vec![r])
}

fn interval<F: PrimeField>(low: u64, high: u64) -> Result<Vec<F>, Error> {
    if high < low || high - low >= MAX_RANGE_SIZE {
        return Err(Error::MalformedPolicy(format!(
            "range [{low}, {high}] must be non-empty and hold at most {MAX_RANGE_SIZE} values"
        )));
    }
    Ok((low..=high).map(F::from).collect())
}

/// The value committed in `C = x·G + r·H` lies in `[low, high]`.
///
/// Set membership over the interval; leaves are named `prefix[x − low]`.
///
/// # Errors
/// - [`Error::MalformedPolicy`] if the interval is empty or larger than
///   [`MAX_RANGE_SIZE`].
#[allow(non_snake_case)]
pub fn range_membership<G: PrimeGroup>(
    prefix: &str,
    g: G,
    h: G,
    C: G,
    low: u64,
    high: u64,
) -> Result<PolicyTree<G>, Error> {
    set_membership(prefix, g, h, C, &interval::<G::Scalar>(low, high)?)
}

/// Adds the witness of [`range_membership`] for the opening `(x, r)` to `table`.
pub fn range_membership_witness<G: PrimeGroup>(
    table: &mut WitnessTable<G>,
    prefix: &str,
    low: u64,
    high: u64,
    x: u64,
    r: G::Scalar,
) -> Result<(), Error> {
    let set = interval::<G::Scalar>(low, high)?;
    set_membership_witness(table, prefix, &set, G::Scalar::from(x), r)
}
