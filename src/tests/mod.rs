mod test_credential;
mod test_damgard;
mod test_fiat_shamir;
mod test_simulation;
mod test_validation_criteria;
