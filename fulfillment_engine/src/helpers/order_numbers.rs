use rand::{distributions::Alphanumeric, Rng};

/// Prefix of every order number the engine generates.
pub const ORDER_NUMBER_PREFIX: &str = "MVD-";

/// Generates a fresh human-facing order number: the `MVD-` prefix followed by ten uppercase
/// alphanumeric characters. Uniqueness is enforced by the database, where a collision surfaces as
/// an `OrderAlreadyExists` error.
pub fn new_order_number() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    format!("{ORDER_NUMBER_PREFIX}{suffix}")
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn order_numbers_have_the_expected_shape() {
        let number = new_order_number();
        assert!(number.starts_with(ORDER_NUMBER_PREFIX));
        assert_eq!(number.len(), ORDER_NUMBER_PREFIX.len() + 10);
        assert!(number[ORDER_NUMBER_PREFIX.len()..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn mini_fuzz() {
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(new_order_number()));
        }
    }
}
