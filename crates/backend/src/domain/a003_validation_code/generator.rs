use contracts::domain::a002_delivery::aggregate::DeliveryId;
use contracts::domain::a003_validation_code::aggregate::VALIDATION_CODE_LENGTH;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Случайный шестизначный код, ведущие нули сохраняются (`"004217"`).
/// `thread_rng`: CSPRNG, переинициализируемый из ОС.
pub fn generate_code() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:0width$}", value, width = VALIDATION_CODE_LENGTH)
}

/// Хеш кода для хранения в БД. Код привязан к доставке,
/// поэтому одинаковые коды разных доставок дают разные хеши.
pub fn hash_code(delivery_id: DeliveryId, code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(delivery_id.value().as_bytes());
    hasher.update(code.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_ascii_digits() {
        for _ in 0..1000 {
            let code = generate_code();
            assert_eq!(code.len(), VALIDATION_CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()), "{code}");
        }
    }

    #[test]
    fn hash_depends_on_delivery_and_code() {
        let a = DeliveryId::new_v4();
        let b = DeliveryId::new_v4();
        assert_eq!(hash_code(a, "123456"), hash_code(a, "123456"));
        assert_ne!(hash_code(a, "123456"), hash_code(a, "123457"));
        assert_ne!(hash_code(a, "123456"), hash_code(b, "123456"));
        assert_eq!(hash_code(a, "000000").len(), 64);
    }
}
