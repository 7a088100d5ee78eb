//! Credit pricing shown next to the balance

/// Credits one AI reply costs, per model id
pub const MODEL_PRICES: [(&str, &str, f64); 3] = [
    ("openai-gpt4", "GPT-4", 0.5),
    ("openai-gpt3.5", "GPT-3.5", 0.1),
    ("gemini", "Gemini", 0.05),
];

pub fn price_of(model: &str) -> Option<f64> {
    MODEL_PRICES
        .iter()
        .find(|(id, _, _)| *id == model)
        .map(|(_, _, price)| *price)
}

/// Whole replies the balance covers at a given model's price
pub fn estimated_messages(balance: f64, model: &str) -> u64 {
    match price_of(model) {
        Some(price) if price > 0.0 && balance > 0.0 => (balance / price).floor() as u64,
        _ => 0,
    }
}

/// Balance with one decimal, as the navbar shows it
pub fn format_credits(balance: f64) -> String {
    format!("{:.1}", balance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimates() {
        assert_eq!(estimated_messages(10.0, "openai-gpt3.5"), 100);
        assert_eq!(estimated_messages(10.0, "openai-gpt4"), 20);
        assert_eq!(estimated_messages(0.45, "openai-gpt4"), 0);
        assert_eq!(estimated_messages(-1.0, "gemini"), 0);
        assert_eq!(estimated_messages(5.0, "unknown"), 0);
    }

    #[test]
    fn test_format() {
        assert_eq!(format_credits(12.345), "12.3");
        assert_eq!(format_credits(0.0), "0.0");
    }
}
