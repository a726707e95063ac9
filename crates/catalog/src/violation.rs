use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::Product;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A listing observed below its product's MAP floor.
///
/// Field names on the wire are fixed; downstream workflows key on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "브랜드")]
    pub brand: String,
    #[serde(rename = "제품명")]
    pub product_name: String,
    #[serde(rename = "쿠팡_MAP")]
    pub map_price: u64,
    #[serde(rename = "위반_업체명")]
    pub seller: String,
    #[serde(rename = "위반_가격")]
    pub price: u64,
    #[serde(rename = "위반_URL")]
    pub url: String,
    #[serde(rename = "발견_시간", with = "detected_at")]
    pub detected_at: NaiveDateTime,
}

impl Violation {
    pub fn new(
        product: &Product,
        seller: String,
        price: u64,
        url: String,
        detected_at: NaiveDateTime,
    ) -> Self {
        Self {
            brand: product.brand.clone(),
            product_name: product.name.clone(),
            map_price: product.map_price,
            seller,
            price,
            url,
            detected_at,
        }
    }

    pub fn detected_at_display(&self) -> String {
        self.detected_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

mod detected_at {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Violation {
        let product = Product {
            brand: "고래미".to_string(),
            name: "김".to_string(),
            map_price: 10000,
            search_keyword: "김".to_string(),
        };
        let at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 5)
            .unwrap();
        Violation::new(&product, "ABC몰".to_string(), 8500, "https://shop.example/1".to_string(), at)
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "브랜드": "고래미",
                "제품명": "김",
                "쿠팡_MAP": 10000,
                "위반_업체명": "ABC몰",
                "위반_가격": 8500,
                "위반_URL": "https://shop.example/1",
                "발견_시간": "2024-05-01 09:30:05"
            })
        );
    }

    #[test]
    fn test_timestamp_parses_back() {
        let json = serde_json::to_string(&sample()).unwrap();
        let parsed: Violation = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.detected_at_display(), "2024-05-01 09:30:05");
    }
}
