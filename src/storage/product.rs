use serde::{Deserialize, Serialize};

/// A price amount with its currency, as exposed by the vendor API and the
/// product read endpoint. The store only persists the amount, so products
/// read back from the database carry an empty currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Price {
    /// The decimal amount.
    pub value: f64,
    /// The ISO currency code, or empty when unknown.
    #[serde(default)]
    pub currency: String,
}

/// One tracked product, keyed by the vendor-assigned `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// The product name.
    pub name: String,
    /// The current price.
    pub price: Price,
    /// The canonical product URL.
    pub url: String,
    /// The vendor-assigned product code, stable across fetches.
    pub code: String,
    /// When the product was first observed, unset for rows predating the
    /// column.
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// When the price last changed, unset until the first change.
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_omits_unknown_timestamps() {
        let product = Product {
            name: "Milk 2L".to_string(),
            price: Price { value: 129.0, currency: "TWD".to_string() },
            url: "https://vendor.example/p/123".to_string(),
            code: "123".to_string(),
            created_at: None,
            updated_at: None,
        };

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["name"], "Milk 2L");
        assert_eq!(json["price"]["value"], 129.0);
        assert_eq!(json["price"]["currency"], "TWD");
        assert!(json.get("createdAt").is_none());
        assert!(json.get("updatedAt").is_none());
    }

    #[test]
    fn test_serialize_keeps_known_timestamps() {
        let product = Product {
            name: "Milk 2L".to_string(),
            price: Price { value: 129.0, currency: String::new() },
            url: "https://vendor.example/p/123".to_string(),
            code: "123".to_string(),
            created_at: Some("2024-01-01 00:00:00".to_string()),
            updated_at: None,
        };

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["createdAt"], "2024-01-01 00:00:00");
        assert!(json.get("updatedAt").is_none());
    }
}
