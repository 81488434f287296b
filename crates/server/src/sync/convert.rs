//! Remote-to-record conversion functions.
//!
//! The serde layer already coerced malformed numerics to zero; this layer
//! applies the remaining domain rules: external ids become strings,
//! lifetime spend and prices clamp non-negative, a product's price is its
//! first variant's, and an order missing its remote timestamp falls back to
//! sync time.

use chrono::Utc;
use rust_decimal::Decimal;
use tidepool_core::{ExternalId, money};

use crate::shopify::types::{RemoteCustomer, RemoteOrder, RemoteProduct};

use super::store::{CustomerRecord, OrderRecord, ProductRecord};

pub fn customer_record(remote: RemoteCustomer) -> CustomerRecord {
    CustomerRecord {
        external_id: ExternalId::from(remote.id),
        first_name: remote.first_name,
        last_name: remote.last_name,
        email: remote.email,
        total_spent: money::non_negative(remote.total_spent),
    }
}

pub fn product_record(remote: RemoteProduct) -> ProductRecord {
    let price = remote
        .variants
        .first()
        .map_or(Decimal::ZERO, |variant| variant.price);

    ProductRecord {
        external_id: ExternalId::from(remote.id),
        title: remote.title,
        price: money::non_negative(price),
    }
}

pub fn order_record(remote: RemoteOrder) -> OrderRecord {
    OrderRecord {
        external_id: ExternalId::from(remote.id),
        total: remote.total,
        currency: remote.currency,
        customer_external_id: remote.customer.map(|customer| ExternalId::from(customer.id)),
        placed_at: remote.created_at.unwrap_or_else(Utc::now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn customer_from(value: serde_json::Value) -> RemoteCustomer {
        serde_json::from_value(value).expect("decode remote customer")
    }

    #[test]
    fn test_customer_record_coerces_missing_spend_to_zero() {
        let record = customer_record(customer_from(json!({"id": 1})));
        assert_eq!(record.total_spent, Decimal::ZERO);

        let record = customer_record(customer_from(json!({"id": 1, "total_spent": "oops"})));
        assert_eq!(record.total_spent, Decimal::ZERO);
    }

    #[test]
    fn test_customer_record_clamps_negative_spend() {
        let record = customer_record(customer_from(json!({"id": 1, "total_spent": "-12.00"})));
        assert_eq!(record.total_spent, Decimal::ZERO);
    }

    #[test]
    fn test_product_record_takes_first_variant_price() {
        let remote: RemoteProduct = serde_json::from_value(json!({
            "id": 5,
            "title": "Mug",
            "variants": [{"price": "14.00"}, {"price": "99.00"}]
        }))
        .expect("decode");

        let record = product_record(remote);
        assert_eq!(record.price, Decimal::new(1400, 2));
    }

    #[test]
    fn test_product_record_without_variants_prices_at_zero() {
        let remote: RemoteProduct =
            serde_json::from_value(json!({"id": 6, "title": "Ghost"})).expect("decode");
        assert_eq!(product_record(remote).price, Decimal::ZERO);
    }

    #[test]
    fn test_order_record_keeps_unenforced_customer_reference() {
        let remote: RemoteOrder = serde_json::from_value(json!({
            "id": 900,
            "total_price": "88.20",
            "currency": "USD",
            "customer": {"id": 99},
            "created_at": "2024-03-01T12:30:00Z"
        }))
        .expect("decode");

        let record = order_record(remote);
        assert_eq!(record.customer_external_id, Some(ExternalId::from("99")));
        assert_eq!(record.placed_at.to_rfc3339(), "2024-03-01T12:30:00+00:00");
    }

    #[test]
    fn test_order_record_missing_timestamp_falls_back_to_now() {
        let before = Utc::now();
        let remote: RemoteOrder =
            serde_json::from_value(json!({"id": 901, "total_price": "1.00", "currency": "USD"}))
                .expect("decode");
        let record = order_record(remote);
        assert!(record.placed_at >= before);
    }
}
