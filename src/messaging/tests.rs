use chrono::{TimeZone, Utc};

use super::*;
use crate::{
    poller::FetchStats,
    storage::{Price, Product},
};

fn product(name: &str, value: f64, url: &str, code: &str) -> Product {
    Product {
        name: name.to_string(),
        price: Price { value, currency: String::new() },
        url: url.to_string(),
        code: code.to_string(),
        created_at: None,
        updated_at: None,
    }
}

#[test]
fn test_format_keyword_list_text() {
    let keywords = vec!["milk".to_string(), "eggs".to_string()];
    assert_eq!(format_keyword_list_text(&keywords), "Your keywords: milk, eggs");
}

#[test]
fn test_format_keyword_list_text_empty() {
    assert_eq!(format_keyword_list_text(&[]), "No keywords found.");
}

#[test]
fn test_format_status_text() {
    let report = StatusReport {
        keyword_count: 3,
        product_count: 42,
        stats: FetchStats {
            last_fetch_time: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
            total_products_fetched: 17,
            failed_keywords: Vec::new(),
        },
    };

    assert_eq!(
        format_status_text(&report),
        "*System Status*\n- Keywords: 3\n- Products: 42\n- Last Fetch: \
         2024-05-01T12:00:00+00:00\n- Total Products Fetched Last Time: 17"
    );
}

#[test]
fn test_format_status_text_before_first_cycle() {
    let report = StatusReport::default();

    assert_eq!(
        format_status_text(&report),
        "*System Status*\n- Keywords: 0\n- Products: 0\n- Last Fetch: never\n- Total \
         Products Fetched Last Time: 0"
    );
}

#[test]
fn test_format_status_text_surfaces_failed_keywords() {
    let report = StatusReport {
        keyword_count: 2,
        product_count: 10,
        stats: FetchStats {
            last_fetch_time: None,
            total_products_fetched: 4,
            failed_keywords: vec!["milk".to_string(), "eggs".to_string()],
        },
    };

    let text = format_status_text(&report);
    assert!(text.ends_with("- Failed Keywords Last Time: milk, eggs"));
}

#[test]
fn test_format_product_line() {
    let line = format_product_line(&product("Milk 2L", 129.0, "https://vendor.example/p/1", "1"));
    assert_eq!(line, "*Milk 2L*: $129.00\n[Check it out!](https://vendor.example/p/1)\n");
}

#[test]
fn test_build_product_list_messages_single_message() {
    let products =
        vec![product("Milk 2L", 129.0, "https://vendor.example/p/1", "1"),
             product("Eggs", 159.5, "https://vendor.example/p/2", "2")];

    let messages = build_product_list_messages(&products);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("*Product List*\n"));
    assert!(messages[0].contains("*Milk 2L*: $129.00"));
    assert!(messages[0].contains("*Eggs*: $159.50"));
}

#[test]
fn test_build_product_list_messages_chunks_at_length_limit() {
    // Each line is several hundred bytes; enough of them must overflow 4096.
    let products: Vec<Product> = (0..40)
        .map(|i| {
            product(
                &format!("Product {i} {}", "x".repeat(200)),
                100.0 + i as f64,
                "https://vendor.example/p/long-product-url",
                &i.to_string(),
            )
        })
        .collect();

    let messages = build_product_list_messages(&products);
    assert!(messages.len() > 1);
    for message in &messages {
        assert!(message.len() <= MAX_MESSAGE_LENGTH);
    }

    // Order is preserved across the chunk boundaries.
    let joined = messages.concat();
    let mut last_index = 0;
    for i in 0..40 {
        let marker = format!("*Product {i} ");
        let index = joined.find(&marker).unwrap();
        assert!(index >= last_index);
        last_index = index;
    }
}
