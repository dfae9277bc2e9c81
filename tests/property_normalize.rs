use proptest::prelude::*;

use fieldwatch::feed::parse_payload;
use fieldwatch::normalize::normalize;
use fieldwatch::PipelineError;

proptest! {
    #[test]
    fn normalize_is_deterministic(
        n in 0u32..1000,
        p in 0u32..1000,
        k in 0u32..1000,
        moisture in 0u32..1024,
        entry in 1i64..1_000_000,
    ) {
        let body = format!(
            r#"{{"feeds": [{{"created_at": "2025-10-01T06:15:00Z", "entry_id": {entry},
                "field1": "{n}", "field2": "{p}", "field3": "{k}", "field4": "{moisture}"}}]}}"#
        );
        let payload = parse_payload(&body).unwrap();

        let first = normalize(&payload).unwrap();
        let second = normalize(&payload).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.nitrogen, f64::from(n));
        prop_assert_eq!(first.moisture, f64::from(moisture));
    }

    #[test]
    fn non_numeric_required_field_fails(garbage in "[a-zA-Z]{1,8}") {
        let body = format!(
            r#"{{"feeds": [{{"created_at": "2025-10-01T06:15:00Z",
                "field1": "10", "field2": "{garbage}", "field3": "10", "field4": "600"}}]}}"#
        );
        let payload = parse_payload(&body).unwrap();
        let result = normalize(&payload);
        prop_assert!(matches!(result, Err(PipelineError::Normalization(_))));
    }
}
