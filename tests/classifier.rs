use proptest::prelude::*;
use stat_ingest::schema::{SIGNATURES, SchemaType, classify};

fn signature_index() -> impl Strategy<Value = usize> {
    0..SIGNATURES.len()
}

/// Header tokens that can never collide with a signature token.
fn extra_headers() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-z ]{0,12}".prop_map(|s| format!("x_{s}")), 0..6)
}

fn cased(token: &str, upper: bool) -> String {
    if upper {
        token.to_uppercase()
    } else {
        token.to_string()
    }
}

proptest! {
    #[test]
    fn classify_is_total_and_deterministic(
        headers in proptest::collection::vec(".{0,24}", 0..10)
    ) {
        let first = classify(&headers);
        let second = classify(&headers);
        prop_assert_eq!(first, second);
        if let Some(schema) = first {
            prop_assert!(SchemaType::CSV.contains(&schema));
        }
    }

    #[test]
    fn signature_headers_are_sufficient(
        idx in signature_index(),
        extras in extra_headers(),
        upper in any::<bool>(),
        padded in any::<bool>(),
    ) {
        let signature = &SIGNATURES[idx];
        let mut headers = extras;
        for token in signature.required {
            let token = cased(token, upper);
            headers.push(if padded { format!("  {token} ") } else { token });
        }
        headers.reverse();
        prop_assert_eq!(classify(&headers), Some(signature.schema));
    }

    #[test]
    fn every_signature_token_is_necessary(
        idx in signature_index(),
        drop in any::<prop::sample::Index>(),
        extras in extra_headers(),
    ) {
        let signature = &SIGNATURES[idx];
        let missing = drop.index(signature.required.len());
        let mut headers = extras;
        headers.extend(
            signature
                .required
                .iter()
                .enumerate()
                .filter(|(pos, _)| *pos != missing)
                .map(|(_, token)| token.to_string()),
        );
        prop_assert_ne!(classify(&headers), Some(signature.schema));
    }
}

#[test]
fn header_order_does_not_matter() {
    let forward = ["Date", "New Viewers", "Returning Viewers", "Total Viewers"];
    let mut backward = forward;
    backward.reverse();
    assert_eq!(classify(&forward), Some(SchemaType::Viewers));
    assert_eq!(classify(&backward), Some(SchemaType::Viewers));
}

#[test]
fn signatures_cover_every_csv_type_once() {
    let mut covered = SIGNATURES.iter().map(|s| s.schema).collect::<Vec<_>>();
    covered.sort();
    let mut expected = SchemaType::CSV.to_vec();
    expected.sort();
    assert_eq!(covered, expected);
}
