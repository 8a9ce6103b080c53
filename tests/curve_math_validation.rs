use margp_arbitrage::math::{AnyCurve, ConcentratedCurve, ConstantProductCurve, Curve, CurveError, PriceMap};
use serde_json::json;

#[test]
fn test_wire_format_for_every_family() {
    let curves: Vec<AnyCurve> = serde_json::from_value(json!([
        { "kind": "constant_product", "cid": "cp", "tknx": "ETH", "tkny": "USDC",
          "x": 100.0, "y": 350000.0 },
        { "kind": "concentrated", "cid": "v3", "tknx": "ETH", "tkny": "USDC",
          "liquidity": 5000.0, "price": 3500.0, "p_lo": 3000.0, "p_hi": 4000.0 },
        { "kind": "order_ladder", "cid": "book", "tknx": "ETH", "tkny": "USDC",
          "price": 3500.0, "asks": [{ "price": 3510.0, "amount": 1.0 }] }
    ]))
    .expect("valid snapshot");

    assert_eq!(curves.len(), 3);
    for c in &curves {
        assert!(c.validate().is_ok());
        assert!((c.price() - 3_500.0).abs() < 1e-9, "{} quotes {}", c.cid(), c.price());
        // at its own price a curve does not move
        let (dx, dy) = c.flow_from_price(c.price());
        assert!(dx.abs() < 1e-9 && dy.abs() < 1e-6, "{} moved: {} {}", c.cid(), dx, dy);
    }
    assert!(matches!(curves[2], AnyCurve::OrderLadder(_)));
}

#[test]
fn test_price_vector_is_numeraire_free() {
    let c = ConstantProductCurve::from_price("cp", "ETH", "USDC", 3_500.0, 100.0).expect("valid");

    let mut in_usd = PriceMap::new();
    in_usd.insert("ETH".to_string(), 3_600.0);
    in_usd.insert("USDC".to_string(), 1.0);
    let mut in_eth = PriceMap::new();
    in_eth.insert("ETH".to_string(), 1.0);
    in_eth.insert("USDC".to_string(), 1.0 / 3_600.0);

    let a = c.flow_vector_from_price_vector(&in_usd).expect("both priced");
    let b = c.flow_vector_from_price_vector(&in_eth).expect("both priced");
    for ((ta, va), (tb, vb)) in a.iter().zip(b.iter()) {
        assert_eq!(ta, tb);
        assert!((va - vb).abs() <= 1e-9 * va.abs().max(1.0));
    }

    in_usd.remove("USDC");
    assert!(c.flow_vector_from_price_vector(&in_usd).is_none());
}

#[test]
fn test_flows_are_monotone_in_price() {
    let curves: Vec<AnyCurve> = vec![
        ConstantProductCurve::from_price("cp", "ETH", "USDC", 3_500.0, 100.0).expect("valid").into(),
        ConcentratedCurve::new("v3", "ETH", "USDC", 5_000.0, 3_500.0, 3_000.0, 4_000.0)
            .expect("valid")
            .into(),
    ];
    for c in &curves {
        let mut last_dx = f64::INFINITY;
        for step in 0..40 {
            let p = 2_800.0 + 40.0 * step as f64;
            let (dx, dy) = c.flow_from_price(p);
            // pool sheds tknx as its price rises, and takes tkny in exchange
            assert!(dx <= last_dx);
            assert!(dx * dy <= 0.0);
            last_dx = dx;
        }
    }
}

#[test]
fn test_invalid_curves_are_reported() {
    let bad: AnyCurve = serde_json::from_value(json!({
        "kind": "constant_product", "cid": "cp", "tknx": "ETH", "tkny": "USDC",
        "x": 0.0, "y": 1.0
    }))
    .expect("shape is valid");
    assert!(matches!(bad.validate(), Err(CurveError::NonPositive { field: "x", .. })));

    let same = ConcentratedCurve::new("v3", "ETH", "ETH", 1.0, 1.0, 0.5, 2.0);
    assert!(matches!(same, Err(CurveError::SameToken { .. })));
}
