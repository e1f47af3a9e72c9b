use moto_portal::emi;
use moto_portal::models::EmiRequest;

fn request(price: f64, down: f64, rate: f64, months: u32) -> EmiRequest {
    EmiRequest {
        price,
        down_payment: down,
        annual_rate_pct: rate,
        tenure_months: months,
    }
}

#[test]
fn test_standard_quote_matches_reference_figures() {
    // 100,000 financed at 12% annual over 12 months is the textbook case:
    // the instalment works out to 8,884.88.
    let quote = emi::quote(&request(100_000.0, 0.0, 12.0, 12)).unwrap();
    assert_eq!(quote.loan_amount, 100_000.0);
    assert_eq!(quote.monthly_installment, 8_884.88);
    // total_payment is rounded from the exact instalment, not the displayed
    // one, so compare with a cent of slack.
    assert!((quote.total_payment - quote.monthly_installment * 12.0).abs() < 0.02);
    assert!((quote.total_interest - (quote.total_payment - 100_000.0)).abs() < 0.01);
}

#[test]
fn test_down_payment_reduces_the_financed_amount() {
    let quote = emi::quote(&request(250_000.0, 50_000.0, 10.0, 24)).unwrap();
    assert_eq!(quote.loan_amount, 200_000.0);
    assert!(quote.monthly_installment > 0.0);
}

#[test]
fn test_zero_rate_divides_the_principal_evenly() {
    let quote = emi::quote(&request(120_000.0, 0.0, 0.0, 12)).unwrap();
    assert_eq!(quote.monthly_installment, 10_000.0);
    assert_eq!(quote.total_payment, 120_000.0);
    assert_eq!(quote.total_interest, 0.0);
}

#[test]
fn test_zero_tenure_is_rejected() {
    assert!(emi::quote(&request(100_000.0, 0.0, 12.0, 0)).is_err());
}

#[test]
fn test_non_positive_price_is_rejected() {
    assert!(emi::quote(&request(0.0, 0.0, 12.0, 12)).is_err());
    assert!(emi::quote(&request(-5.0, 0.0, 12.0, 12)).is_err());
}

#[test]
fn test_negative_down_payment_and_rate_are_rejected() {
    assert!(emi::quote(&request(100_000.0, -1.0, 12.0, 12)).is_err());
    assert!(emi::quote(&request(100_000.0, 0.0, -0.5, 12)).is_err());
}

#[test]
fn test_non_finite_inputs_are_rejected() {
    // NaN compares false in every range check, so it needs its own gate;
    // otherwise the quote would serialize as nulls.
    assert!(emi::quote(&request(f64::NAN, 0.0, 12.0, 12)).is_err());
    assert!(emi::quote(&request(100_000.0, f64::NAN, 12.0, 12)).is_err());
    assert!(emi::quote(&request(100_000.0, 0.0, f64::NAN, 12)).is_err());
    assert!(emi::quote(&request(f64::INFINITY, 0.0, 12.0, 12)).is_err());
    assert!(emi::quote(&request(100_000.0, f64::NEG_INFINITY, 12.0, 12)).is_err());
}

#[test]
fn test_down_payment_must_leave_something_to_finance() {
    assert!(emi::quote(&request(100_000.0, 100_000.0, 12.0, 12)).is_err());
    assert!(emi::quote(&request(100_000.0, 120_000.0, 12.0, 12)).is_err());
}

#[test]
fn test_monthly_installment_helper_zero_rate() {
    assert_eq!(emi::monthly_installment(60_000.0, 0.0, 6), 10_000.0);
}
