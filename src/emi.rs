use crate::models::{EmiQuote, EmiRequest};

/// monthly_installment
///
/// Standard amortized-loan installment for a principal at a monthly rate over
/// `months` payments: P * r * (1+r)^n / ((1+r)^n - 1). A zero rate degrades
/// to straight division.
pub fn monthly_installment(principal: f64, annual_rate_pct: f64, months: u32) -> f64 {
    let n = months as f64;
    if annual_rate_pct == 0.0 {
        return principal / n;
    }
    let r = annual_rate_pct / 100.0 / 12.0;
    let growth = (1.0 + r).powi(months as i32);
    principal * r * growth / (growth - 1.0)
}

/// quote
///
/// Validates an EMI request and produces the full quote, rounded to two
/// decimals. Rejections are descriptive strings surfaced to the SPA as a
/// 400; nothing here is an exception.
pub fn quote(req: &EmiRequest) -> Result<EmiQuote, String> {
    if req.tenure_months == 0 {
        return Err("tenure must be at least one month".to_string());
    }
    // NaN compares false against everything, so the range checks below would
    // wave it through; reject non-finite inputs up front.
    if !req.price.is_finite() || !req.down_payment.is_finite() || !req.annual_rate_pct.is_finite()
    {
        return Err("price, down payment and rate must be finite numbers".to_string());
    }
    if req.price <= 0.0 {
        return Err("price must be positive".to_string());
    }
    if req.down_payment < 0.0 || req.annual_rate_pct < 0.0 {
        return Err("down payment and rate must not be negative".to_string());
    }
    if req.down_payment >= req.price {
        return Err("down payment must be below the vehicle price".to_string());
    }

    let loan_amount = req.price - req.down_payment;
    let installment = monthly_installment(loan_amount, req.annual_rate_pct, req.tenure_months);
    let total_payment = installment * req.tenure_months as f64;

    Ok(EmiQuote {
        loan_amount: round2(loan_amount),
        monthly_installment: round2(installment),
        total_payment: round2(total_payment),
        total_interest: round2(total_payment - loan_amount),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
