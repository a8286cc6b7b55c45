// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! Payer-facing HTML outcome pages.
//!
//! The payment callback is hit by the payer's browser after checkout, so
//! it answers with rendered HTML rather than JSON. Four presentations:
//! success, already-processed, verification-failed and mint-failed (the
//! last two share the error template with different title/message).

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title}</title>
  <style>
    body { font-family: Arial, sans-serif; background: #f4f5f7; margin: 0; }
    .card { max-width: 420px; margin: 80px auto; background: #fff; border-radius: 8px;
            padding: 32px; text-align: center; box-shadow: 0 2px 8px rgba(0,0,0,0.08); }
    h1 { font-size: 22px; margin: 0 0 12px; color: {accent}; }
    p { color: #444; line-height: 1.5; margin: 0; }
  </style>
</head>
<body>
  <div class="card">
    <h1>{title}</h1>
    <p>{message}</p>
  </div>
</body>
</html>
"#;

fn render(title: &str, message: &str, accent: &str) -> String {
    PAGE_TEMPLATE
        .replace("{title}", title)
        .replace("{message}", message)
        .replace("{accent}", accent)
}

/// Payment completed and tokens were minted.
pub fn payment_success(amount: &str) -> String {
    render(
        "Payment Successful",
        &format!("Your payment was received and {amount} FUC has been added to your wallet."),
        "#1a7f37",
    )
}

/// Duplicate callback for a reference that was already applied.
pub fn payment_already_processed() -> String {
    render(
        "Payment Already Processed",
        "This payment has already been applied to your wallet. No further action is needed.",
        "#1a7f37",
    )
}

/// The gateway could not confirm the payment.
pub fn payment_verification_failed(message: &str) -> String {
    render("Payment Verification Failed", message, "#b42318")
}

/// Payment confirmed but the token transfer failed.
pub fn payment_mint_failed() -> String {
    render(
        "Token Transfer Failed",
        "Your payment was successful but the token transfer failed. \
         Please contact support with your payment reference.",
        "#b42318",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_page_includes_the_amount() {
        let html = payment_success("500");
        assert!(html.contains("500 FUC"));
        assert!(html.contains("Payment Successful"));
        assert!(!html.contains("{title}"));
        assert!(!html.contains("{message}"));
    }

    #[test]
    fn already_processed_page_renders() {
        let html = payment_already_processed();
        assert!(html.contains("Payment Already Processed"));
    }

    #[test]
    fn verification_failure_carries_the_reason() {
        let html = payment_verification_failed("We could not verify your payment.");
        assert!(html.contains("Payment Verification Failed"));
        assert!(html.contains("We could not verify your payment."));
    }

    #[test]
    fn mint_failure_points_at_support() {
        let html = payment_mint_failed();
        assert!(html.contains("Token Transfer Failed"));
        assert!(html.contains("contact support"));
    }
}
